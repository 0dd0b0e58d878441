use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdScheme {
    #[default]
    Timestamp,
    Uuid,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server_host: String,
    pub server_port: u16,
    pub downloads_dir: PathBuf,
    pub log_level: String,
    pub ytdlp_path: String,
    pub format: String,
    pub recode_format: String,
    pub progress_ttl_secs: u64,
    pub id_scheme: IdScheme,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            // Default settings
            .set_default("server_host", "127.0.0.1")?
            .set_default("server_port", 8080)?
            .set_default("downloads_dir", "./downloads")?
            .set_default("log_level", "info")?
            .set_default("ytdlp_path", "yt-dlp")?
            .set_default("format", "best")?
            .set_default("recode_format", "mp4")?
            .set_default("progress_ttl_secs", 3600)?
            .set_default("id_scheme", "timestamp")?
            // Config file (optional)
            .add_source(File::with_name("config").required(false))
            // Environment variables (e.g. VIDGRAB_SERVER_PORT=9000)
            .add_source(Environment::with_prefix("VIDGRAB"));

        builder.build()?.try_deserialize()
    }
}

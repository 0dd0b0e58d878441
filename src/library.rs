use chrono::{DateTime, Local};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use walkdir::WalkDir;

pub const MEDIA_EXTENSIONS: [&str; 2] = ["mp4", "webm"];

/// A finished file in the download directory, as shown on the home page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadedFile {
    pub title: String,
    pub path: String,
    pub size: String,
    pub date: String,
}

pub fn process_entry(path: &Path) -> Option<DownloadedFile> {
    if path.is_file()
        && let Some(ext) = path.extension().and_then(|s| s.to_str())
        && MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    {
        let filename = path.file_name()?.to_string_lossy().to_string();
        let metadata = std::fs::metadata(path).ok()?;
        let date = metadata
            .modified()
            .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        return Some(DownloadedFile {
            path: format!("/downloads/{}", encode_path(&filename)),
            title: filename,
            size: format_size(metadata.len()),
            date,
        });
    }
    None
}

/// Lists media files directly inside `dir`, in directory order.
pub fn scan(dir: &Path) -> Vec<DownloadedFile> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|entry| process_entry(entry.path()))
        .collect()
}

pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

//! `MediaExtractor` backed by the yt-dlp command line tool.
//!
//! Progress is read from stdout through a `--progress-template` that dumps
//! the tool's progress dict as JSON, one line per report.

use crate::config::Settings;
use crate::extractor::{ExtractError, MediaExtractor, ProgressEvent, ProgressHook, VideoInfo};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

const PROGRESS_PREFIX: &str = "progress:";
const RESULT_PREFIX: &str = "result:";

#[derive(Clone, Debug)]
pub struct YtDlp {
    program: String,
    downloads_dir: PathBuf,
    format: String,
    recode_format: String,
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    status: String,
    #[serde(default)]
    downloaded_bytes: Option<f64>,
    #[serde(default)]
    total_bytes: Option<f64>,
    #[serde(default)]
    total_bytes_estimate: Option<f64>,
}

enum OutputLine {
    Progress(ProgressEvent),
    Result(VideoInfo),
    Other,
}

impl YtDlp {
    pub fn new(settings: &Settings) -> Self {
        Self {
            program: settings.ytdlp_path.clone(),
            downloads_dir: settings.downloads_dir.clone(),
            format: settings.format.clone(),
            recode_format: settings.recode_format.clone(),
        }
    }

    /// Runs `--version`; used at startup to warn about a missing executable.
    pub async fn version(&self) -> Result<String, ExtractError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ExtractError::Spawn(self.program.clone(), e))?;
        if !output.status.success() {
            return Err(ExtractError::Failed(error_summary(
                &String::from_utf8_lossy(&output.stderr),
                output.status,
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn info_args(&self, url: &str) -> Vec<String> {
        vec![
            "--dump-single-json".to_string(),
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--no-check-certificate".to_string(),
            "-f".to_string(),
            self.format.clone(),
            url.to_string(),
        ]
    }

    fn download_args(&self, url: &str) -> Vec<String> {
        let output_template = self.downloads_dir.join("%(title)s.%(ext)s");
        vec![
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            output_template.to_string_lossy().to_string(),
            "--recode-video".to_string(),
            self.recode_format.clone(),
            "--no-playlist".to_string(),
            "--no-check-certificate".to_string(),
            "--no-color".to_string(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            format!("download:{}%(progress)j", PROGRESS_PREFIX),
            "--no-simulate".to_string(),
            "--print".to_string(),
            format!("after_move:{}%(.{{id,title,ext,filepath}})j", RESULT_PREFIX),
            url.to_string(),
        ]
    }

    async fn extract_info_inner(&self, url: &str) -> Result<Option<VideoInfo>, ExtractError> {
        let output = Command::new(&self.program)
            .args(self.info_args(url))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ExtractError::Spawn(self.program.clone(), e))?;

        if !output.status.success() {
            return Err(ExtractError::Failed(error_summary(
                &String::from_utf8_lossy(&output.stderr),
                output.status,
            )));
        }

        parse_info(&output.stdout)
    }

    async fn download_inner(&self, url: &str, hook: ProgressHook) -> Result<VideoInfo, ExtractError> {
        let mut child = Command::new(&self.program)
            .args(self.download_args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Spawn(self.program.clone(), e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractError::Failed("no stdout from yt-dlp".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractError::Failed("no stderr from yt-dlp".to_string()))?;
        let stderr_reader = tokio::spawn(collect_lines(stderr));

        let mut result = None;
        let mut finished_reported = false;
        let mut reader = BufReader::new(stdout);
        let mut raw = Vec::new();
        while let Some(line) = next_lossy_line(&mut reader, &mut raw).await? {
            match parse_line(&line) {
                OutputLine::Progress(event) => {
                    if event == ProgressEvent::Finished {
                        finished_reported = true;
                    }
                    hook(event);
                }
                OutputLine::Result(info) => result = Some(info),
                OutputLine::Other => debug!("[yt-dlp] {}", line),
            }
        }

        let status = child.wait().await?;
        let stderr_content = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            return Err(ExtractError::Failed(error_summary(&stderr_content, status)));
        }
        if !finished_reported {
            hook(ProgressEvent::Finished);
        }

        let info = result.unwrap_or_default();
        info!("yt-dlp wrote {:?}", info.filepath);
        Ok(info)
    }
}

impl MediaExtractor for YtDlp {
    fn extract_info<'a>(
        &'a self,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Option<VideoInfo>, ExtractError>> {
        self.extract_info_inner(url).boxed()
    }

    fn download<'a>(
        &'a self,
        url: &'a str,
        hook: ProgressHook,
    ) -> BoxFuture<'a, Result<VideoInfo, ExtractError>> {
        self.download_inner(url, hook).boxed()
    }
}

/// Reads one line, replacing invalid UTF-8 instead of failing on it.
/// Returns `None` at EOF.
async fn next_lossy_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    raw: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    raw.clear();
    if reader.read_until(b'\n', raw).await? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(raw);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

/// Drains the pipe to EOF so the child never blocks or dies writing to it.
async fn collect_lines<R: AsyncRead + Unpin>(reader: R) -> String {
    let mut buf = String::new();
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();
    loop {
        match next_lossy_line(&mut reader, &mut raw).await {
            Ok(Some(line)) => {
                debug!("[yt-dlp stderr] {}", line);
                buf.push_str(&line);
                buf.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed reading yt-dlp stderr: {}", e);
                break;
            }
        }
    }
    buf
}

fn parse_info(stdout: &[u8]) -> Result<Option<VideoInfo>, ExtractError> {
    let text = String::from_utf8_lossy(stdout);
    let text = text.trim();
    if text.is_empty() || text == "null" {
        return Ok(None);
    }
    Ok(serde_json::from_str::<Option<VideoInfo>>(text)?)
}

fn parse_line(line: &str) -> OutputLine {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        let Ok(raw) = serde_json::from_str::<RawProgress>(rest) else {
            return OutputLine::Other;
        };
        return match raw.status.as_str() {
            "downloading" => OutputLine::Progress(ProgressEvent::Downloading {
                downloaded_bytes: raw.downloaded_bytes.unwrap_or(0.0) as u64,
                total_bytes: raw.total_bytes.map(|t| t as u64),
                total_bytes_estimate: raw.total_bytes_estimate,
            }),
            "finished" => OutputLine::Progress(ProgressEvent::Finished),
            _ => OutputLine::Other,
        };
    }
    if let Some(rest) = line.strip_prefix(RESULT_PREFIX)
        && let Ok(info) = serde_json::from_str::<VideoInfo>(rest)
    {
        return OutputLine::Result(info);
    }
    OutputLine::Other
}

/// Picks the most useful line of stderr for the error message.
fn error_summary(stderr: &str, status: ExitStatus) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.to_string())
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status))
}

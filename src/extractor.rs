use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata the external tool reports for a URL.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        downloaded_bytes: u64,
        total_bytes: Option<u64>,
        total_bytes_estimate: Option<f64>,
    },
    Finished,
}

impl ProgressEvent {
    /// Percentage complete, when a positive total (exact or estimated) is known.
    /// Capped at 100 since estimates can undershoot.
    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressEvent::Downloading {
                downloaded_bytes,
                total_bytes,
                total_bytes_estimate,
            } => {
                let total = total_bytes
                    .filter(|t| *t > 0)
                    .map(|t| t as f64)
                    .or(*total_bytes_estimate)?;
                (total > 0.0).then(|| (*downloaded_bytes as f64 / total * 100.0).min(100.0))
            }
            ProgressEvent::Finished => None,
        }
    }
}

pub type ProgressHook = Box<dyn Fn(ProgressEvent) + Send + Sync>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to start {0}: {1}")]
    Spawn(String, std::io::Error),

    #[error("{0}")]
    Failed(String),

    #[error("invalid JSON from extractor: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves URLs to media and downloads them into the download directory.
pub trait MediaExtractor: Send + Sync {
    /// Metadata only; `Ok(None)` when the tool produced nothing for the URL.
    fn extract_info<'a>(
        &'a self,
        url: &'a str,
    ) -> BoxFuture<'a, Result<Option<VideoInfo>, ExtractError>>;

    fn download<'a>(
        &'a self,
        url: &'a str,
        hook: ProgressHook,
    ) -> BoxFuture<'a, Result<VideoInfo, ExtractError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_prefers_exact_total() {
        let event = ProgressEvent::Downloading {
            downloaded_bytes: 25,
            total_bytes: Some(100),
            total_bytes_estimate: Some(400.0),
        };
        assert_eq!(event.percent(), Some(25.0));
    }

    #[test]
    fn test_percent_falls_back_to_estimate() {
        let event = ProgressEvent::Downloading {
            downloaded_bytes: 50,
            total_bytes: None,
            total_bytes_estimate: Some(200.0),
        };
        assert_eq!(event.percent(), Some(25.0));

        let zero_total = ProgressEvent::Downloading {
            downloaded_bytes: 50,
            total_bytes: Some(0),
            total_bytes_estimate: Some(100.0),
        };
        assert_eq!(zero_total.percent(), Some(50.0));
    }

    #[test]
    fn test_percent_capped_when_estimate_undershoots() {
        let event = ProgressEvent::Downloading {
            downloaded_bytes: 300,
            total_bytes: None,
            total_bytes_estimate: Some(200.0),
        };
        assert_eq!(event.percent(), Some(100.0));
    }

    #[test]
    fn test_percent_unknown_total() {
        let event = ProgressEvent::Downloading {
            downloaded_bytes: 50,
            total_bytes: None,
            total_bytes_estimate: None,
        };
        assert_eq!(event.percent(), None);
        assert_eq!(ProgressEvent::Finished.percent(), None);
    }
}

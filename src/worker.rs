use crate::extractor::{ExtractError, MediaExtractor, ProgressEvent, VideoInfo};
use crate::progress::ProgressStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("unable to extract video info")]
    NoMetadata,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("download task aborted: {0}")]
    Aborted(String),
}

/// Schedules a download for `video_id`. The caller seeds the store first;
/// the returned handle resolves once the outcome has been recorded, a
/// panicking worker included.
pub fn spawn(
    store: ProgressStore,
    extractor: Arc<dyn MediaExtractor>,
    url: String,
    video_id: String,
) -> JoinHandle<Result<VideoInfo, DownloadError>> {
    tokio::spawn(async move {
        let task_store = store.clone();
        let task_id = video_id.clone();
        let task = tokio::spawn(async move {
            run(&task_store, extractor.as_ref(), &url, &task_id).await
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                let err = DownloadError::Aborted(e.to_string());
                error!("Download task for ID {} died: {}", video_id, err);
                store.fail(&video_id, err.to_string());
                Err(err)
            }
        }
    })
}

pub async fn run(
    store: &ProgressStore,
    extractor: &dyn MediaExtractor,
    url: &str,
    video_id: &str,
) -> Result<VideoInfo, DownloadError> {
    info!("Starting download for URL: {} (ID: {})", url, video_id);

    match fetch(store, extractor, url, video_id).await {
        Ok(info) => {
            info!("Download completed for: {} (ID: {})", info.title, video_id);
            store.finish(video_id);
            Ok(info)
        }
        Err(e) => {
            error!("Download failed for {} (ID: {}): {}", url, video_id, e);
            store.fail(video_id, e.to_string());
            Err(e)
        }
    }
}

async fn fetch(
    store: &ProgressStore,
    extractor: &dyn MediaExtractor,
    url: &str,
    video_id: &str,
) -> Result<VideoInfo, DownloadError> {
    let info = extractor
        .extract_info(url)
        .await?
        .ok_or(DownloadError::NoMetadata)?;
    info!("Video info extracted: {}", display_title(&info));

    let hook_store = store.clone();
    let hook_id = video_id.to_string();
    let hook = Box::new(move |event: ProgressEvent| match event {
        ProgressEvent::Finished => {
            hook_store.finish(&hook_id);
            info!("Download finished (ID: {})", hook_id);
        }
        ProgressEvent::Downloading { .. } => {
            if let Some(progress) = event.percent() {
                hook_store.record_progress(&hook_id, progress);
                debug!("Download progress: {:.2}% (ID: {})", progress, hook_id);
            }
        }
    });

    Ok(extractor.download(url, hook).await?)
}

fn display_title(info: &VideoInfo) -> &str {
    if info.title.is_empty() {
        "Unknown"
    } else {
        &info.title
    }
}

use crate::error::AppError;
use crate::library::{self, DownloadedFile};
use crate::progress::ProgressRecord;
use crate::state::AppState;
use crate::worker;
use axum::{
    Form, Json,
    extract::{Path, State, rejection::FormRejection},
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadAccepted {
    pub video_id: String,
}

pub async fn start_download(
    State(state): State<AppState>,
    form: Result<Form<DownloadForm>, FormRejection>,
) -> Result<Json<DownloadAccepted>, AppError> {
    let Form(DownloadForm { url }) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    info!("Received download request for URL: {}", url);

    tokio::fs::create_dir_all(&state.settings.downloads_dir)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let video_id = state.ids.next_id();
    state.progress.begin(&video_id);

    // Runs detached; the outcome lands in the progress store.
    worker::spawn(
        state.progress.clone(),
        state.extractor.clone(),
        url,
        video_id.clone(),
    );

    Ok(Json(DownloadAccepted { video_id }))
}

pub async fn get_progress(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Json<ProgressRecord> {
    Json(state.progress.get(&video_id))
}

pub async fn list_videos(State(state): State<AppState>) -> Json<Vec<DownloadedFile>> {
    let dir = state.settings.downloads_dir.clone();
    let videos = tokio::task::spawn_blocking(move || library::scan(&dir))
        .await
        .unwrap_or_default();
    Json(videos)
}

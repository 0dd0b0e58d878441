mod config;
mod error;
mod extractor;
mod handlers;
mod ids;
mod library;
mod progress;
mod state;
mod tasks;
mod worker;
mod ytdlp;

use axum::{
    Router,
    routing::{get, post},
};
use local_ip_address::local_ip;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{Level, info, warn};

use crate::config::Settings;
use crate::handlers::{api, web};
use crate::ids::IdGenerator;
use crate::progress::ProgressStore;
use crate::state::AppState;
use crate::ytdlp::YtDlp;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let settings = Settings::new().expect("Failed to load configuration");

    tracing_subscriber::fmt()
        .with_env_filter(&settings.log_level)
        .init();

    info!("Starting vidgrab...");

    if !settings.downloads_dir.exists() {
        std::fs::create_dir_all(&settings.downloads_dir)
            .expect("Failed to create downloads directory");
    }

    let ytdlp = YtDlp::new(&settings);
    match ytdlp.version().await {
        Ok(version) => info!("Using {} {}", settings.ytdlp_path, version),
        Err(e) => warn!("yt-dlp is not usable, downloads will fail: {}", e),
    }

    let state = AppState {
        settings: settings.clone(),
        progress: ProgressStore::new(),
        extractor: Arc::new(ytdlp),
        ids: IdGenerator::new(settings.id_scheme),
    };

    // Start background tasks (progress eviction)
    tasks::start_background_tasks(state.clone());

    // --- Router Setup ---
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", settings.server_host, settings.server_port)
        .parse()
        .expect("Invalid server address");
    info!("Listening on http://{}", addr);
    if let Ok(ip) = local_ip() {
        info!("Network address: http://{}:{}", ip, settings.server_port);
    }

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(web::index_handler))
        .route("/download", post(api::start_download))
        .route("/progress/{video_id}", get(api::get_progress))
        .route("/api/videos", get(api::list_videos))
        .route("/static/{*path}", get(web::static_handler))
        .nest_service(
            "/downloads",
            ServeDir::new(state.settings.downloads_dir.clone()),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(tower_http::trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

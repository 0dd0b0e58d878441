use crate::library::{self, DownloadedFile};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Assets;

pub async fn static_handler(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(content) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            ([(CONTENT_TYPE, mime.as_ref())], content.data).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

pub async fn index_handler(State(state): State<AppState>) -> Html<String> {
    let dir = state.settings.downloads_dir.clone();
    let videos = tokio::task::spawn_blocking(move || library::scan(&dir))
        .await
        .unwrap_or_default();
    Html(render_index(&videos))
}

fn render_index(videos: &[DownloadedFile]) -> String {
    let mut html = String::from(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Video Downloader</title>\
         <link rel=\"stylesheet\" href=\"/static/style.css\"></head><body>\
         <h1>Video Downloader</h1>\
         <form id=\"download-form\" method=\"post\" action=\"/download\">\
         <input type=\"url\" name=\"url\" id=\"url\" placeholder=\"Video URL\" required>\
         <button type=\"submit\">Download</button></form>\
         <div id=\"progress\"></div><h2>Downloaded</h2><ul id=\"videos\">",
    );

    for video in videos {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a> <span class=\"size\">{}</span> <span class=\"date\">{}</span></li>",
            escape_html(&video.path),
            escape_html(&video.title),
            escape_html(&video.size),
            escape_html(&video.date),
        ));
    }

    html.push_str("</ul><script src=\"/static/app.js\"></script></body></html>");
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

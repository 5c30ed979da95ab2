//! Web front end: upload a PDF, download the generated `.docx`.
//!
//! | Route            | Purpose                                      |
//! |------------------|----------------------------------------------|
//! | `GET /`          | upload form                                  |
//! | `POST /generate` | multipart upload → `.docx` attachment        |
//! | `GET /health`    | liveness probe                               |
//!
//! Each request works in its own [`tempfile::TempDir`]; the uploaded cover
//! image and the generated document are removed when the request ends,
//! whether it succeeded or not.

use crate::config::ReportCategory;
use crate::error::ReportError;
use crate::generate::{ReportPipeline, ReportRequest};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// MIME type of the download.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Upper bound for one multipart upload (PDF plus cover image).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared, immutable state of the web server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReportPipeline>,
}

impl AppState {
    pub fn new(pipeline: ReportPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route(
            "/generate",
            post(generate_handler).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), ReportError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ReportError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!("Listening on http://{addr}");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| ReportError::Internal(format!("server error: {e}")))
}

// ── Errors ───────────────────────────────────────────────────────────────

/// Handler error, rendered as `{"error": message}`.
#[derive(Debug)]
pub enum AppError {
    /// Missing or malformed form input.
    BadRequest(String),
    /// The report flow failed.
    Report(ReportError),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Report(err)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Report(e) if e.is_input() => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Report(e) if e.is_upstream() => StatusCode::BAD_GATEWAY,
            AppError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::BadRequest(msg) => {
                warn!("Rejected request: {msg}");
                msg
            }
            AppError::Report(err) => {
                error!("Report generation failed: {err}");
                err.to_string()
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn index() -> Html<String> {
    let options: String = ReportCategory::ALL
        .iter()
        .map(|c| format!("<option value=\"{0}\">{0}</option>", html_escape(c.label())))
        .collect();
    Html(INDEX_HTML.replace("{category_options}", &options))
}

/// Multipart fields: `pdf` (required), `image`, `user_name`, `category`.
pub async fn generate_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let workdir = tempfile::tempdir()
        .map_err(|e| ReportError::Internal(format!("cannot create request directory: {e}")))?;

    let mut pdf: Option<(String, Vec<u8>)> = None;
    let mut image: Option<PathBuf> = None;
    let mut user_name = String::new();
    let mut category = ReportCategory::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "pdf" => {
                let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
                let bytes = field.bytes().await.map_err(bad_request)?;
                info!("Received PDF '{}' ({} bytes)", file_name, bytes.len());
                pdf = Some((file_name, bytes.to_vec()));
            }
            "image" => {
                let ext = field
                    .file_name()
                    .and_then(|n| n.rsplit_once('.'))
                    .map(|(_, ext)| ext.to_ascii_lowercase())
                    .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
                    .unwrap_or_else(|| "png".to_string());
                let bytes = field.bytes().await.map_err(bad_request)?;
                if bytes.is_empty() {
                    continue;
                }
                let path = workdir.path().join(format!("cover.{ext}"));
                tokio::fs::write(&path, &bytes).await.map_err(|e| {
                    ReportError::Internal(format!("cannot store uploaded image: {e}"))
                })?;
                image = Some(path);
            }
            "user_name" => user_name = field.text().await.map_err(bad_request)?,
            "category" => {
                let text = field.text().await.map_err(bad_request)?;
                category = text
                    .parse()
                    .map_err(|e: ReportError| AppError::BadRequest(e.to_string()))?;
            }
            other => warn!("Ignoring unknown multipart field: {other}"),
        }
    }

    let (source_name, pdf_bytes) = pdf
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| AppError::BadRequest("a PDF upload in field 'pdf' is required".into()))?;

    let user_name = match user_name.trim() {
        "" => "Charlotte".to_string(),
        name => name.to_string(),
    };

    let request = ReportRequest::new(pdf_bytes, source_name)
        .user_name(user_name)
        .category(category)
        .image(image);

    let output_dir = workdir.path().join("out");
    let report = state.pipeline.generate(&request, &output_dir).await?;

    let body = tokio::fs::read(&report.path)
        .await
        .map_err(|e| ReportError::Internal(format!("cannot read generated report: {e}")))?;

    let disposition = content_disposition(&report.file_name);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(DOCX_MIME)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

fn bad_request(err: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(err.to_string())
}

/// `attachment` header carrying an ASCII fallback name and the UTF-8 name.
fn content_disposition(file_name: &str) -> HeaderValue {
    let ascii: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let value = format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        percent_encode(file_name)
    );
    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        if b.is_ascii_alphanumeric() || b"-._~".contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Research report to Word</title>
<style>
  body { font-family: sans-serif; max-width: 40rem; margin: 3rem auto; }
  label { display: block; margin-top: 1rem; font-weight: bold; }
  button { margin-top: 1.5rem; padding: 0.5rem 1.5rem; }
  .hint { color: #666; font-size: 0.9rem; }
</style>
</head>
<body>
<h1>Research report to Word</h1>
<p class="hint">Upload a broker research PDF. Two LLM passes turn it into a styled .docx; this takes up to four minutes.</p>
<form method="post" action="/generate" enctype="multipart/form-data">
  <label for="user_name">Your name</label>
  <input id="user_name" name="user_name" value="Charlotte">

  <label for="category">Report category</label>
  <select id="category" name="category">{category_options}</select>

  <label for="pdf">Research PDF</label>
  <input id="pdf" name="pdf" type="file" accept="application/pdf" required>

  <label for="image">Cover image (optional, not used for Weekly Fund Flow)</label>
  <input id="image" name="image" type="file" accept="image/png,image/jpeg">

  <button type="submit">Generate</button>
</form>
</body>
</html>
"#;

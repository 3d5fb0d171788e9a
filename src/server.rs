//! HTTP upload service.
//!
//! | Route | Method | Description |
//! |-------|--------|-------------|
//! | `/` | GET | Upload form |
//! | `/` | POST | multipart `file` (+ optional `single_page=true`) → PDF download |
//! | `/health` | GET | Engine status as JSON |
//!
//! Every conversion failure becomes the same flat `500` response; the cause
//! only goes to the log.

use crate::config::ServerConfig;
use crate::convert::Converter;
use crate::engine::ResolvedCommand;
use crate::error::ConversionError;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Flat message returned for any conversion failure.
pub const CONVERSION_FAILED: &str = "Failed to convert file to PDF";

const UPLOAD_FORM: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>PDF Converter</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 600px; margin: 50px auto; padding: 20px; }
        form { background: #f5f5f5; padding: 20px; border-radius: 8px; }
        .option { margin: 15px 0; }
        button { background: #007bff; color: white; padding: 10px 20px; border: none; border-radius: 4px; cursor: pointer; }
        .info { color: #666; font-size: 14px; margin-top: 10px; }
    </style>
</head>
<body>
    <h1>PDF Converter</h1>
    <form action="/" method="post" enctype="multipart/form-data">
        <input type="file" name="file" accept=".xlsx,.xls,.doc,.docx,.txt,.odt,.ods,.ppt,.pptx,.csv" required>
        <div class="option">
            <input type="checkbox" id="single_page" name="single_page" value="true">
            <label for="single_page">Fit each sheet on one page</label>
        </div>
        <button type="submit">Convert to PDF</button>
        <p class="info">Supported formats: Excel, Word, PowerPoint, Text, OpenDocument, CSV</p>
    </form>
</body>
</html>
"#;

#[derive(Clone)]
struct AppState {
    converter: Arc<Converter>,
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing `file` field.
    #[error("Invalid upload: {0}")]
    BadRequest(String),

    /// Rejected while reading the multipart body; keeps axum's status
    /// (`413` past the body limit, `400` for a malformed stream).
    #[error("Invalid upload: {message}")]
    Upload { status: StatusCode, message: String },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl From<MultipartError> for ServerError {
    fn from(e: MultipartError) -> Self {
        Self::Upload {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ErrorBody { detail: &msg })).into_response()
            }
            Self::Upload { status, message } => {
                (status, Json(ErrorBody { detail: &message })).into_response()
            }
            Self::Conversion(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    detail: CONVERSION_FAILED,
                }),
            )
                .into_response(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    engine: Option<String>,
    version: Option<String>,
}

/// Build the application router around a shared converter.
pub fn router(converter: Arc<Converter>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(upload_form).post(to_pdf))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(AppState { converter })
}

/// Serve until Ctrl-C.
pub async fn serve(converter: Arc<Converter>, config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(converter, &config))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
}

async fn upload_form() -> Html<&'static str> {
    Html(UPLOAD_FORM)
}

/// Receive a file from the form body, convert it, and return the PDF.
async fn to_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ServerError> {
    let mut upload = None;
    let mut single_page = false;

    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or("") {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await?;
                upload = Some((file_name, data));
            }
            "single_page" => {
                let value = field.text().await?;
                single_page = value.trim() == "true";
            }
            _ => continue,
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| ServerError::BadRequest("missing 'file' field".into()))?;
    debug!(
        "Upload '{}' ({} bytes, single_page={})",
        file_name,
        data.len(),
        single_page
    );

    let pdf = state
        .converter
        .convert_bytes(&file_name, &data, single_page)
        .await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        pdf.file_name.replace(['"', '\\'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.bytes,
    )
        .into_response())
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.converter.resolver().resolve().await {
        ResolvedCommand::Found { command, version } => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                engine: Some(command),
                version,
            }),
        ),
        ResolvedCommand::NotFound => {
            warn!("Health check: no conversion engine available");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "no_engine",
                    engine: None,
                    version: None,
                }),
            )
        }
    }
}

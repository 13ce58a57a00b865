//! HTTP request handlers for the server.
//!
//! Upload preview, streaming processing, archive download, health and
//! metrics endpoints using axum.

use crate::config::ServerConfig;
use axum::{
    body::{Body, Bytes},
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path as UrlPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use docstruct_domain::{ContentExtractor, Document, ProgressEvent};
use docstruct_ingest::{FileExtractor, ReadError};
use docstruct_llm::AnyProvider;
use docstruct_pipeline::{
    ArchiveError, MetricsSnapshot, ParsedDocument, PipelineError, PipelineRunner,
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pipeline runner shared by all requests
    pub runner: PipelineRunner<AnyProvider>,
    /// Reads uploaded files into text
    pub extractor: Arc<FileExtractor>,
    /// Upload limits and accepted formats
    pub config: Arc<ServerConfig>,
}

/// Request body of `POST /api/process-sections`
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessSectionsRequest {
    /// Section texts as returned by the preview endpoint
    pub parsed_sections: Vec<String>,
    /// Document-wide keywords
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Name of the uploaded file
    #[serde(default = "default_original_filename")]
    pub original_filename: String,
}

fn default_original_filename() -> String {
    "unknown".to_string()
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Structuring provider in use
    pub provider: String,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Malformed request
    BadRequest(String),
    /// Upload format not accepted
    UnsupportedFormat(String),
    /// Multipart decoding error (including oversized bodies)
    Multipart(MultipartError),
    /// Uploaded file could not be read
    Read(ReadError),
    /// Run-level pipeline error
    Pipeline(PipelineError),
    /// Archive lookup error
    Archive(ArchiveError),
    /// Internal server error
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UnsupportedFormat(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            AppError::Multipart(e) => (e.status(), e.body_text()),
            AppError::Read(e) => {
                let status = match e {
                    ReadError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    ReadError::FileTooLarge(..) => StatusCode::PAYLOAD_TOO_LARGE,
                    ReadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, e.to_string())
            }
            AppError::Pipeline(e) => {
                let status = match e {
                    PipelineError::EmptyDocument | PipelineError::NoSections => {
                        StatusCode::BAD_REQUEST
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            AppError::Archive(e) => {
                let status = match e {
                    ArchiveError::InvalidId(_) | ArchiveError::NotFound(_) => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse { error: message });
        (status, body).into_response()
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Multipart(e)
    }
}

impl From<ReadError> for AppError {
    fn from(e: ReadError) -> Self {
        AppError::Read(e)
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

impl From<ArchiveError> for AppError {
    fn from(e: ArchiveError) -> Self {
        AppError::Archive(e)
    }
}

/// An uploaded file whose extension has been accepted
struct Upload {
    file_name: String,
    extension: String,
    bytes: Bytes,
}

/// Read the `file` field of a multipart upload
async fn read_upload(state: &AppState, mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        // Keep only the final path component of client-supplied names
        let file_name = field
            .file_name()
            .and_then(|name| name.rsplit(['/', '\\']).next())
            .unwrap_or("")
            .trim()
            .to_string();
        if file_name.is_empty() {
            return Err(AppError::BadRequest("No selected file".to_string()));
        }

        let extension = FileExtractor::extension_of(Path::new(&file_name));
        if !state.config.allows_extension(&extension) {
            return Err(AppError::UnsupportedFormat(format!(
                "File type not allowed: {}",
                file_name
            )));
        }

        let bytes = field.bytes().await?;
        return Ok(Upload {
            file_name,
            extension,
            bytes,
        });
    }

    Err(AppError::BadRequest("No file part".to_string()))
}

/// Extract the text of an upload through a temporary file
async fn extract_document(state: &AppState, upload: Upload) -> Result<Document, AppError> {
    let extractor = Arc::clone(&state.extractor);
    let Upload {
        file_name,
        extension,
        bytes,
    } = upload;

    let text = tokio::task::spawn_blocking(move || -> Result<String, ReadError> {
        let mut file = tempfile::Builder::new()
            .prefix("docstruct-upload-")
            .suffix(&format!(".{}", extension))
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;
        extractor.extract(file.path())
    })
    .await
    .map_err(|e| AppError::InternalError(format!("extraction task failed: {}", e)))??;

    info!("Extracted {} characters from '{}'", text.len(), file_name);
    Ok(Document::new(text, file_name))
}

/// Serialize progress events as newline-delimited JSON
fn ndjson<S>(events: S) -> Response
where
    S: Stream<Item = ProgressEvent> + Send + 'static,
{
    let lines = events.map(|event| {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        Ok::<_, serde_json::Error>(Bytes::from(line))
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// POST /api/upload-and-parse - Segment an upload without structuring it
async fn upload_and_parse(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParsedDocument>, AppError> {
    let upload = read_upload(&state, multipart).await?;
    let document = extract_document(&state, upload).await?;
    let parsed = state.runner.parse(&document)?;

    info!(
        "Parsed '{}' into {} sections",
        parsed.original_filename,
        parsed.parsed_sections.len()
    );
    Ok(Json(parsed))
}

/// POST /api/process - Run the full pipeline over an upload
///
/// Request problems are HTTP errors; once the upload is accepted, every
/// outcome (including unreadable content) is reported in the event stream.
async fn process_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = read_upload(&state, multipart).await?;

    match extract_document(&state, upload).await {
        Ok(document) => Ok(ndjson(state.runner.run(document))),
        Err(AppError::Read(e)) => {
            warn!("Rejecting upload: {}", e);
            let fatal = ProgressEvent::FatalError {
                message: e.to_string(),
            };
            Ok(ndjson(stream::iter([fatal])))
        }
        Err(e) => Err(e),
    }
}

/// POST /api/process-sections - Run the pipeline over previewed sections
async fn process_sections(
    State(state): State<AppState>,
    Json(request): Json<ProcessSectionsRequest>,
) -> Response {
    info!(
        "Processing {} pre-parsed sections of '{}'",
        request.parsed_sections.len(),
        request.original_filename
    );
    ndjson(state.runner.run_sections(
        request.original_filename,
        request.parsed_sections,
        request.keywords,
    ))
}

/// GET /api/download/:archive_id - Fetch a finalized archive
async fn download(
    State(state): State<AppState>,
    UrlPath(archive_id): UrlPath<String>,
) -> Result<Response, AppError> {
    let store = state.runner.archives().clone();
    let id = archive_id.clone();
    let bytes = tokio::task::spawn_blocking(move || store.read(&id))
        .await
        .map_err(|e| AppError::InternalError(format!("download task failed: {}", e)))??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", archive_id),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// GET /health - Liveness check
async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        provider: state.config.llm.provider.clone(),
    })
}

/// GET /metrics - Pipeline counters
async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.runner.metrics().snapshot())
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    // Multipart framing on top of the largest accepted file
    let body_limit = state.config.max_upload_bytes + 64 * 1024;

    AxumRouter::new()
        .route("/api/upload-and-parse", post(upload_and_parse))
        .route("/api/process", post(process_upload))
        .route("/api/process-sections", post(process_sections))
        .route("/api/download/:archive_id", get(download))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

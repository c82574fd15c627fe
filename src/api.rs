//! HTTP surface for Rusty Summary.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /summarize` – Multipart upload (`pdf_file`, optional `chunk_size`). Extracts the PDF
//!   text, summarizes it chunk by chunk, and returns the summary with derived key points.
//! - `POST /summarize/text` – Same pipeline for raw text supplied as JSON.
//! - `GET /metrics` – Observe summarization counters and the last chunk size used.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Uploads are held in memory for the duration of the request and never written to disk.

use crate::processing::{
    KeyPoint, ProcessingError, SummarizationApi, SummaryOutcome, key_points::extract_key_points,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::Instrument;
use uuid::Uuid;

/// Multipart field carrying the PDF upload.
const FILE_FIELD: &str = "pdf_file";
/// Multipart field carrying an optional chunk size override.
const CHUNK_SIZE_FIELD: &str = "chunk_size";

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: SummarizationApi + 'static,
{
    Router::new()
        .route("/summarize", post(summarize_upload::<S>))
        .route("/summarize/text", post(summarize_text::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

/// Request body for the `POST /summarize/text` endpoint.
#[derive(Deserialize)]
struct TextRequest {
    /// Raw document contents to summarize.
    text: String,
    /// Optional chunk size override (defaults to `SUMMARY_CHUNK_SIZE`).
    #[serde(default)]
    chunk_size: Option<usize>,
}

/// Success response for both summarization endpoints.
#[derive(Serialize)]
struct SummaryResponse {
    /// Final summary text.
    summary: String,
    /// Up to five representative sentences of the summary.
    key_points: Vec<KeyPoint>,
    /// Number of chunks summarized.
    chunk_count: usize,
    /// Effective chunk size used for this request.
    chunk_size: usize,
    /// Token count of the full document.
    token_count: usize,
    /// Page count for PDF uploads.
    #[serde(skip_serializing_if = "Option::is_none")]
    page_count: Option<usize>,
    /// Hex SHA-256 of the submitted document.
    document_sha256: String,
    /// Identifier correlating this response with server logs.
    request_id: String,
    /// RFC 3339 timestamp of completion.
    generated_at: String,
}

impl SummaryResponse {
    fn new(outcome: SummaryOutcome, document_sha256: String, request_id: Uuid) -> Self {
        let key_points = extract_key_points(&outcome.summary);
        Self {
            summary: outcome.summary,
            key_points,
            chunk_count: outcome.chunk_count,
            chunk_size: outcome.chunk_size,
            token_count: outcome.token_count,
            page_count: outcome.page_count,
            document_sha256,
            request_id: request_id.to_string(),
            generated_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        }
    }
}

/// Summarize an uploaded PDF.
///
/// The upload must be a non-empty file whose name ends in `.pdf`. Any pipeline failure is
/// reported as a 500 with the error message; bad PDFs and model outages are not distinguished.
async fn summarize_upload<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummarizationApi,
{
    let mut upload = None;
    let mut chunk_size = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::bad_request(format!("Multipart error: {error}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(FILE_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|error| {
                    AppError::bad_request(format!("Failed to read file: {error}"))
                })?;
                upload = Some((filename, bytes));
            }
            Some(CHUNK_SIZE_FIELD) => {
                let value = field.text().await.map_err(|error| {
                    AppError::bad_request(format!("Failed to read chunk_size: {error}"))
                })?;
                chunk_size = Some(parse_chunk_size(&value)?);
            }
            _ => {}
        }
    }

    let (filename, bytes) = upload
        .ok_or_else(|| AppError::bad_request(format!("No file provided in '{FILE_FIELD}'")))?;
    validate_upload(&filename, &bytes)?;

    let request_id = Uuid::new_v4();
    let digest = document_digest(&bytes);
    let span = tracing::info_span!("summarize_upload", %request_id, filename = %filename);
    span.in_scope(|| tracing::info!(bytes = bytes.len(), sha256 = %digest, "Document received"));
    let outcome = service
        .summarize_document(&bytes, chunk_size)
        .instrument(span)
        .await?;
    tracing::info!(
        %request_id,
        chunks = outcome.chunk_count,
        chunk_size = outcome.chunk_size,
        pages = outcome.page_count,
        "Summarize request completed"
    );
    Ok(Json(SummaryResponse::new(outcome, digest, request_id)))
}

/// Summarize raw text supplied as JSON.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<TextRequest>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummarizationApi,
{
    let TextRequest { text, chunk_size } = request;
    if text.trim().is_empty() {
        return Err(AppError::bad_request("Text must not be empty"));
    }

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("summarize_text", %request_id);
    let outcome = service
        .summarize_text(&text, chunk_size)
        .instrument(span)
        .await?;
    tracing::info!(
        %request_id,
        chunks = outcome.chunk_count,
        chunk_size = outcome.chunk_size,
        "Summarize text request completed"
    );
    Ok(Json(SummaryResponse::new(
        outcome,
        document_digest(text.as_bytes()),
        request_id,
    )))
}

fn document_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn parse_chunk_size(value: &str) -> Result<usize, AppError> {
    match value.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(AppError::bad_request(
            "chunk_size must be a positive integer",
        )),
    }
}

fn validate_upload(filename: &str, bytes: &[u8]) -> Result<(), AppError> {
    if !filename.to_lowercase().ends_with(".pdf") {
        return Err(AppError::bad_request("Only PDF files are allowed."));
    }
    if bytes.is_empty() {
        return Err(AppError::bad_request("The submitted file is empty."));
    }
    Ok(())
}

/// Return a concise metrics snapshot with summarization counters and the last chunk size.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsResponse>
where
    S: SummarizationApi,
{
    let snapshot = service.metrics_snapshot();
    Json(MetricsResponse {
        documents_summarized: snapshot.documents_summarized,
        chunks_summarized: snapshot.chunks_summarized,
        failed_documents: snapshot.failed_documents,
        last_chunk_size: snapshot.last_chunk_size,
    })
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    documents_summarized: u64,
    chunks_summarized: u64,
    failed_documents: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_chunk_size: Option<u64>,
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/summarize",
                description: "Upload a PDF as multipart field 'pdf_file' (optional 'chunk_size'); the text is split into token chunks, each chunk is summarized, and the summaries are joined in order.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize_text",
                method: "POST",
                path: "/summarize/text",
                description: "Summarize raw text with the same chunked pipeline.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "chunk_size": 1024
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return summarization counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    BadRequest(String),
    Processing(ProcessingError),
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Processing(error) => (StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

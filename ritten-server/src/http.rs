//! Rittenadministratie HTTP REST API
//!
//! Axum-based HTTP server exposing upload, browsing and export of trip
//! sessions. Every route is nested under `http.mount_path` (default `/api`).
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum
//! dispatch machinery.
//!
//! Endpoints:
//! - POST   /upload                 upload an XML export (multipart field `file`)
//! - GET    /data/{session_id}      paginated, searchable records
//! - GET    /download/{session_id}  records as an `.xlsx` attachment
//! - GET    /sessions               all live sessions
//! - DELETE /sessions/{session_id}  drop a session
//! - GET    /health                 liveness and session count
//! - GET    /version                server version info

use std::sync::Arc;

use anyhow::Result;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use ritten_core::{
    output_filename, parse_trips_bytes, render_workbook, PageQuery, RittenConfig, RittenError,
    SessionStore, XLSX_CONTENT_TYPE,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use uuid::Uuid;

const UPLOAD_FIELD: &str = "file";
const MSG_NO_FILE: &str = "Geen bestand gevonden";
const MSG_NO_FILENAME: &str = "Geen bestand geselecteerd";
const MSG_NOT_XML: &str = "Alleen XML bestanden zijn toegestaan";
const MSG_UPLOADED: &str = "Bestand succesvol geüpload en verwerkt";
const MSG_DELETED: &str = "Sessie verwijderd";

/// Shared state for all HTTP handlers
pub struct HttpState {
    pub store: SessionStore,
    pub config: RittenConfig,
}

impl HttpState {
    pub fn new(config: RittenConfig) -> Self {
        Self {
            store: SessionStore::new(),
            config,
        }
    }
}

/// Build the Axum router with all endpoints under the configured mount path
pub fn build_router(state: Arc<HttpState>) -> Router {
    let mount = mount_path(&state.config.http.mount_path);
    let body_limit = state.config.http.max_upload_bytes;

    let api = Router::new()
        .route("/upload", post(upload_handler))
        .route("/data/:session_id", get(data_handler))
        .route("/download/:session_id", get(download_handler))
        .route("/sessions", get(sessions_handler))
        .route("/sessions/:session_id", delete(delete_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    match mount {
        Some(prefix) => Router::new().nest(&prefix, api),
        None => api,
    }
}

/// Normalise a configured mount path; `None` means serve at the root.
fn mount_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    config: RittenConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let mount = config.http.mount_path.clone();
    let state = Arc::new(HttpState::new(config));

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Rittenadministratie API listening on http://{}{}", addr, mount);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request / Response DTOs
// ============================================================================

/// One file pulled out of a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Bytes,
}

/// Query string for `GET /data/{id}`.
///
/// Values arrive as raw strings so that non-numeric `page`/`per_page` fall
/// back to their defaults instead of rejecting the request.
#[derive(Debug, Default)]
pub struct DataParams {
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub search: Option<String>,
}

impl DataParams {
    /// Build from decoded query pairs; the first value of a repeated key wins
    /// and unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut params.page,
                "per_page" => &mut params.per_page,
                "search" => &mut params.search,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        params
    }

    pub fn into_query(self) -> PageQuery {
        let defaults = PageQuery::default();
        PageQuery {
            page: parse_int_or(self.page, defaults.page),
            per_page: parse_int_or(self.per_page, defaults.per_page),
            search: self.search.unwrap_or_default(),
        }
    }
}

fn parse_int_or(raw: Option<String>, default: i64) -> i64 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            status: "error".to_string(),
        }
    }
}

/// A rendered workbook ready to be sent as an attachment
#[derive(Debug)]
pub struct XlsxDownload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl IntoResponse for XlsxDownload {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(XLSX_CONTENT_TYPE)),
                (header::CONTENT_DISPOSITION, content_disposition(&self.filename)),
            ],
            self.content,
        )
            .into_response()
    }
}

/// `attachment; filename=<name>`, with control characters replaced so the
/// value is always a legal header.
pub fn content_disposition(filename: &str) -> HeaderValue {
    let safe: String = filename
        .chars()
        .map(|c| if c.is_control() { '_' } else { c })
        .collect();
    HeaderValue::from_bytes(format!("attachment; filename={}", safe).as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner upload: validates the file, maps it and opens a session.
pub async fn upload_inner(
    store: &SessionStore,
    upload: Option<UploadedFile>,
) -> (StatusCode, serde_json::Value) {
    let file = match upload {
        Some(f) => f,
        None => return error_response(&RittenError::BadRequest(MSG_NO_FILE.to_string())),
    };

    if file.filename.is_empty() {
        return error_response(&RittenError::BadRequest(MSG_NO_FILENAME.to_string()));
    }

    if !file.filename.to_lowercase().ends_with(".xml") {
        return error_response(&RittenError::BadRequest(MSG_NOT_XML.to_string()));
    }

    let content = file.content;
    let mapped = tokio::task::spawn_blocking(move || parse_trips_bytes(&content))
        .await
        .unwrap_or_else(|e| Err(RittenError::Unexpected(e.to_string())));

    let records = match mapped {
        Ok(records) => records,
        Err(e) => return error_response(&e),
    };

    let total_records = records.len();
    let session_id = store.create(file.filename.clone(), records);
    tracing::info!(
        %session_id,
        filename = %file.filename,
        total_records,
        "Upload stored"
    );

    (
        StatusCode::OK,
        serde_json::json!({
            "session_id": session_id,
            "filename": file.filename,
            "total_records": total_records,
            "message": MSG_UPLOADED,
        }),
    )
}

/// Inner data read: filter and paginate one session.
pub fn data_inner(
    store: &SessionStore,
    session_id: &str,
    params: DataParams,
) -> (StatusCode, serde_json::Value) {
    let result = parse_session_id(session_id).and_then(|id| store.query(&id, &params.into_query()));
    match result {
        Ok(page) => to_body(&page),
        Err(e) => error_response(&e),
    }
}

/// Inner download: render the session's records as a workbook.
pub async fn download_inner(
    store: &SessionStore,
    session_id: &str,
) -> std::result::Result<XlsxDownload, (StatusCode, serde_json::Value)> {
    let snapshot = parse_session_id(session_id)
        .and_then(|id| store.records(&id))
        .map_err(|e| error_response(&e))?;

    let records = snapshot.records;
    let content = tokio::task::spawn_blocking(move || render_workbook(&records))
        .await
        .unwrap_or_else(|e| Err(RittenError::Unexpected(e.to_string())))
        .map_err(|e| error_response(&e))?;

    let filename = output_filename(&snapshot.filename);
    tracing::info!(%session_id, filename = %filename, bytes = content.len(), "Workbook exported");

    Ok(XlsxDownload { filename, content })
}

/// Inner session listing (pure, no IO).
pub fn sessions_inner(store: &SessionStore) -> serde_json::Value {
    serde_json::json!({ "sessions": store.list() })
}

/// Inner delete: drop a session and all its records.
pub fn delete_inner(store: &SessionStore, session_id: &str) -> (StatusCode, serde_json::Value) {
    match parse_session_id(session_id).and_then(|id| store.delete(&id)) {
        Ok(()) => {
            tracing::info!(%session_id, "Session deleted");
            (StatusCode::OK, serde_json::json!({ "message": MSG_DELETED }))
        }
        Err(e) => error_response(&e),
    }
}

/// Inner health check.
pub fn health_inner(store: &SessionStore) -> serde_json::Value {
    serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": store.len(),
    })
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "ritten/1",
    })
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn upload_handler(
    State(state): State<Arc<HttpState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> impl IntoResponse {
    let upload = match multipart {
        Ok(multipart) => read_upload(multipart).await,
        Err(rejection) => {
            tracing::warn!("Upload without multipart body: {}", rejection);
            Ok(None)
        }
    };

    let (status, body) = match upload {
        Ok(file) => upload_inner(&state.store, file).await,
        Err(e) => error_response(&e),
    };
    (status, Json(body))
}

pub async fn data_handler(
    State(state): State<Arc<HttpState>>,
    Path(session_id): Path<String>,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> impl IntoResponse {
    let (status, body) = match query {
        Ok(Query(pairs)) => data_inner(&state.store, &session_id, DataParams::from_pairs(pairs)),
        Err(rejection) => error_response(&RittenError::BadRequest(rejection.body_text())),
    };
    (status, Json(body))
}

pub async fn download_handler(
    State(state): State<Arc<HttpState>>,
    Path(session_id): Path<String>,
) -> Response {
    match download_inner(&state.store, &session_id).await {
        Ok(download) => download.into_response(),
        Err((status, body)) => (status, Json(body)).into_response(),
    }
}

pub async fn sessions_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(sessions_inner(&state.store)))
}

pub async fn delete_handler(
    State(state): State<Arc<HttpState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = delete_inner(&state.store, &session_id);
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(health_inner(&state.store)))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Pull the `file` field out of a multipart body; other fields are skipped.
/// A `file` field without a filename counts as no file.
pub async fn read_upload(
    mut multipart: Multipart,
) -> std::result::Result<Option<UploadedFile>, RittenError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RittenError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let content = field
            .bytes()
            .await
            .map_err(|e| RittenError::BadRequest(e.body_text()))?;
        return Ok(Some(UploadedFile { filename, content }));
    }
    Ok(None)
}

/// Session ids that are not UUIDs cannot exist, so they are reported as not found.
pub fn parse_session_id(raw: &str) -> ritten_core::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| RittenError::NotFound(raw.to_string()))
}

/// Map an error onto its status code and JSON body.
pub fn error_response(err: &RittenError) -> (StatusCode, serde_json::Value) {
    let status = match err {
        RittenError::BadRequest(_) | RittenError::Parse(_) | RittenError::Processing(_) => {
            StatusCode::BAD_REQUEST
        }
        RittenError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    match err {
        RittenError::NotFound(id) => tracing::warn!(session_id = %id, "Unknown session"),
        _ if status.is_server_error() => tracing::error!(error = %err, "Request failed"),
        _ => tracing::warn!(error = %err, "Request rejected"),
    }

    let body = serde_json::to_value(ErrorResponse::new(err.to_string()))
        .unwrap_or_else(|_| serde_json::json!({ "error": err.to_string(), "status": "error" }));
    (status, body)
}

fn to_body<T: Serialize>(value: &T) -> (StatusCode, serde_json::Value) {
    match serde_json::to_value(value) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => error_response(&RittenError::Unexpected(e.to_string())),
    }
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================

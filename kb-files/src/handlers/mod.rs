//! HTTP handlers for file upload and retrieval
//!
//! # Routes
//!
//! | method | path | response |
//! |---|---|---|
//! | `POST` | `/v1/file` | 201 + JSON metadata view |
//! | `GET` | `/v1/file/{id}` | JSON metadata view |
//! | `GET` | `/v1/file-data/{id}` | raw bytes, typed by sniffed MIME |
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use kb_files::handlers;
//! use kb_files::storage::{FileStore, InMemoryMetadataCollection};
//! use axum::{routing::{get, post}, Router};
//! use std::sync::Arc;
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = Arc::new(FileStore::new("data/kb-files", Arc::new(InMemoryMetadataCollection::new()))?);
//! let app: Router = Router::new()
//!     .route("/v1/file", post(handlers::upload_file))
//!     .route("/v1/file-data/{id}", get(handlers::get_file_data))
//!     .with_state(store);
//! # Ok(())
//! # }
//! ```

use axum::{
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::extractors::FileField;
use crate::storage::{FileId, FileMetadataView, FileStore};

/// Content type used when sniffing found nothing
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Accepts a multipart upload and stores the `file` part
///
/// `POST /v1/file`
///
/// # Errors
///
/// - 400 `Missing \`file\` file.` when no `file` part is present
/// - 400 with a parser code when the multipart body is rejected
/// - 500 when the file or its metadata cannot be persisted
pub async fn upload_file(
    State(store): State<Arc<FileStore>>,
    FileField(file): FileField,
) -> Result<(StatusCode, Json<FileMetadataView>), ApiError> {
    let metadata = store.upload_file(&file.data, file.filename).await?;
    Ok((StatusCode::CREATED, Json(metadata.view())))
}

/// Returns the metadata view of a stored file
///
/// `GET /v1/file/{id}`
///
/// # Errors
///
/// - 400 when `id` is not a valid file id
/// - 404 when no completed upload has that id
pub async fn get_file_metadata(
    State(store): State<Arc<FileStore>>,
    Path(id): Path<String>,
) -> Result<Json<FileMetadataView>, ApiError> {
    let file_id = parse_id(&id)?;
    let metadata = store
        .get_file_metadata(file_id)
        .await?
        .ok_or(ApiError::NotFound(id))?;

    Ok(Json(metadata.view()))
}

/// Streams back the stored bytes of a file
///
/// `GET /v1/file-data/{id}`
///
/// The response is typed with the sniffed MIME type, falling back to
/// `application/octet-stream`.
///
/// # Errors
///
/// - 400 when `id` is not a valid file id
/// - 404 when no completed upload has that id
/// - 500 when the record exists but its bytes cannot be read
pub async fn get_file_data(
    State(store): State<Arc<FileStore>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let file_id = parse_id(&id)?;
    let Some(metadata) = store.get_file_metadata(file_id).await? else {
        return Err(ApiError::NotFound(id));
    };
    let data = store.read_blob(&metadata).await?;

    let content_type = metadata
        .mime_type
        .as_deref()
        .and_then(|mime| HeaderValue::from_str(mime).ok())
        .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

    Ok(([(CONTENT_TYPE, content_type)], data).into_response())
}

fn parse_id(raw: &str) -> Result<FileId, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidId(raw.to_string()))
}

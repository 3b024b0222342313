//! Single-file multipart extractor
//!
//! Accepts exactly one file part under the `file` field and buffers it in
//! memory. Text parts are ignored. A file part under any other field name, or
//! a second `file` part, is rejected with `LIMIT_UNEXPECTED_FILE`. A request
//! that is not multipart at all counts as having no file.
//!
//! Size limits come from axum's `DefaultBodyLimit` layer on the router; a
//! body over the limit surfaces as `LIMIT_FILE_SIZE`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kb_files::extractors::FileField;
//! use axum::response::IntoResponse;
//!
//! async fn handler(FileField(file): FileField) -> impl IntoResponse {
//!     format!("Received: {} ({} bytes)", file.filename, file.data.len())
//! }
//! ```

use crate::error::{ApiError, UploadErrorCode};
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use bytes::Bytes;

/// Name of the multipart field carrying the upload
pub const FILE_FIELD: &str = "file";

/// A file part buffered from a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename from the part's Content-Disposition, untouched
    pub filename: String,

    /// Raw file bytes
    pub data: Bytes,
}

/// Extractor for the `file` part of a multipart upload
///
/// Rejects with [`ApiError::MissingFile`] when there is no `file` part, and
/// with [`ApiError::Upload`] for parser failures and unexpected file parts.
#[derive(Debug)]
pub struct FileField(pub UploadedFile);

impl<S> FromRequest<S> for FileField
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    #[allow(clippy::manual_async_fn)]
    fn from_request(
        req: Request,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            if !is_multipart(&req) {
                return Err(ApiError::MissingFile(FILE_FIELD));
            }

            let mut multipart = Multipart::from_request(req, state).await?;
            let mut upload: Option<UploadedFile> = None;

            while let Some(field) = multipart.next_field().await? {
                // Parts without a filename are plain form values
                let Some(filename) = field.file_name().map(ToOwned::to_owned) else {
                    continue;
                };

                if field.name() != Some(FILE_FIELD) || upload.is_some() {
                    let name = field.name().unwrap_or_default().to_owned();
                    return Err(ApiError::upload(
                        UploadErrorCode::LimitUnexpectedFile,
                        format!("unexpected file part `{name}`"),
                    ));
                }

                let data = field.bytes().await?;
                upload = Some(UploadedFile { filename, data });
            }

            upload.map(Self).ok_or(ApiError::MissingFile(FILE_FIELD))
        }
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/")
        })
}

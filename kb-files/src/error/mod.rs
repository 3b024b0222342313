//! Error types and error handling at the HTTP boundary
//!
//! Every handler returns `Result<_, ApiError>`. The single `IntoResponse`
//! implementation below is the module's error stage: it picks the status and
//! public message from the error's [`ErrorKind`] and logs internal failures
//! without leaking their details to the client.

use crate::storage::StorageError;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Body returned for every internal failure
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error occured.";

/// Coarse classification driving status and message selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request is missing or misstates something the caller controls
    ClientInput,
    /// The multipart body could not be parsed or broke a limit
    UploadParser,
    /// The requested record does not exist
    NotFound,
    /// Anything else; details stay server-side
    Internal,
}

/// Machine-readable codes for multipart parser failures
///
/// Sent verbatim as the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorCode {
    /// A part or the whole body exceeded the configured size limit
    LimitFileSize,
    /// A file part arrived under a field other than `file`, or more than once
    LimitUnexpectedFile,
    /// The body is not valid multipart
    MalformedMultipart,
}

impl UploadErrorCode {
    /// Wire representation of the code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LimitFileSize => "LIMIT_FILE_SIZE",
            Self::LimitUnexpectedFile => "LIMIT_UNEXPECTED_FILE",
            Self::MalformedMultipart => "MALFORMED_MULTIPART",
        }
    }
}

impl fmt::Display for UploadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    /// The multipart body carried no file under the named field
    #[error("Missing `{0}` file.")]
    MissingFile(&'static str),

    /// The path segment is not a valid file id
    #[error("Invalid file id.")]
    InvalidId(String),

    /// Multipart parsing failed
    #[error("{code}")]
    Upload {
        /// Code reported to the client
        code: UploadErrorCode,
        /// Parser message, logged only
        detail: String,
    },

    /// No completed record for the requested id
    #[error("File not found.")]
    NotFound(String),

    /// Storage or metadata failure
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Builds a parser error with the given code
    pub fn upload(code: UploadErrorCode, detail: impl Into<String>) -> Self {
        Self::Upload {
            code,
            detail: detail.into(),
        }
    }

    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFile(_) | Self::InvalidId(_) => ErrorKind::ClientInput,
            Self::Upload { .. } => ErrorKind::UploadParser,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status for this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::ClientInput | ErrorKind::UploadParser => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client
    #[must_use]
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => INTERNAL_ERROR_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let code = if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadErrorCode::LimitFileSize
        } else {
            UploadErrorCode::MalformedMultipart
        };
        Self::upload(code, err.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::upload(UploadErrorCode::MalformedMultipart, rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::Internal => tracing::error!(error = %self, "Request failed"),
            ErrorKind::UploadParser => {
                if let Self::Upload { code, detail } = &self {
                    tracing::debug!(%code, %detail, "Rejected multipart upload");
                }
            }
            ErrorKind::ClientInput | ErrorKind::NotFound => {
                tracing::debug!(error = %self, "Client error");
            }
        }

        (self.status(), self.public_message()).into_response()
    }
}

//! Core types for file storage

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during file storage operations
///
/// Every variant is fatal from the caller's point of view. Lookups that find
/// nothing return `Ok(None)` instead of an error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error while touching the data directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata store error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A record with this id is already present in the collection
    #[error("Duplicate file id: {0}")]
    DuplicateId(FileId),

    /// A stored record could not be decoded
    #[error("Corrupt metadata record: {0}")]
    Corrupt(String),

    /// The configured root is not usable as a directory
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Identifier of a stored file
///
/// Wraps a random (v4) UUID. Rendered in hyphenated form externally and in
/// simple form inside storage filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    /// Generates a fresh identifier
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Lowercase hex form without hyphens, used in storage filenames
    #[must_use]
    pub fn simple(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for FileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for FileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Two-phase write marker on a metadata record
///
/// A record is inserted as `Pending` before its bytes hit the disk and flips
/// to `Complete` once the write has been flushed. Lookups only ever see
/// `Complete` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Record inserted, bytes not yet confirmed on disk
    Pending,
    /// Bytes written and flushed
    Complete,
}

impl UploadStatus {
    /// Stable string form used by persistent backends
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Complete => "complete",
        }
    }
}

impl FromStr for UploadStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "complete" => Ok(Self::Complete),
            other => Err(StorageError::Corrupt(format!("unknown upload status `{other}`"))),
        }
    }
}

/// Durable description of an uploaded file
///
/// `path` is server-local and must never reach a client; use
/// [`FileMetadataView`] for anything that leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Unique identifier, assigned once at upload
    pub id: FileId,

    /// Sniffed MIME type, `None` when the content has no known signature
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Original client-supplied filename (untrusted, not sanitized)
    pub filename: String,

    /// Filesystem path of the stored bytes
    pub path: PathBuf,

    /// Upload time at millisecond precision
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: DateTime<Utc>,

    /// Write phase of the record
    pub status: UploadStatus,
}

impl FileMetadata {
    /// Whether the record's bytes have been confirmed on disk
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == UploadStatus::Complete
    }

    /// Builds the client-facing representation of this record
    #[must_use]
    pub fn view(&self) -> FileMetadataView {
        FileMetadataView::from(self)
    }
}

impl fmt::Display for FileMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileMetadata(id={}, filename={}, type={})",
            self.id,
            self.filename,
            self.mime_type.as_deref().unwrap_or("unknown")
        )
    }
}

/// External representation of a metadata record
///
/// Identifiers and timestamps are rendered as strings, and the storage path
/// is left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadataView {
    /// Hyphenated UUID
    pub id: String,

    /// Sniffed MIME type, omitted when unknown
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub mime_type: Option<String>,

    /// Original filename
    pub filename: String,

    /// ISO-8601 UTC timestamp, e.g. `2024-05-01T12:30:00.123Z`
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,
}

impl From<&FileMetadata> for FileMetadataView {
    fn from(metadata: &FileMetadata) -> Self {
        Self {
            id: metadata.id.to_string(),
            mime_type: metadata.mime_type.clone(),
            filename: metadata.filename.clone(),
            uploaded_at: metadata
                .uploaded_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

//! Stores and records for unit tests

use crate::storage::{FileId, FileMetadata, FileStore, InMemoryMetadataCollection, UploadStatus};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tempfile::TempDir;

/// The eight-byte PNG file signature
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Store rooted in a fresh temporary directory over an in-memory collection
///
/// Keep the returned `TempDir` alive for as long as the store is used.
pub fn create_test_store() -> (FileStore, Arc<InMemoryMetadataCollection>, TempDir) {
    let temp = TempDir::new().unwrap();
    let collection = Arc::new(InMemoryMetadataCollection::new());
    let store = FileStore::new(temp.path(), collection.clone()).unwrap();
    (store, collection, temp)
}

/// Pending record whose path points at a file that does not exist
pub fn pending_record(filename: &str, uploaded_at: DateTime<Utc>) -> FileMetadata {
    let id = FileId::new();
    FileMetadata {
        id,
        mime_type: None,
        filename: filename.to_string(),
        path: std::env::temp_dir()
            .join("kb-files-missing")
            .join(format!("{}.bin", id.simple())),
        uploaded_at,
        status: UploadStatus::Pending,
    }
}

//! Metadata collection abstraction
//!
//! The host hands the module a collection handle instead of the module
//! reaching for a global client. Backends only need id-keyed document
//! semantics plus the two-phase status transitions.

use super::types::{FileId, FileMetadata, StorageError, StorageResult, UploadStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Id-keyed store of [`FileMetadata`] records
///
/// # Implementation Requirements
///
/// Implementations must:
/// - Reject a second insert with an id that is already present
/// - Return records in whatever status they are stored; filtering out
///   pending records is the service's job
/// - Be safe to share across concurrent requests
///
/// # Examples
///
/// ```rust
/// use kb_files::storage::{InMemoryMetadataCollection, MetadataCollection};
/// use kb_files::storage::FileId;
///
/// # async fn example() -> anyhow::Result<()> {
/// let collection = InMemoryMetadataCollection::new();
/// assert!(collection.find_by_id(FileId::new()).await?.is_none());
/// # Ok(())
/// # }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataCollection: Send + Sync {
    /// Inserts a new record
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DuplicateId` if the id is taken, or a backend
    /// error if the store is unavailable.
    async fn insert(&self, record: FileMetadata) -> StorageResult<()>;

    /// Looks up a record by id, regardless of status
    async fn find_by_id(&self, id: FileId) -> StorageResult<Option<FileMetadata>>;

    /// Flips a record to [`UploadStatus::Complete`]
    ///
    /// Returns `false` if no record with that id exists.
    async fn mark_complete(&self, id: FileId) -> StorageResult<bool>;

    /// Deletes a record, returning whether one was removed
    async fn remove(&self, id: FileId) -> StorageResult<bool>;

    /// Lists pending records uploaded strictly before `cutoff`
    async fn find_pending_before(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<FileMetadata>>;
}

/// Process-local collection backed by a hash map
///
/// Useful for embedding the module without a database and for tests.
/// Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryMetadataCollection {
    records: RwLock<HashMap<FileId, FileMetadata>>,
}

impl InMemoryMetadataCollection {
    /// Creates an empty collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, in any status
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the collection holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl MetadataCollection for InMemoryMetadataCollection {
    async fn insert(&self, record: FileMetadata) -> StorageResult<()> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(StorageError::DuplicateId(record.id));
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(&self, id: FileId) -> StorageResult<Option<FileMetadata>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn mark_complete(&self, id: FileId) -> StorageResult<bool> {
        Ok(self.records.write().get_mut(&id).is_some_and(|record| {
            record.status = UploadStatus::Complete;
            true
        }))
    }

    async fn remove(&self, id: FileId) -> StorageResult<bool> {
        Ok(self.records.write().remove(&id).is_some())
    }

    async fn find_pending_before(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<FileMetadata>> {
        let mut pending: Vec<FileMetadata> = self
            .records
            .read()
            .values()
            .filter(|record| record.status == UploadStatus::Pending && record.uploaded_at < cutoff)
            .cloned()
            .collect();
        pending.sort_by_key(|record| record.uploaded_at);
        Ok(pending)
    }
}

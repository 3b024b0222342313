//! File store service
//!
//! Owns the write protocol that makes an upload discoverable by id:
//!
//! 1. insert a `Pending` metadata record
//! 2. write and flush the bytes to their date-partitioned path
//! 3. flip the record to `Complete`
//!
//! Lookups never see `Pending` records, so a record that is visible always
//! had its bytes flushed first. Records stranded in `Pending` by a crash or a
//! failed final update are reclaimed by [`FileStore::purge_pending`].

use super::collection::MetadataCollection;
use super::layout;
use super::sniff::detect_mime;
use super::types::{FileId, FileMetadata, StorageError, StorageResult, UploadStatus};
use chrono::{DateTime, SubsecRound, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Date-partitioned file store with a pluggable metadata collection
///
/// # Examples
///
/// ```rust,no_run
/// use kb_files::storage::{FileStore, InMemoryMetadataCollection};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = FileStore::new("data/kb-files", Arc::new(InMemoryMetadataCollection::new()))?;
///
/// let metadata = store.upload_file(b"hello", "hello.txt").await?;
/// let bytes = store.get_file_buffer(metadata.id).await?;
/// assert_eq!(bytes.as_deref(), Some(&b"hello"[..]));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
    collection: Arc<dyn MetadataCollection>,
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Creates a store rooted at `root`, creating the root directory (and its
    /// ancestors) if it does not exist yet
    ///
    /// Date partitions below the root are created lazily and non-recursively
    /// on upload.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `root` exists but is not a directory
    /// - `root` cannot be created
    pub fn new(
        root: impl Into<PathBuf>,
        collection: Arc<dyn MetadataCollection>,
    ) -> StorageResult<Self> {
        let root = root.into();

        // Synchronous check is fine at startup
        if root.exists() && !root.is_dir() {
            return Err(StorageError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        std::fs::create_dir_all(&root)?;

        tracing::info!(root = %root.display(), "File store ready");
        Ok(Self { root, collection })
    }

    /// Root directory of the date partitions
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores `bytes` under a fresh id and returns the completed record
    ///
    /// The MIME type is sniffed from the content; `filename` is recorded
    /// verbatim and never used to build the storage path.
    ///
    /// # Errors
    ///
    /// Returns an error if the date directory cannot be created, the record
    /// cannot be inserted, the bytes cannot be written, or the record cannot
    /// be marked complete. A failed write removes the pending record again
    /// (best effort).
    pub async fn upload_file(
        &self,
        bytes: &[u8],
        filename: impl Into<String>,
    ) -> StorageResult<FileMetadata> {
        let uploaded_at = Utc::now().trunc_subsecs(3);
        let id = FileId::new();
        let path = layout::blob_path(&self.root, uploaded_at, &id);

        if let Some(dir) = path.parent() {
            ensure_partition(dir).await?;
        }

        let mut metadata = FileMetadata {
            id,
            mime_type: detect_mime(bytes).map(ToOwned::to_owned),
            filename: filename.into(),
            path,
            uploaded_at,
            status: UploadStatus::Pending,
        };

        self.collection.insert(metadata.clone()).await?;

        if let Err(e) = write_blob(&metadata.path, bytes).await {
            self.discard(&metadata).await;
            return Err(e.into());
        }

        if !self.collection.mark_complete(id).await? {
            // The record is gone, so the sweep can no longer reach this file
            if let Err(e) = remove_blob(&metadata.path).await {
                tracing::warn!(file_id = %id, error = %e, "Failed to remove orphaned file");
            }
            return Err(StorageError::Corrupt(format!(
                "record {id} vanished before it could be completed"
            )));
        }
        metadata.status = UploadStatus::Complete;

        tracing::info!(
            file_id = %metadata.id,
            filename = %metadata.filename,
            mime_type = metadata.mime_type.as_deref().unwrap_or("unknown"),
            size = bytes.len(),
            "File uploaded"
        );

        Ok(metadata)
    }

    /// Looks up the completed record for `id`
    ///
    /// Returns `Ok(None)` when no record exists or the upload has not
    /// finished.
    ///
    /// # Errors
    ///
    /// Returns an error only if the metadata collection fails.
    pub async fn get_file_metadata(&self, id: FileId) -> StorageResult<Option<FileMetadata>> {
        let metadata = self
            .collection
            .find_by_id(id)
            .await?
            .filter(FileMetadata::is_complete);

        tracing::debug!(file_id = %id, found = metadata.is_some(), "Metadata lookup");
        Ok(metadata)
    }

    /// Reads back the bytes stored for `id`
    ///
    /// Returns `Ok(None)` when there is no completed record for `id`.
    ///
    /// # Errors
    ///
    /// A record whose backing file is missing or unreadable is an I/O error,
    /// not an absent result.
    pub async fn get_file_buffer(&self, id: FileId) -> StorageResult<Option<Vec<u8>>> {
        let Some(metadata) = self.get_file_metadata(id).await? else {
            return Ok(None);
        };

        self.read_blob(&metadata).await.map(Some)
    }

    /// Reads the bytes behind an already resolved record
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file is missing or unreadable.
    pub async fn read_blob(&self, metadata: &FileMetadata) -> StorageResult<Vec<u8>> {
        Ok(fs::read(&metadata.path).await?)
    }

    /// Removes pending records older than `older_than`, together with any
    /// partial file they left behind
    ///
    /// Returns the records that were purged. A record whose file or row
    /// cannot be removed is logged and skipped, so it does not hold back the
    /// records after it; the next sweep retries it.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be queried. Files that are
    /// already gone are not an error. An age too large to represent purges
    /// nothing.
    pub async fn purge_pending(&self, older_than: Duration) -> StorageResult<Vec<FileMetadata>> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let stale = self.collection.find_pending_before(cutoff).await?;
        let mut purged = Vec::with_capacity(stale.len());
        for record in stale {
            if let Err(e) = remove_blob(&record.path).await {
                tracing::warn!(
                    file_id = %record.id,
                    path = %record.path.display(),
                    error = %e,
                    "Failed to remove pending file, skipping"
                );
                continue;
            }
            if let Err(e) = self.collection.remove(record.id).await {
                tracing::warn!(file_id = %record.id, error = %e, "Failed to remove pending record, skipping");
                continue;
            }
            tracing::info!(file_id = %record.id, path = %record.path.display(), "Purged pending upload");
            purged.push(record);
        }

        Ok(purged)
    }

    /// Best-effort rollback of a pending record whose write failed
    async fn discard(&self, metadata: &FileMetadata) {
        if let Err(e) = remove_blob(&metadata.path).await {
            tracing::warn!(file_id = %metadata.id, error = %e, "Failed to remove partial file");
        }
        if let Err(e) = self.collection.remove(metadata.id).await {
            tracing::warn!(file_id = %metadata.id, error = %e, "Failed to remove pending record");
        }
    }
}

/// Creates a date partition without creating missing ancestors
///
/// A partition that already exists (possibly created by a concurrent upload)
/// is fine.
async fn ensure_partition(dir: &Path) -> std::io::Result<()> {
    match fs::create_dir(dir).await {
        Err(e) if e.kind() != ErrorKind::AlreadyExists => Err(e),
        _ => Ok(()),
    }
}

async fn write_blob(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

async fn remove_blob(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::collection::{InMemoryMetadataCollection, MockMetadataCollection};
    use crate::testing::{create_test_store, pending_record, PNG_SIGNATURE};
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upload_and_read_back() {
        let (store, _collection, _temp) = create_test_store();

        let metadata = store.upload_file(b"Hello, World!", "hello.txt").await.unwrap();
        assert_eq!(metadata.filename, "hello.txt");
        assert!(metadata.is_complete());

        let data = store.get_file_buffer(metadata.id).await.unwrap().unwrap();
        assert_eq!(data, b"Hello, World!");
    }

    #[tokio::test]
    async fn test_metadata_lookup_matches_upload() {
        let (store, _collection, _temp) = create_test_store();

        let before = Utc::now().trunc_subsecs(3);
        let uploaded = store.upload_file(b"data", "notes/../odd name.txt").await.unwrap();
        let after = Utc::now();

        let found = store.get_file_metadata(uploaded.id).await.unwrap().unwrap();
        assert_eq!(found, uploaded);
        assert_eq!(found.filename, "notes/../odd name.txt");
        assert!(found.uploaded_at >= before && found.uploaded_at <= after);
    }

    #[tokio::test]
    async fn test_unknown_id_is_absent() {
        let (store, _collection, _temp) = create_test_store();
        let id = FileId::new();

        assert!(store.get_file_metadata(id).await.unwrap().is_none());
        assert!(store.get_file_buffer(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_png_is_sniffed() {
        let (store, _collection, _temp) = create_test_store();
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);

        let metadata = store.upload_file(&png, "picture.dat").await.unwrap();
        assert_eq!(metadata.mime_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_empty_and_unrecognized_have_no_type() {
        let (store, _collection, _temp) = create_test_store();

        let empty = store.upload_file(b"", "empty.png").await.unwrap();
        assert_eq!(empty.mime_type, None);
        assert_eq!(store.get_file_buffer(empty.id).await.unwrap().unwrap(), b"");

        let text = store.upload_file(b"plain words", "words.png").await.unwrap();
        assert_eq!(text.mime_type, None);
    }

    #[tokio::test]
    async fn test_files_land_in_date_partition() {
        let (store, _collection, temp) = create_test_store();

        let metadata = store.upload_file(b"x", "x.bin").await.unwrap();

        let expected_dir = temp.path().join(layout::date_partition(metadata.uploaded_at));
        assert_eq!(metadata.path.parent().unwrap(), expected_dir);
        assert_eq!(
            metadata.path.file_name().unwrap().to_str().unwrap(),
            layout::blob_file_name(metadata.uploaded_at, &metadata.id)
        );
        assert!(metadata.path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_keep_their_own_bytes() {
        let (store, _collection, _temp) = create_test_store();

        let handles: Vec<_> = (0..16u8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    let payload = vec![i; 64];
                    let metadata = store.upload_file(&payload, format!("{i}.bin")).await.unwrap();
                    (metadata, payload)
                })
            })
            .collect();

        let mut paths = std::collections::HashSet::new();
        for handle in handles {
            let (metadata, payload) = handle.await.unwrap();
            assert!(paths.insert(metadata.path.clone()), "duplicate path {}", metadata.path.display());
            let stored = store.get_file_buffer(metadata.id).await.unwrap().unwrap();
            assert_eq!(stored, payload);
        }
    }

    #[tokio::test]
    async fn test_missing_backing_file_is_an_error() {
        let (store, _collection, _temp) = create_test_store();

        let metadata = store.upload_file(b"soon gone", "gone.txt").await.unwrap();
        std::fs::remove_file(&metadata.path).unwrap();

        let result = store.get_file_buffer(metadata.id).await;
        assert!(matches!(result, Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_pending_record_is_invisible() {
        let (store, collection, _temp) = create_test_store();
        let record = pending_record("half.bin", Utc::now());
        collection.insert(record.clone()).await.unwrap();

        assert!(store.get_file_metadata(record.id).await.unwrap().is_none());
        assert!(store.get_file_buffer(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let mut collection = MockMetadataCollection::new();
        collection
            .expect_insert()
            .times(1)
            .returning(|record| Err(StorageError::DuplicateId(record.id)));
        collection.expect_mark_complete().never();

        let store = FileStore::new(temp.path(), Arc::new(collection)).unwrap();
        let result = store.upload_file(b"never stored", "a.txt").await;
        assert!(matches!(result, Err(StorageError::DuplicateId(_))));

        let partition = temp.path().join(layout::date_partition(Utc::now()));
        let leftovers = std::fs::read_dir(&partition).map_or(0, Iterator::count);
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_write_failure_rolls_back_record() {
        let (store, collection, temp) = create_test_store();

        // A regular file where the partition directory should be makes the write fail
        let partition = temp.path().join(layout::date_partition(Utc::now()));
        std::fs::write(&partition, b"in the way").unwrap();

        let result = store.upload_file(b"payload", "a.txt").await;
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_ancestor_fails_upload() {
        let (store, collection, temp) = create_test_store();
        std::fs::remove_dir_all(temp.path()).unwrap();

        let result = store.upload_file(b"payload", "a.txt").await;
        assert!(matches!(result, Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound));
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_mark_complete_failure_surfaces() {
        let temp = TempDir::new().unwrap();
        let mut collection = MockMetadataCollection::new();
        collection.expect_insert().times(1).returning(|_| Ok(()));
        collection.expect_mark_complete().times(1).returning(|_| Ok(false));

        let store = FileStore::new(temp.path(), Arc::new(collection)).unwrap();
        let result = store.upload_file(b"payload", "a.txt").await;
        assert!(matches!(result, Err(StorageError::Corrupt(_))));

        let partition = temp.path().join(layout::date_partition(Utc::now()));
        let leftovers = std::fs::read_dir(&partition).map_or(0, Iterator::count);
        assert_eq!(leftovers, 0, "orphaned file left in {}", partition.display());
    }

    #[tokio::test]
    async fn test_purge_pending_skips_unremovable_record() {
        let (store, collection, _temp) = create_test_store();

        let blocked_at = Utc::now().trunc_subsecs(3) - chrono::Duration::hours(3);
        let mut blocked = pending_record("blocked.bin", blocked_at);
        blocked.path = layout::blob_path(store.root(), blocked_at, &blocked.id);
        std::fs::create_dir_all(&blocked.path).unwrap();
        collection.insert(blocked.clone()).await.unwrap();

        let later_at = Utc::now().trunc_subsecs(3) - chrono::Duration::hours(2);
        let later = pending_record("later.bin", later_at);
        collection.insert(later.clone()).await.unwrap();

        let purged = store.purge_pending(Duration::from_secs(3600)).await.unwrap();
        let purged_ids: Vec<FileId> = purged.iter().map(|r| r.id).collect();
        assert_eq!(purged_ids, vec![later.id]);

        assert!(collection.find_by_id(later.id).await.unwrap().is_none());
        assert!(collection.find_by_id(blocked.id).await.unwrap().is_some());

        let again = store.purge_pending(Duration::from_secs(3600)).await.unwrap();
        assert!(again.is_empty());
        assert!(collection.find_by_id(blocked.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_pending_removes_stale_records_and_files() {
        let (store, collection, _temp) = create_test_store();

        let kept = store.upload_file(b"keep me", "kept.txt").await.unwrap();

        let stale_at = Utc::now().trunc_subsecs(3) - chrono::Duration::hours(2);
        let mut stale = pending_record("stale.bin", stale_at);
        stale.path = layout::blob_path(store.root(), stale_at, &stale.id);
        std::fs::create_dir_all(stale.path.parent().unwrap()).unwrap();
        std::fs::write(&stale.path, b"partial").unwrap();
        collection.insert(stale.clone()).await.unwrap();

        let orphan = pending_record("never-written.bin", stale_at);
        collection.insert(orphan.clone()).await.unwrap();

        let fresh = pending_record("fresh.bin", Utc::now());
        collection.insert(fresh.clone()).await.unwrap();

        let purged = store.purge_pending(Duration::from_secs(3600)).await.unwrap();
        let mut purged_ids: Vec<FileId> = purged.iter().map(|r| r.id).collect();
        purged_ids.sort();
        let mut expected = vec![stale.id, orphan.id];
        expected.sort();
        assert_eq!(purged_ids, expected);

        assert!(!stale.path.exists());
        assert!(collection.find_by_id(stale.id).await.unwrap().is_none());
        assert!(collection.find_by_id(fresh.id).await.unwrap().is_some());
        assert!(store.get_file_buffer(kept.id).await.unwrap().is_some());
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("not-a-directory");
        std::fs::write(&file_path, b"test").unwrap();

        let result = FileStore::new(file_path, Arc::new(InMemoryMetadataCollection::new()));
        assert!(matches!(result.unwrap_err(), StorageError::InvalidPath(_)));
    }

    #[test]
    fn test_root_created_with_ancestors() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("data").join("kb-files");

        let store = FileStore::new(&root, Arc::new(InMemoryMetadataCollection::new())).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_upload_then_read_is_identity(
            data in proptest::collection::vec(any::<u8>(), 0..4096),
            filename in "[A-Za-z0-9 ._()-]{1,48}",
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let (store, _collection, _temp) = create_test_store();

            let (metadata, stored) = runtime.block_on(async {
                let metadata = store.upload_file(&data, filename.clone()).await.unwrap();
                let stored = store.get_file_buffer(metadata.id).await.unwrap();
                (metadata, stored)
            });

            prop_assert_eq!(stored, Some(data));
            prop_assert_eq!(metadata.filename, filename);
        }
    }
}

//! SQLite-backed metadata collection

use super::collection::MetadataCollection;
use super::types::{FileId, FileMetadata, StorageError, StorageResult, UploadStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const CREATE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS file_metadata (
    id TEXT PRIMARY KEY NOT NULL,
    mime_type TEXT,
    filename TEXT NOT NULL,
    path TEXT NOT NULL UNIQUE,
    uploaded_at_ms INTEGER NOT NULL,
    status TEXT NOT NULL
)";

const CREATE_PENDING_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS file_metadata_status_uploaded
    ON file_metadata (status, uploaded_at_ms)";

const SELECT_COLUMNS: &str = "SELECT id, mime_type, filename, path, uploaded_at_ms, status FROM file_metadata";

/// Metadata collection stored in a single SQLite table
///
/// Timestamps are kept as millisecond epochs so range scans for the pending
/// sweep compare integers.
///
/// # Examples
///
/// ```rust,no_run
/// use kb_files::storage::SqliteMetadataCollection;
///
/// # async fn example() -> anyhow::Result<()> {
/// let collection = SqliteMetadataCollection::connect("sqlite://data/kb-files.db", 8).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteMetadataCollection {
    pool: SqlitePool,
}

impl SqliteMetadataCollection {
    /// Connects to `url`, creating the database file if needed, and ensures
    /// the schema exists
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed, the database cannot be
    /// opened, or the schema cannot be created.
    pub async fn connect(url: &str, max_connections: u32) -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// Wraps an existing pool and ensures the schema exists
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn with_pool(pool: SqlitePool) -> StorageResult<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_PENDING_INDEX).execute(&pool).await?;
        tracing::debug!("file_metadata schema ready");
        Ok(Self { pool })
    }

    /// Underlying connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_row(row: &SqliteRow) -> StorageResult<FileMetadata> {
    let id: String = row.try_get("id")?;
    let id = id
        .parse::<FileId>()
        .map_err(|e| StorageError::Corrupt(format!("bad id `{id}`: {e}")))?;

    let uploaded_at_ms: i64 = row.try_get("uploaded_at_ms")?;
    let uploaded_at = DateTime::<Utc>::from_timestamp_millis(uploaded_at_ms).ok_or_else(|| {
        StorageError::Corrupt(format!("timestamp {uploaded_at_ms} out of range for {id}"))
    })?;

    let status: String = row.try_get("status")?;
    let path: String = row.try_get("path")?;

    Ok(FileMetadata {
        id,
        mime_type: row.try_get("mime_type")?,
        filename: row.try_get("filename")?,
        path: PathBuf::from(path),
        uploaded_at,
        status: status.parse()?,
    })
}

/// Unique column an insert collided on
enum UniqueColumn {
    Id,
    Path,
}

fn unique_violation(err: &sqlx::Error) -> Option<UniqueColumn> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            if db.message().contains("file_metadata.path") {
                Some(UniqueColumn::Path)
            } else {
                Some(UniqueColumn::Id)
            }
        }
        _ => None,
    }
}

#[async_trait]
impl MetadataCollection for SqliteMetadataCollection {
    async fn insert(&self, record: FileMetadata) -> StorageResult<()> {
        let result = sqlx::query(
            "INSERT INTO file_metadata (id, mime_type, filename, path, uploaded_at_ms, status) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.mime_type.as_deref())
        .bind(&record.filename)
        .bind(record.path.to_string_lossy().into_owned())
        .bind(record.uploaded_at.timestamp_millis())
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match unique_violation(&e) {
                Some(UniqueColumn::Path) => Err(StorageError::Corrupt(format!(
                    "path {} is already recorded for another file",
                    record.path.display()
                ))),
                Some(UniqueColumn::Id) => Err(StorageError::DuplicateId(record.id)),
                None => Err(e.into()),
            },
        }
    }

    async fn find_by_id(&self, id: FileId) -> StorageResult<Option<FileMetadata>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn mark_complete(&self, id: FileId) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE file_metadata SET status = ? WHERE id = ?")
            .bind(UploadStatus::Complete.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, id: FileId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM file_metadata WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_pending_before(&self, cutoff: DateTime<Utc>) -> StorageResult<Vec<FileMetadata>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE status = ? AND uploaded_at_ms < ? ORDER BY uploaded_at_ms"
        ))
        .bind(UploadStatus::Pending.as_str())
        .bind(cutoff.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(decode_row).collect()
    }
}

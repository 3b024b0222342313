//! Date-partitioned on-disk layout
//!
//! Files land in one directory per UTC calendar day. The filename combines
//! the upload instant with the record id so two uploads in the same
//! millisecond never share a path.
//!
//! ```text
//! data/kb-files/
//! ├── 2024-05-01/
//! │   ├── 018f3a1b2c3d-550e8400e29b41d4a716446655440000.bin
//! │   └── 018f3a1b2c3d-a3bb189e8bf94a9ab5c79f9c3b8e5d7a.bin
//! └── 2024-05-02/
//!     └── 018f3f4e0a11-7c9e6679742540de944be07fc1f90ae7.bin
//! ```

use super::types::FileId;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Default root directory for stored files
pub const DEFAULT_DATA_DIR: &str = "data/kb-files";

/// Extension given to every stored blob
pub const BLOB_EXTENSION: &str = "bin";

/// Directory name for the calendar date of `at` (`YYYY-MM-DD`)
#[must_use]
pub fn date_partition(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// Storage filename for an upload at `at` with identifier `id`
///
/// The millisecond epoch is rendered as 12 zero-padded lowercase hex digits,
/// which keeps filenames sortable by upload time within a partition.
#[must_use]
pub fn blob_file_name(at: DateTime<Utc>, id: &FileId) -> String {
    let millis = u64::try_from(at.timestamp_millis()).unwrap_or(0);
    format!("{millis:012x}-{}.{BLOB_EXTENSION}", id.simple())
}

/// Full path of the blob for `id` uploaded at `at` under `root`
#[must_use]
pub fn blob_path(root: &Path, at: DateTime<Utc>, id: &FileId) -> PathBuf {
    root.join(date_partition(at)).join(blob_file_name(at, id))
}

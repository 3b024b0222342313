//! File storage: on-disk layout, MIME sniffing, metadata collections and
//! the [`FileStore`] service that ties them together

pub mod collection;
pub mod layout;
pub mod service;
pub mod sniff;
pub mod sqlite;
pub mod types;

pub use collection::{InMemoryMetadataCollection, MetadataCollection};
pub use service::FileStore;
pub use sqlite::SqliteMetadataCollection;
pub use types::{
    FileId, FileMetadata, FileMetadataView, StorageError, StorageResult, UploadStatus,
};

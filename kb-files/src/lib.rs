//! kb-files: file ingestion and lookup for the knowledge base
//!
//! Accepts uploaded binary files over HTTP, writes them under a
//! date-partitioned directory tree, records their metadata (id, original
//! filename, sniffed MIME type, storage path, upload time) in a metadata
//! collection, and serves them back by id.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kb_files::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = KbFilesConfig::load_for_service("kb-files")?;
//!     std::fs::create_dir_all(&config.storage.data_dir)?;
//!
//!     let metadata = SqliteMetadataCollection::connect(
//!         &config.database.url,
//!         config.database.max_connections,
//!     )
//!     .await?;
//!
//!     let files = module::init(ModuleContext {
//!         metadata: Arc::new(metadata),
//!         data_dir: config.storage.data_dir.clone(),
//!         max_upload_bytes: config.storage.max_upload_bytes,
//!     })?;
//!
//!     let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
//!     axum::serve(listener, files.router).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Storage protocol
//!
//! Every upload is recorded as `Pending` before any bytes hit the disk, then
//! flipped to `Complete` once the file is synced. Lookups only ever see
//! completed uploads, and [`storage::FileStore::purge_pending`] reclaims
//! uploads that never finished.

// Lint configuration is handled at the workspace level in Cargo.toml
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod module;
pub mod observability;
pub mod storage;

#[cfg(test)]
pub mod testing;

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use kb_files::prelude::*;
    //! ```

    pub use crate::config::KbFilesConfig;
    pub use crate::error::ApiError;
    pub use crate::extractors::{FileField, UploadedFile};
    pub use crate::module::{self, FileModule, ModuleContext};
    pub use crate::storage::{
        FileId, FileMetadata, FileMetadataView, FileStore, InMemoryMetadataCollection,
        MetadataCollection, SqliteMetadataCollection, StorageError, StorageResult, UploadStatus,
    };

    pub use axum;
}

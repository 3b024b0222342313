//! Mounting the file service into a host application
//!
//! The host hands over a metadata collection and a data directory and gets
//! back a router plus the store it is bound to. The store is the typed
//! surface other modules call into (`upload_file`, `get_file_buffer`).
//!
//! ```rust,no_run
//! use kb_files::module::{self, ModuleContext, DEFAULT_MAX_UPLOAD_BYTES};
//! use kb_files::storage::InMemoryMetadataCollection;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let files = module::init(ModuleContext {
//!     metadata: Arc::new(InMemoryMetadataCollection::new()),
//!     data_dir: "data/kb-files".into(),
//!     max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
//! })?;
//!
//! let app = axum::Router::new().merge(files.router);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::storage::{FileStore, MetadataCollection, StorageResult};

/// Largest request body accepted by `POST /v1/file` unless configured (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Dependencies supplied by the host
pub struct ModuleContext {
    /// Where metadata records live
    pub metadata: Arc<dyn MetadataCollection>,
    /// Root of the date-partitioned blob tree, created if absent
    pub data_dir: PathBuf,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

/// What the module exposes back to the host
pub struct FileModule {
    /// Routes under `/v1`, state already attached
    pub router: Router,
    /// Shared store behind the routes
    pub store: Arc<FileStore>,
}

impl std::fmt::Debug for FileModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileModule")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Creates the data directory and builds the router
///
/// # Errors
///
/// Returns an error if the data directory cannot be created or is not a
/// directory.
pub fn init(ctx: ModuleContext) -> StorageResult<FileModule> {
    let store = Arc::new(FileStore::new(ctx.data_dir, ctx.metadata)?);
    let router = routes(Arc::clone(&store), ctx.max_upload_bytes);

    tracing::debug!(
        max_upload_bytes = ctx.max_upload_bytes,
        "File routes mounted under /v1"
    );

    Ok(FileModule { router, store })
}

fn routes(store: Arc<FileStore>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/v1/file",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/v1/file/{id}", get(handlers::get_file_metadata))
        .route("/v1/file-data/{id}", get(handlers::get_file_data))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

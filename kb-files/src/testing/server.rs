//! Test server utilities using axum-test
//!
//! Mounts the module router over a temporary data directory so handler tests
//! exercise the same wiring the host gets from [`crate::module::init`].

use crate::module::{self, FileModule, ModuleContext};
use crate::storage::{FileStore, InMemoryMetadataCollection};
use std::sync::Arc;
use tempfile::TempDir;

/// Test server wrapper for handler tests
///
/// Owns the temporary data directory, so files stay readable for the
/// lifetime of the server.
pub struct TestServer {
    inner: axum_test::TestServer,
    store: Arc<FileStore>,
    collection: Arc<InMemoryMetadataCollection>,
    _data_dir: TempDir,
}

impl TestServer {
    /// Serves the module with the given upload limit
    pub fn with_limit(max_upload_bytes: usize) -> Self {
        let data_dir = TempDir::new().unwrap();
        let collection = Arc::new(InMemoryMetadataCollection::new());
        let FileModule { router, store } = module::init(ModuleContext {
            metadata: collection.clone(),
            data_dir: data_dir.path().join("kb-files"),
            max_upload_bytes,
        })
        .unwrap();

        Self {
            inner: axum_test::TestServer::new(router).unwrap(),
            store,
            collection,
            _data_dir: data_dir,
        }
    }

    /// Serves the module with the default upload limit
    pub fn new() -> Self {
        Self::with_limit(module::DEFAULT_MAX_UPLOAD_BYTES)
    }

    /// Make a GET request to the server
    pub fn get(&self, path: &str) -> axum_test::TestRequest {
        self.inner.get(path)
    }

    /// Make a POST request to the server
    pub fn post(&self, path: &str) -> axum_test::TestRequest {
        self.inner.post(path)
    }

    /// Store behind the router
    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Collection behind the store
    pub fn collection(&self) -> &InMemoryMetadataCollection {
        &self.collection
    }
}

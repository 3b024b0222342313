//! Testing utilities for kb-files
//!
//! - [`TestServer`]: wrapper around `axum-test` serving the module router
//! - fixtures for stores, records and multipart bodies
//! - assertion helpers for the plain-text error responses
//! - mockall-generated mocks live next to their traits (`MockMetadataCollection`)

pub mod assertions;
pub mod fixtures;
pub mod multipart;
pub mod server;

pub use assertions::*;
pub use fixtures::{create_test_store, pending_record, PNG_SIGNATURE};
pub use multipart::{multipart_body, multipart_request, Part, BOUNDARY};
pub use server::TestServer;

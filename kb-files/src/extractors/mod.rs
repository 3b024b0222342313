//! Axum extractors for kb-files
//!
//! Provides the single-file multipart extractor used by the upload route.

mod file_upload;

pub use file_upload::{FileField, UploadedFile, FILE_FIELD};

//! MIME sniffing from magic numbers
//!
//! The client-supplied Content-Type is never consulted. The type recorded for
//! an upload comes only from the file signature found in its leading bytes.

/// Detects the MIME type of `data` from its signature
///
/// Returns `None` for empty buffers and for content without a recognizable
/// signature (plain text, arbitrary binary).
///
/// # Examples
///
/// ```rust
/// use kb_files::storage::sniff::detect_mime;
///
/// let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(detect_mime(&png), Some("image/png"));
/// assert_eq!(detect_mime(b""), None);
/// ```
#[must_use]
pub fn detect_mime(data: &[u8]) -> Option<&'static str> {
    infer::get(data).map(|kind| kind.mime_type())
}

//! Assertion helpers for kb-files responses

use axum::http::StatusCode;
use axum_test::TestResponse;

/// Assert a plain-text error response with the exact status and body
///
/// # Panics
///
/// Panics if the status or body differ
pub fn assert_plain_error(response: &TestResponse, status: StatusCode, body: &str) {
    assert_eq!(
        response.status_code(),
        status,
        "Expected status {status}, got {} with body {:?}",
        response.status_code(),
        response.text()
    );
    assert_eq!(response.text(), body);
}

/// Assert that the response carries the expected Content-Type header
///
/// # Panics
///
/// Panics if the header is missing or has a different value
pub fn assert_content_type(response: &TestResponse, expected: &str) {
    let header = response
        .headers()
        .get("content-type")
        .expect("Content-Type header not found");
    let actual = header.to_str().expect("Invalid Content-Type header value");
    assert_eq!(actual, expected, "Expected Content-Type {expected}, got {actual}");
}

//! Global subscriber installation
//!
//! Kept in its own test binary so the installed subscriber does not leak
//! into other tests.

use kb_files::observability::{self, ObservabilityConfig};

#[test]
fn init_installs_once() {
    let config = ObservabilityConfig::new("kb-files-test");

    assert!(observability::init(&config).is_ok());
    assert!(observability::init(&config).is_err());
}

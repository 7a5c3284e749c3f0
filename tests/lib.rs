//! Shared infrastructure for the Weft integration test suites.

pub mod fixtures;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing for test output, once per process.
///
/// Honors `RUST_LOG`; defaults to warnings only so test output stays
/// readable.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

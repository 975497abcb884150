//! Test support: scripted collaborators and tracing setup.
//!
//! These doubles are exercised by the crate's own tests and are public so
//! adapter authors can drive the engine in theirs.

mod mocks;

pub use mocks::{PanickyObserver, ScriptedInvoker};

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes a test tracing subscriber once per process.
///
/// Respects `RUST_LOG`; repeated calls are no-ops.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

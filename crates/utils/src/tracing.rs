//! Tracing subscriber setup for contaflux binaries and tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize a fmt subscriber honoring `RUST_LOG`, defaulting to the
/// given filter when the variable is unset. Safe to call more than once;
/// later calls are no-ops.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

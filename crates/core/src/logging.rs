//! Tracing setup for embedders and integration tests
//!
//! The core only emits `tracing` events; installing a subscriber is the
//! embedder's call. This helper covers the common case.

use tracing_subscriber::EnvFilter;

/// Install a stderr fmt subscriber honoring `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .compact()
        .try_init();
}

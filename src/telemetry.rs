//! Tracing initialization for embedding hosts (CLI, tool server, tests).
//!
//! The engine itself only emits events; installing a subscriber is the
//! host's choice, so this helper is idempotent and never panics when a
//! subscriber is already set.

use tracing_subscriber::EnvFilter;

/// Install a compact fmt subscriber filtered by `RUST_LOG` (default `info`).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init();
}

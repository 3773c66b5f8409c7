//! Shared `tracing` setup for the workspace binaries.
//!
//! Logs go to stderr so that JSON written to stdout stays machine readable.
//! `RUST_LOG` overrides the default filter passed by each binary.

use tracing_subscriber::EnvFilter;

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Installs the global subscriber, failing if one is already set.
pub fn try_init(default_filter: &str) -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
}

/// Like [`try_init`], but a second call is a no-op.
pub fn init(default_filter: &str) {
    if try_init(default_filter).is_ok() {
        tracing::debug!(default_filter, "Logger initialised");
    }
}

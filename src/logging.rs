//! Structured logging for the provider plugin.
//!
//! All logs go to **stderr**; stdout belongs to the Host's handshake
//! protocol. Filtering follows the `RUST_LOG` environment variable, for
//! example `RUST_LOG=oasis_provider=debug`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the default logging subscriber.
///
/// Writes to stderr, respects `RUST_LOG`, and defaults to `info` when the
/// variable is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Like [`init_logging`], but with a custom default level when `RUST_LOG`
/// is unset.
pub fn init_logging_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Try to initialize logging, returning `false` if a subscriber was already
/// set. Useful in tests, where the process may initialize more than once.
pub fn try_init_logging() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}

//! Logging setup for the provider process.
//!
//! Logs go to **stderr**; stdout belongs to the host that spawned the
//! provider. Filtering follows `RUST_LOG`, e.g.
//!
//! ```bash
//! # Show every request the API client sends
//! RUST_LOG=clerk_provider::client=debug ./provider
//!
//! # Lifecycle events only
//! RUST_LOG=clerk_provider=info ./provider
//! ```
//!
//! Lifecycle callbacks open spans named `organization.create`,
//! `organization.read` and so on; the API client opens one span per request.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directive used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(default_level: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry().with(filter(default_level)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Initialize the default logging subscriber.
///
/// Respects `RUST_LOG` and defaults to `info`.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default(DEFAULT_DIRECTIVE);
}

/// Like [`init_logging`], with a custom default used when `RUST_LOG` is unset.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Try to initialize logging, returning false if already initialized.
///
/// Unlike [`init_logging`], this does not panic when a subscriber is already
/// installed, which makes it safe to call from every test.
pub fn try_init_logging() -> bool {
    subscriber(DEFAULT_DIRECTIVE).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_parsing() {
        assert!(EnvFilter::try_new(DEFAULT_DIRECTIVE).is_ok());
        assert!(EnvFilter::try_new("clerk_provider=debug").is_ok());
        assert!(EnvFilter::try_new("warn,clerk_provider::client=debug").is_ok());
    }

    #[test]
    fn test_try_init_logging_is_idempotent() {
        // The global subscriber can only be set once per process.
        let _ = try_init_logging();
        assert!(!try_init_logging());
        tracing::info!(target: "clerk_provider", "logging initialized");
    }
}

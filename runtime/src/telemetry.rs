//! Tracing subscriber initialisation.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// `default_filter` applies when `RUST_LOG` is unset or invalid, e.g.
/// `"info,whippet_installer=debug"`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

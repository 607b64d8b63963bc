//! Tracing subscriber initialisation.
//!
//! Both binaries call [`init_subscriber`] once at startup. `RUST_LOG` takes
//! precedence over the configured level so operators can raise verbosity
//! without editing settings.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Where log lines are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// Standard output.
    Stdout,
    /// Standard error. Required for processes that speak a protocol on stdout.
    Stderr,
}

/// Build the env filter: `RUST_LOG` if set and valid, else `level`.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global tracing subscriber.
///
/// Returns an error if a subscriber is already installed.
pub fn init_subscriber(level: &str, json: bool, target: LogTarget) -> Result<(), TryInitError> {
    let filter = env_filter(level);
    let registry = tracing_subscriber::registry().with(filter);
    match (json, target) {
        (true, LogTarget::Stdout) => registry.with(fmt::layer().json()).try_init(),
        (true, LogTarget::Stderr) => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        (false, LogTarget::Stdout) => registry.with(fmt::layer()).try_init(),
        (false, LogTarget::Stderr) => registry
            .with(fmt::layer().with_ansi(false).with_writer(std::io::stderr))
            .try_init(),
    }
}

//! Tracing subscriber setup for both binaries.
//!
//! Filter directives come from `TANK_DASHBOARD_LOG`, then `RUST_LOG`, then the
//! per-binary default. The terminal dashboard owns the screen, so it always
//! logs to a file; the console logs to stderr unless `--log` is given.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::options::HostError;

/// Project-specific filter variable.
pub const LOG_ENV: &str = "TANK_DASHBOARD_LOG";

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`HostError::Io`] when the log file cannot be opened and
/// [`HostError::Logging`] when a subscriber is already installed.
pub fn init(log_file: Option<&Path>, default_directive: &str) -> Result<(), HostError> {
    let filter = build_env_filter(default_directive);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true),
                )
                .try_init()?;
        }
        None => {
            let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(use_ansi)
                        .without_time()
                        .compact(),
                )
                .try_init()?;
        }
    }
    Ok(())
}

fn build_env_filter(default_directive: &str) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::try_new(default_directive).unwrap_or_else(|_| EnvFilter::new("warn"))
}

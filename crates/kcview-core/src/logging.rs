//! Tracing subscriber setup.
//!
//! The interactive view owns the terminal, so it logs to a daily-rolling file
//! under `${KCVIEW_HOME}/logs`. Headless commands log to stderr.
//! The filter is read from `KCVIEW_LOG` (default `info`).

use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::paths;

const LOG_ENV: &str = "KCVIEW_LOG";
const LOG_FILE_PREFIX: &str = "kcview.log";
const DEFAULT_FILTER: &str = "info";

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

/// Keeps the non-blocking file writer alive; drop it last to flush.
#[must_use = "dropping the guard stops the background log writer"]
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    filter_from(std::env::var(LOG_ENV).ok().as_deref())
}

/// Blank or unparsable directives fall back to `info`.
fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// # Errors
/// Returns an error if the log directory cannot be created or a subscriber is
/// already installed.
pub fn init(target: LogTarget) -> Result<LogGuard> {
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;
            Ok(LogGuard { _worker: None })
        }
        LogTarget::File => {
            let dir = paths::logs_dir();
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, worker) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))?;
            Ok(LogGuard {
                _worker: Some(worker),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults_to_info() {
        assert_eq!(filter_from(None).to_string(), "info");
        assert_eq!(filter_from(Some("   ")).to_string(), "info");
    }

    #[test]
    fn test_filter_keeps_valid_directives() {
        assert_eq!(filter_from(Some("kcview_core=debug")).to_string(), "kcview_core=debug");
        assert_eq!(filter_from(Some(" warn ")).to_string(), "warn");
    }

    #[test]
    fn test_invalid_filter_falls_back_to_info() {
        assert_eq!(filter_from(Some("kcview_core=notalevel")).to_string(), "info");
    }
}

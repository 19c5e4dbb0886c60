//! Diagnostic logging.
//!
//! Stdout and stderr both belong to the animation, so logs only ever go to a
//! file, and only when one is requested on the command line.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `debug` or `roflcopter=trace`.
pub const LOG_FILTER_ENV: &str = "ROFLCOPTER_LOG";

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber when `path` is set.
///
/// The returned guard must be held until exit so buffered lines get written.
pub fn init(path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (subscriber, guard) = file_subscriber(path, filter)?;
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;
    Ok(Some(guard))
}

fn file_subscriber(
    path: &Path,
    filter: EnvFilter,
) -> Result<(impl Subscriber + Send + Sync + use<>, WorkerGuard)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();
    Ok((subscriber, guard))
}

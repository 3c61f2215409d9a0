//! File logging for installer runs.
//!
//! Console output belongs to prompts and progress bars, so diagnostics go to
//! `<root>/logs/weightfetch.log`. The filter comes from `RUST_LOG` and
//! defaults to `info`.

use std::fs;
use std::path::{Path, PathBuf};

pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{FetchError, FetchResult};

/// Log file name inside the log directory.
pub const LOG_FILE_NAME: &str = "weightfetch.log";

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber writing to `log_dir`.
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes buffered lines.
pub fn init(log_dir: &Path) -> FetchResult<WorkerGuard> {
    fs::create_dir_all(log_dir).map_err(|e| FetchError::CreateDirFailed {
        path: log_dir.to_path_buf(),
        source: e,
    })?;

    let appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_timer(LocalTime::rfc_3339()),
        )
        .try_init()
        .map_err(|e| FetchError::Logging(e.to_string()))?;

    Ok(guard)
}

/// Path of the log file for a log directory.
pub fn log_file(log_dir: &Path) -> PathBuf {
    log_dir.join(LOG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_log_file() {
        let temp = TempDir::new().unwrap();
        let log_dir = temp.path().join("logs");

        let guard = init(&log_dir).unwrap();
        tracing::info!(asset = "stable-diffusion-1.5", "logging smoke test");
        drop(guard);

        let contents = fs::read_to_string(log_file(&log_dir)).unwrap();
        assert!(contents.contains("logging smoke test"));

        // A second subscriber cannot be installed
        assert!(matches!(init(&log_dir), Err(FetchError::Logging(_))));
    }
}

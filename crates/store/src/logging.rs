//! Tracing setup for applications embedding the store.
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::api::Result;

const LOG_FILE: &str = "book-store.log";

/// Where log lines go besides stderr.
#[derive(Clone, Debug, Default)]
pub enum LogFile {
    /// Stderr only.
    #[default]
    Disabled,
    /// Also write to the platform cache directory.
    DefaultDir,
    /// Also write under the given directory.
    Dir(PathBuf),
}

/// Installs a global subscriber logging to stderr and optionally to a file.
///
/// The filter defaults to `info` and honours `RUST_LOG`. The returned guard
/// flushes the file writer on drop and must be kept alive by the caller. A
/// second call leaves the first subscriber in place.
pub fn setup_logging(file: LogFile) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_dir = match file {
        LogFile::Disabled => None,
        LogFile::DefaultDir => Some(default_log_dir()),
        LogFile::Dir(dir) => Some(dir),
    };

    let (file_layer, guard) = match &log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed");
        return Ok(guard);
    }

    if let Some(dir) = &log_dir {
        tracing::info!("Log file: {}", dir.join(LOG_FILE).display());
    }
    Ok(guard)
}

/// Platform-specific log directory.
pub fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "book-store")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| Path::new("/tmp/book-store/logs").to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_creates_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let guard = setup_logging(LogFile::Dir(logs.clone())).unwrap();
        assert!(guard.is_some());
        assert!(logs.is_dir());
    }
}

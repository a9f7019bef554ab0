use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes logging with a JSON file layer and a console layer on stderr.
///
/// The returned guard must be held for the life of the process so buffered
/// log lines are flushed on exit.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("sales_analytics=info"));

    // Daily rotation, non-blocking writes. Without a log directory only the
    // console layer is installed.
    let (file_layer, guard, dir_error) = match fs::create_dir_all(&config.dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(&config.dir, &config.file_prefix);
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().json().with_writer(non_blocking_writer);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    // Console goes to stderr so report output on stdout stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(e) = dir_error {
        tracing::warn!("Could not create log directory {}: {}", config.dir, e);
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in this crate that installs the global subscriber
    #[test]
    fn test_init_logging_creates_log_dir_and_returns_guard() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LoggingConfig {
            dir: log_dir.to_string_lossy().into_owned(),
            ..LoggingConfig::default()
        };
        let guard = init_logging(&config);
        tracing::info!("logging initialised");
        assert!(guard.is_some());
        assert!(log_dir.is_dir());
    }
}

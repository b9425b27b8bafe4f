use std::fs::File;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Cannot create log file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("A global logger is already installed: {0}")]
    AlreadyInitialized(String),
}

/// Subscriber settings for applications embedding the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// 0 = warnings, 1 = info, 2 = debug, 3+ = trace.
    pub verbosity: u8,
    pub quiet: bool,
    pub log_file: Option<PathBuf>,
}

impl LogConfig {
    pub fn level_filter(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::OFF;
        }
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Installs the global subscriber: compact stderr output plus, optionally, a
/// plain-text file that also records thread ids.
pub fn setup_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(config.level_filter())
        .with(stderr_layer);

    let installed = if let Some(path) = &config.log_file {
        let file = File::create(path).map_err(|e| LoggingError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true);

        subscriber.with(file_layer).try_init()
    } else {
        subscriber.try_init()
    };

    installed.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, error, info, trace, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            let _ = setup_logging(&LogConfig {
                verbosity: 3,
                ..Default::default()
            });
        });
    }

    #[test]
    fn verbosity_maps_to_level_filters() {
        let at = |verbosity| LogConfig {
            verbosity,
            ..Default::default()
        };
        assert_eq!(at(0).level_filter(), LevelFilter::WARN);
        assert_eq!(at(1).level_filter(), LevelFilter::INFO);
        assert_eq!(at(2).level_filter(), LevelFilter::DEBUG);
        assert_eq!(at(9).level_filter(), LevelFilter::TRACE);
        let quiet = LogConfig {
            verbosity: 3,
            quiet: true,
            log_file: None,
        };
        assert_eq!(quiet.level_filter(), LevelFilter::OFF);
    }

    #[test]
    #[serial]
    fn initialization_and_macros_work() {
        ensure_global_logger_is_set();

        error!("This is an error");
        warn!("This is a warning");
        info!(reaction = "R1", "This is info");
        debug!("This is debug");
        trace!("This is trace");
    }

    #[test]
    #[serial]
    fn second_initialization_is_reported_not_panicking() {
        ensure_global_logger_is_set();
        let result = setup_logging(&LogConfig::default());
        assert!(matches!(result, Err(LoggingError::AlreadyInitialized(_))));
    }

    #[test]
    #[serial]
    fn file_layer_records_thread_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("run.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!("Message for file-only test.");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Message for file-only test."));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("ThreadId"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_an_io_error() {
        let invalid_path = PathBuf::from("/");
        if cfg!(unix) && invalid_path.is_dir() {
            let result = setup_logging(&LogConfig {
                log_file: Some(invalid_path),
                ..Default::default()
            });
            assert!(matches!(result, Err(LoggingError::Io { .. })));
        }
    }
}

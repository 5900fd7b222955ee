//! Subscriber setup for console and rolling file output
//!
//! Console output goes to stderr so commands like `compile --json` keep a
//! clean stdout. When `[logging] local_enabled` is set, JSON lines are also
//! written to `<local_path>/studyhub.log`, rotated per `local_rotation`.
//!
//! # Example
//!
//! ```no_run
//! use studyhub::logging::init_logging;
//! use studyhub::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//! ```

use crate::config::LoggingConfig;
use crate::domain::{Result, StudyhubError};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Base name of the log file inside `local_path`
pub const LOG_FILE_NAME: &str = "studyhub.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the file writer alive, dropping it flushes pending lines
pub struct LoggingGuard {
    file_guard: Option<WorkerGuard>,
}

impl LoggingGuard {
    pub fn has_file_writer(&self) -> bool {
        self.file_guard.is_some()
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `log_level` when it is set. Without it,
/// only events from this crate are shown, at `log_level` and above.
///
/// # Errors
///
/// Returns a configuration error for an unknown level, an uncreatable log
/// directory, or when a global subscriber is already installed.
pub fn init_logging(log_level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = parse_log_level(log_level)?;

    let mut layers: Vec<BoxedLayer> = vec![console_layer(level)];
    let file_guard = match file_layer(level, config)? {
        Some((layer, guard)) => {
            layers.push(layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| StudyhubError::Configuration(format!("Failed to initialize logging: {e}")))?;

    tracing::info!(
        level = %level,
        local_enabled = config.local_enabled,
        local_path = %config.local_path,
        "Logging initialized"
    );

    Ok(LoggingGuard { file_guard })
}

fn crate_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("studyhub={level}")))
}

fn console_layer(level: Level) -> BoxedLayer {
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(crate_filter(level))
        .boxed()
}

fn file_layer(level: Level, config: &LoggingConfig) -> Result<Option<(BoxedLayer, WorkerGuard)>> {
    if !config.local_enabled {
        return Ok(None);
    }

    std::fs::create_dir_all(&config.local_path).map_err(|e| {
        StudyhubError::Configuration(format!(
            "Failed to create log directory {}: {e}",
            config.local_path
        ))
    })?;

    let appender = RollingFileAppender::new(
        parse_rotation(&config.local_rotation),
        &config.local_path,
        LOG_FILE_NAME,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_thread_names(true)
        .with_writer(writer)
        .with_filter(crate_filter(level))
        .boxed();

    Ok(Some((layer, guard)))
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(StudyhubError::Configuration(format!(
            "Invalid log level: {level}. Must be one of: trace, debug, info, warn, error"
        ))),
    }
}

// Unknown values fall back to daily, the config validator rejects them first
fn parse_rotation(rotation: &str) -> Rotation {
    match rotation {
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

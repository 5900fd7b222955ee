//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - JSON-formatted log files with rotation
//! - Configurable log levels
//! - Helper macros for recurring events
//!
//! # Example
//!
//! ```no_run
//! use studyhub::logging::init_logging;
//! use studyhub::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the completion of a staging directory scan
///
/// # Example
///
/// ```no_run
/// use studyhub::log_scan_complete;
/// use std::time::Duration;
///
/// log_scan_complete!(7, 3, 1, 0, Duration::from_millis(12));
/// ```
#[macro_export]
macro_rules! log_scan_complete {
    ($scan:expr, $processed:expr, $kept:expr, $removed_dirs:expr, $duration:expr) => {
        tracing::debug!(
            scan = $scan,
            processed = $processed,
            kept = $kept,
            removed_dirs = $removed_dirs,
            duration_ms = $duration.as_millis(),
            "Scan completed"
        );
    };
}

/// Log the outcome of compiling a batch file
///
/// # Example
///
/// ```no_run
/// use studyhub::log_batch_compiled;
///
/// log_batch_compiled!(120, 45);
/// ```
#[macro_export]
macro_rules! log_batch_compiled {
    ($rows:expr, $tasks:expr) => {
        tracing::info!(rows = $rows, tasks = $tasks, "Batch compiled");
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use studyhub::log_error_with_context;
/// use studyhub::domain::StudyhubError;
///
/// let error = StudyhubError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

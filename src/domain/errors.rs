//! Domain error types
//!
//! This module defines the error hierarchy for Studyhub.
//! All errors are domain-specific and don't expose third-party types.

use super::report::ValidationReport;
use thiserror::Error;

/// Main Studyhub error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum StudyhubError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Batch file has more tasks than allowed
    #[error("Too many batch tasks: {actual} (maximum is {max})")]
    BatchSize {
        /// Number of tasks the batch file compiled to
        actual: usize,
        /// Configured maximum
        max: usize,
    },

    /// Batch file content is invalid, carries the aggregated report
    #[error("Invalid batch data:\n{0}")]
    BatchFormat(ValidationReport),

    /// Directory drain monitor errors
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// Topic file relay errors
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Result of every fallible library operation
pub type Result<T> = std::result::Result<T, StudyhubError>;

/// Directory drain monitor errors
///
/// Resource errors of a watch session. None of them is retried by the monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Root path is missing or not a directory
    #[error("Invalid directory to monitor: {0}")]
    InvalidRoot(String),

    /// File system notifications could not be set up
    #[error("Failed to watch directory: {0}")]
    Watch(String),

    /// The file handler failed, which terminates the scan worker
    #[error("File handler failed for {path}: {message}")]
    Handler { path: String, message: String },
}

/// Topic file relay errors
///
/// Errors that occur on relay connections. These errors don't expose
/// the transport's own error types.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Failed to connect or bind
    #[error("Failed to connect to relay at {addr}: {message}")]
    ConnectionFailed { addr: String, message: String },

    /// Peer closed the stream in the middle of a frame
    #[error("Peer disconnected: {0}")]
    Disconnected(String),

    /// Topic line is not valid UTF-8 or contains a line break
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// File does not fit into the 4-byte length prefix
    #[error("File too large for relay framing: {size} bytes")]
    FileTooLarge { size: u64 },

    /// Folder for received files is missing or not a directory
    #[error("Invalid directory to store received files: {0}")]
    InvalidFolder(String),
}

impl RelayError {
    /// Whether the error ended a session because the peer went away
    pub fn is_disconnect(&self) -> bool {
        matches!(self, RelayError::Disconnected(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for StudyhubError {
    fn from(err: std::io::Error) -> Self {
        StudyhubError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for StudyhubError {
    fn from(err: serde_json::Error) -> Self {
        StudyhubError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for StudyhubError {
    fn from(err: toml::de::Error) -> Self {
        StudyhubError::Configuration(format!("TOML parse error: {err}"))
    }
}

// Conversion from file watcher errors
impl From<notify::Error> for StudyhubError {
    fn from(err: notify::Error) -> Self {
        StudyhubError::Monitor(MonitorError::Watch(err.to_string()))
    }
}

//! Configuration schema types
//!
//! This module defines the configuration structure for Studyhub. Every section
//! has defaults, so a partial file (or an empty one) is a valid configuration.

use crate::core::schedule::ScheduleWindow;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Main Studyhub configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyhubConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Batch request compilation settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Transfer schedule window
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Staging directory drain monitor
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Topic file relay
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StudyhubConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.batch.validate()?;
        self.schedule.validate()?;
        self.monitor.validate()?;
        self.relay.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Batch request compilation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of tasks a single batch file may compile to
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    /// Field delimiter of batch files
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Accepted date formats (chrono strftime syntax), tried in order
    #[serde(default = "default_date_input_formats")]
    pub date_input_formats: Vec<String>,

    /// Allow rows without a pseudonym
    #[serde(default)]
    pub can_transfer_unpseudonymized: bool,
}

impl BatchConfig {
    fn validate(&self) -> Result<(), String> {
        if !(1..=100_000).contains(&self.max_batch_size) {
            return Err(format!(
                "batch.max_batch_size must be between 1 and 100000, got {}",
                self.max_batch_size
            ));
        }

        if self.delimiter.len() != 1 || !self.delimiter.is_ascii() {
            return Err(format!(
                "batch.delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ));
        }

        if self.date_input_formats.is_empty() {
            return Err("batch.date_input_formats cannot be empty".to_string());
        }

        if self.date_input_formats.iter().any(|f| f.trim().is_empty()) {
            return Err("batch.date_input_formats cannot contain empty formats".to_string());
        }

        Ok(())
    }

    /// Delimiter as the byte the CSV reader expects
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.bytes().next().unwrap_or(b';')
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            delimiter: default_delimiter(),
            date_input_formats: default_date_input_formats(),
            can_transfer_unpseudonymized: false,
        }
    }
}

/// Daily transfer window
///
/// Equal begin and end times disable scheduling. A begin time after the end
/// time makes the window cross midnight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Window start, "HH:MM" or "HH:MM:SS"
    #[serde(default = "default_window_time")]
    pub begin_time: String,

    /// Window end, "HH:MM" or "HH:MM:SS"
    #[serde(default = "default_window_time")]
    pub end_time: String,

    /// IANA timezone the window is expressed in (e.g. "Europe/Berlin")
    #[serde(default)]
    pub timezone: Option<String>,
}

impl ScheduleConfig {
    fn validate(&self) -> Result<(), String> {
        ScheduleWindow::from_config(self)
            .map(|_| ())
            .map_err(|e| format!("schedule: {e}"))
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            begin_time: default_window_time(),
            end_time: default_window_time(),
            timezone: None,
        }
    }
}

/// Staging directory drain monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Root of the staging directory tree
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// Seconds between forced full scans
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Quiet period after the last change event before a scan, 0 scans immediately
    #[serde(default)]
    pub settle_delay_ms: u64,
}

impl MonitorConfig {
    fn validate(&self) -> Result<(), String> {
        if self.root_path.as_os_str().is_empty() {
            return Err("monitor.root_path cannot be empty".to_string());
        }

        if self.scan_interval_secs == 0 {
            return Err("monitor.scan_interval_secs must be > 0".to_string());
        }

        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            scan_interval_secs: default_scan_interval_secs(),
            settle_delay_ms: 0,
        }
    }
}

/// Topic file relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Host the relay server binds to and clients connect to
    #[serde(default = "default_relay_host")]
    pub host: String,

    /// Relay TCP port
    #[serde(default = "default_relay_port")]
    pub port: u16,

    /// Topic for files dropped directly into the staging root
    #[serde(default = "default_topic")]
    pub default_topic: String,

    /// Connect timeout of the reachability probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl RelayConfig {
    fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("relay.host cannot be empty".to_string());
        }

        if self.port == 0 {
            return Err("relay.port must be > 0".to_string());
        }

        if self.default_topic.is_empty()
            || self.default_topic.contains('\n')
            || self.default_topic.contains('\r')
        {
            return Err("relay.default_topic must be a non-empty single line".to_string());
        }

        if self.probe_timeout_ms == 0 {
            return Err("relay.probe_timeout_ms must be > 0".to_string());
        }

        self.socket_addr()?;
        Ok(())
    }

    /// "host:port" as used for binding and connecting
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed socket address, the host must be an IP literal
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.address()
            .parse()
            .map_err(|e| format!("relay address '{}' is invalid: {}", self.address(), e))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
            default_topic: default_topic(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default)]
    pub local_enabled: bool,

    /// Directory for log files
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.is_empty() {
            return Err(
                "logging.local_path cannot be empty when local logging is enabled".to_string(),
            );
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: false,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_batch_size() -> usize {
    500
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_date_input_formats() -> Vec<String> {
    vec![
        "%Y-%m-%d".to_string(),
        "%d.%m.%Y".to_string(),
        "%d/%m/%Y".to_string(),
        "%Y%m%d".to_string(),
    ]
}

fn default_window_time() -> String {
    "00:00".to_string()
}

fn default_root_path() -> PathBuf {
    PathBuf::from("/var/spool/studyhub")
}

fn default_scan_interval_secs() -> u64 {
    60
}

fn default_relay_host() -> String {
    "127.0.0.1".to_string()
}

fn default_relay_port() -> u16 {
    14638
}

fn default_topic() -> String {
    "default".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    1000
}

fn default_local_path() -> String {
    "/var/log/studyhub".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

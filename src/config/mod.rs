//! Configuration management for Studyhub.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Studyhub uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `STUDYHUB_<SECTION>_<KEY>` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use studyhub::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("studyhub.toml")?;
//!
//! println!("Staging root: {}", config.monitor.root_path.display());
//! println!("Relay: {}", config.relay.address());
//! println!("Max batch size: {}", config.batch.max_batch_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`BatchConfig`] - Batch file parsing and limits
//! - [`ScheduleConfig`] - Daily transfer window
//! - [`MonitorConfig`] - Staging directory drain monitor
//! - [`RelayConfig`] - Topic file relay endpoint
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [batch]
//! max_batch_size = 500
//! delimiter = ";"
//!
//! [schedule]
//! begin_time = "22:00"
//! end_time = "06:00"
//! timezone = "Europe/Berlin"
//!
//! [monitor]
//! root_path = "${STUDYHUB_STAGING}"
//!
//! [relay]
//! host = "127.0.0.1"
//! port = 14638
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::{load_config, load_config_from_str};
pub use schema::{
    ApplicationConfig, BatchConfig, LoggingConfig, MonitorConfig, RelayConfig, ScheduleConfig,
    StudyhubConfig,
};

//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::StudyhubConfig;
use crate::domain::errors::StudyhubError;
use crate::domain::Result;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into StudyhubConfig
/// 4. Applies environment variable overrides (STUDYHUB_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use studyhub::config::loader::load_config;
///
/// let config = load_config("studyhub.toml").expect("Failed to load config");
/// println!("Relay on {}", config.relay.address());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<StudyhubConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(StudyhubError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        StudyhubError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Loads configuration from TOML text, same pipeline as [`load_config`]
pub fn load_config_from_str(contents: &str) -> Result<StudyhubConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: StudyhubConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        StudyhubError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| StudyhubError::Other(format!("Invalid placeholder pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(StudyhubError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Parses a numeric or boolean override, naming the variable on failure
fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        StudyhubError::Configuration(format!("Invalid value '{}' for {}", value, name))
    })
}

/// Applies environment variable overrides using STUDYHUB_* prefix
///
/// Environment variables follow the pattern: STUDYHUB_<SECTION>_<KEY>
/// For example: STUDYHUB_RELAY_PORT, STUDYHUB_SCHEDULE_TIMEZONE
fn apply_env_overrides(config: &mut StudyhubConfig) -> Result<()> {
    let var = |name: &str| std::env::var(name).ok();

    // Application overrides
    if let Some(val) = var("STUDYHUB_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Batch overrides
    if let Some(val) = var("STUDYHUB_BATCH_MAX_BATCH_SIZE") {
        config.batch.max_batch_size = parse_override("STUDYHUB_BATCH_MAX_BATCH_SIZE", &val)?;
    }
    if let Some(val) = var("STUDYHUB_BATCH_DELIMITER") {
        config.batch.delimiter = val;
    }
    if let Some(val) = var("STUDYHUB_BATCH_CAN_TRANSFER_UNPSEUDONYMIZED") {
        config.batch.can_transfer_unpseudonymized =
            parse_override("STUDYHUB_BATCH_CAN_TRANSFER_UNPSEUDONYMIZED", &val)?;
    }

    // Schedule overrides
    if let Some(val) = var("STUDYHUB_SCHEDULE_BEGIN_TIME") {
        config.schedule.begin_time = val;
    }
    if let Some(val) = var("STUDYHUB_SCHEDULE_END_TIME") {
        config.schedule.end_time = val;
    }
    if let Some(val) = var("STUDYHUB_SCHEDULE_TIMEZONE") {
        config.schedule.timezone = if val.is_empty() { None } else { Some(val) };
    }

    // Monitor overrides
    if let Some(val) = var("STUDYHUB_MONITOR_ROOT_PATH") {
        config.monitor.root_path = PathBuf::from(val);
    }
    if let Some(val) = var("STUDYHUB_MONITOR_SCAN_INTERVAL_SECS") {
        config.monitor.scan_interval_secs =
            parse_override("STUDYHUB_MONITOR_SCAN_INTERVAL_SECS", &val)?;
    }
    if let Some(val) = var("STUDYHUB_MONITOR_SETTLE_DELAY_MS") {
        config.monitor.settle_delay_ms = parse_override("STUDYHUB_MONITOR_SETTLE_DELAY_MS", &val)?;
    }

    // Relay overrides
    if let Some(val) = var("STUDYHUB_RELAY_HOST") {
        config.relay.host = val;
    }
    if let Some(val) = var("STUDYHUB_RELAY_PORT") {
        config.relay.port = parse_override("STUDYHUB_RELAY_PORT", &val)?;
    }
    if let Some(val) = var("STUDYHUB_RELAY_DEFAULT_TOPIC") {
        config.relay.default_topic = val;
    }
    if let Some(val) = var("STUDYHUB_RELAY_PROBE_TIMEOUT_MS") {
        config.relay.probe_timeout_ms = parse_override("STUDYHUB_RELAY_PROBE_TIMEOUT_MS", &val)?;
    }

    // Logging overrides
    if let Some(val) = var("STUDYHUB_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_override("STUDYHUB_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("STUDYHUB_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = var("STUDYHUB_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

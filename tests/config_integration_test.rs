//! Integration tests for configuration loading and validation
//!
//! Tests that touch STUDYHUB_* environment variables hold ENV_MUTEX, since the
//! loader reads them on every call.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use studyhub::config::load_config;
use studyhub::core::schedule::ScheduleWindow;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    std::env::remove_var("STUDYHUB_APPLICATION_LOG_LEVEL");
    std::env::remove_var("STUDYHUB_BATCH_MAX_BATCH_SIZE");
    std::env::remove_var("STUDYHUB_RELAY_PORT");
    std::env::remove_var("STUDYHUB_SCHEDULE_TIMEZONE");
    std::env::remove_var("STUDYHUB_MONITOR_ROOT_PATH");
    std::env::remove_var("TEST_STUDYHUB_STAGING");
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[application]
log_level = "debug"

[batch]
max_batch_size = 250
delimiter = ","
date_input_formats = ["%Y-%m-%d", "%d.%m.%Y"]
can_transfer_unpseudonymized = true

[schedule]
begin_time = "22:00"
end_time = "06:00"
timezone = "Europe/Berlin"

[monitor]
root_path = "/srv/staging"
scan_interval_secs = 30
settle_delay_ms = 250

[relay]
host = "0.0.0.0"
port = 15000
default_topic = "archive"
probe_timeout_ms = 500

[logging]
local_enabled = false
local_path = "/tmp/studyhub"
local_rotation = "hourly"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.batch.max_batch_size, 250);
    assert_eq!(config.batch.delimiter_byte(), b',');
    assert_eq!(config.batch.date_input_formats.len(), 2);
    assert!(config.batch.can_transfer_unpseudonymized);
    assert_eq!(config.monitor.root_path, PathBuf::from("/srv/staging"));
    assert_eq!(config.monitor.scan_interval().as_secs(), 30);
    assert_eq!(config.monitor.settle_delay().as_millis(), 250);
    assert_eq!(config.relay.address(), "0.0.0.0:15000");
    assert_eq!(config.relay.default_topic, "archive");
    assert_eq!(config.logging.local_rotation, "hourly");

    let window = ScheduleWindow::from_config(&config.schedule).unwrap();
    assert!(window.crosses_midnight());
    assert_eq!(window.to_string(), "22:00:00-06:00:00 (Europe/Berlin)");
}

#[test]
fn test_empty_config_uses_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "info");
    assert_eq!(config.batch.max_batch_size, 500);
    assert_eq!(config.batch.delimiter, ";");
    assert!(!config.batch.can_transfer_unpseudonymized);
    assert_eq!(config.relay.port, 14638);
    assert_eq!(config.monitor.scan_interval_secs, 60);

    let window = ScheduleWindow::from_config(&config.schedule).unwrap();
    assert!(window.is_disabled());
}

#[test]
fn test_env_var_substitution() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("TEST_STUDYHUB_STAGING", "/data/staging");

    let file = write_config(
        r#"
[monitor]
root_path = "${TEST_STUDYHUB_STAGING}"
"#,
    );
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.monitor.root_path, PathBuf::from("/data/staging"));

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_error() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config(
        r#"
[monitor]
root_path = "${TEST_STUDYHUB_STAGING}"
"#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_STUDYHUB_STAGING"));
}

#[test]
fn test_env_overrides() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("STUDYHUB_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("STUDYHUB_BATCH_MAX_BATCH_SIZE", "42");
    std::env::set_var("STUDYHUB_RELAY_PORT", "16000");
    std::env::set_var("STUDYHUB_MONITOR_ROOT_PATH", "/override");

    let file = write_config(
        r#"
[application]
log_level = "debug"

[relay]
port = 15000
"#,
    );
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.batch.max_batch_size, 42);
    assert_eq!(config.relay.port, 16000);
    assert_eq!(config.monitor.root_path, PathBuf::from("/override"));

    cleanup_env_vars();
}

#[test]
fn test_invalid_override_names_variable() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();
    std::env::set_var("STUDYHUB_RELAY_PORT", "not-a-port");

    let file = write_config("");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("STUDYHUB_RELAY_PORT"));

    cleanup_env_vars();
}

#[test]
fn test_validation_errors() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let cases = [
        ("[application]\nlog_level = \"verbose\"", "log_level"),
        ("[batch]\nmax_batch_size = 0", "max_batch_size"),
        ("[batch]\ndelimiter = \";;\"", "delimiter"),
        ("[batch]\ndate_input_formats = []", "date_input_formats"),
        ("[schedule]\nbegin_time = \"25:00\"", "25:00"),
        ("[schedule]\ntimezone = \"Mars/Olympus\"", "Mars/Olympus"),
        ("[monitor]\nscan_interval_secs = 0", "scan_interval_secs"),
        ("[relay]\nport = 0", "port"),
        ("[logging]\nlocal_rotation = \"weekly\"", "local_rotation"),
    ];

    for (content, expected) in cases {
        let file = write_config(content);
        let err = load_config(file.path()).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "expected '{expected}' in error for {content:?}, got: {err}"
        );
    }
}

#[test]
fn test_invalid_toml_syntax() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    cleanup_env_vars();

    let file = write_config("[relay\nport = 1");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TOML parse error"));
}

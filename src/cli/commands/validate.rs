//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Studyhub configuration file.

use crate::config::load_config;
use crate::core::schedule::ScheduleWindow;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        if let Err(e) = config.validate() {
            println!("❌ Configuration validation failed");
            println!("   Error: {e}");
            println!();
            return Ok(2);
        }

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Max Batch Size: {}", config.batch.max_batch_size);
        println!("  Batch Delimiter: {:?}", config.batch.delimiter);
        println!(
            "  Unpseudonymized Transfer: {}",
            if config.batch.can_transfer_unpseudonymized {
                "allowed"
            } else {
                "not allowed"
            }
        );
        match ScheduleWindow::from_config(&config.schedule) {
            Ok(window) => println!("  Schedule Window: {window}"),
            Err(e) => println!("  Schedule Window: {e}"),
        }
        println!("  Staging Root: {}", config.monitor.root_path.display());
        println!("  Scan Interval: {}s", config.monitor.scan_interval_secs);
        println!("  Relay Address: {}", config.relay.address());
        println!("  Default Topic: {}", config.relay.default_topic);
        if config.logging.local_enabled {
            println!(
                "  Log Files: {} ({})",
                config.logging.local_path, config.logging.local_rotation
            );
        }
        println!();
        Ok(0)
    }
}

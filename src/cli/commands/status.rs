//! Status command implementation
//!
//! This module implements the `status` command for displaying relay
//! reachability and the schedule window state.

use super::load_validated_config;
use super::schedule::print_schedule;
use crate::adapters::relay::probe_relay;
use crate::core::schedule::ScheduleWindow;
use chrono::Local;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking status");

        println!("📊 Studyhub Status");
        println!();

        let Some(config) = load_validated_config(config_path) else {
            return Ok(2);
        };

        let addr = config.relay.address();
        if probe_relay(&addr, config.relay.probe_timeout()).await {
            println!("✅ Relay reachable at {addr}");
        } else {
            println!("❌ Relay not reachable at {addr}");
        }

        let staging = &config.monitor.root_path;
        if staging.is_dir() {
            println!("✅ Staging root {}", staging.display());
        } else {
            println!("❌ Staging root {} is not a directory", staging.display());
        }
        println!();

        match ScheduleWindow::from_config(&config.schedule) {
            Ok(window) => print_schedule(&window, &Local::now().fixed_offset()),
            Err(e) => println!("❌ {e}"),
        }
        println!();

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_status_with_unreachable_relay() {
        let dir = tempfile::TempDir::new().unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = dir.path().join("studyhub.toml");
        std::fs::write(
            &config,
            format!("[relay]\nport = {port}\nprobe_timeout_ms = 200\n"),
        )
        .unwrap();

        let code = StatusArgs {}.execute(config.to_str().unwrap()).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_status_missing_config() {
        let code = StatusArgs {}
            .execute("/nonexistent/studyhub.toml")
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}

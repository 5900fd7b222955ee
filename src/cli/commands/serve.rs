//! Serve command implementation
//!
//! Runs the relay server and a drain monitor on the staging root. Every file
//! drained from the staging tree is published on the topic named by its first
//! path component below the root.

use super::load_validated_config;
use crate::adapters::relay::RelayServer;
use crate::core::monitor::{handler_fn, DrainMonitor};
use crate::domain::{RelayError, Result, StudyhubError, Topic};
use crate::log_error_with_context;
use clap::Args;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Staging root to drain, overrides monitor.root_path
    #[arg(long)]
    pub root: Option<PathBuf>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let Some(config) = load_validated_config(config_path) else {
            return Ok(2);
        };

        let mut monitor_config = config.monitor.clone();
        if let Some(root) = &self.root {
            monitor_config.root_path = root.clone();
        }
        let default_topic = match Topic::new(config.relay.default_topic.clone()) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("❌ Invalid relay.default_topic: {e}");
                return Ok(2);
            }
        };

        let server = RelayServer::new();
        let addr = match server.bind(&config.relay.address()).await {
            Ok(addr) => addr,
            Err(e) => {
                log_error_with_context!(&e, "Failed to bind relay server");
                eprintln!("❌ {e}");
                return Ok(5);
            }
        };
        println!("📡 Relay listening on {addr}");
        println!("📂 Draining {}", monitor_config.root_path.display());

        let accept = server.clone();
        let accept_task = tokio::spawn(async move { accept.serve().await });

        let publisher = server.clone();
        let root = Arc::new(monitor_config.root_path.clone());
        let handler = handler_fn(move |path: PathBuf| {
            let publisher = publisher.clone();
            let root = root.clone();
            let default_topic = default_topic.clone();
            async move { publish_staged(&publisher, &root, &default_topic, &path).await }
        });

        let monitor = DrainMonitor::from_config(&monitor_config, handler);
        let monitor_handle = monitor.stop_handle();
        let relay_handle = server.clone();

        let signal_task = tokio::spawn(async move {
            while shutdown_signal.changed().await.is_ok() {
                if *shutdown_signal.borrow() {
                    tracing::info!("Stopping drain monitor and relay server");
                    break;
                }
            }
            monitor_handle.stop();
            relay_handle.stop();
        });

        let result = monitor.start().await;

        signal_task.abort();
        server.stop();
        match accept_task.await {
            Ok(Err(e)) => {
                log_error_with_context!(&e, "Relay server failed");
            }
            Err(e) => tracing::error!(error = %e, "Relay accept task panicked"),
            Ok(Ok(())) => {}
        }

        match result {
            Ok(()) => {
                println!("✅ Stopped after {} scan(s)", monitor.scan_count());
                Ok(0)
            }
            Err(e) => {
                log_error_with_context!(&e, "Drain monitor failed");
                eprintln!("❌ {e}");
                Ok(5)
            }
        }
    }
}

/// Topic of a staged file: its first directory below `root`, else `default`
pub fn topic_for_path(root: &Path, path: &Path, default: &Topic) -> Topic {
    let Ok(relative) = path.strip_prefix(root) else {
        return default.clone();
    };

    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(dir)), Some(_)) => dir
            .to_str()
            .and_then(|d| Topic::new(d).ok())
            .unwrap_or_else(|| default.clone()),
        _ => default.clone(),
    }
}

/// Drain handler: publish a staged file on its topic
///
/// The file is kept in the staging tree while nobody subscribes to its topic,
/// a later scan publishes it again.
async fn publish_staged(
    server: &RelayServer,
    root: &Path,
    default_topic: &Topic,
    path: &Path,
) -> Result<bool> {
    let topic = topic_for_path(root, path, default_topic);

    match server.publish(&topic, path).await {
        Ok(0) => {
            tracing::debug!(topic = %topic, path = %path.display(), "No subscribers, keeping file");
            Ok(false)
        }
        Ok(delivered) => {
            tracing::info!(
                topic = %topic,
                path = %path.display(),
                delivered,
                "Staged file relayed"
            );
            Ok(true)
        }
        Err(StudyhubError::Relay(e @ RelayError::FileTooLarge { .. })) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Keeping file that can't be relayed"
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

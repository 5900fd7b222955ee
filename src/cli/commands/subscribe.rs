//! Subscribe command implementation

use super::load_validated_config;
use crate::adapters::relay::{receive_fn, ReceiveAction, RelayClient};
use crate::domain::{RelayError, StudyhubError, Topic};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the subscribe command
#[derive(Args, Debug)]
pub struct SubscribeArgs {
    /// Topic to subscribe to
    pub topic: String,

    /// Folder to store received files in
    #[arg(long)]
    pub folder: PathBuf,

    /// Stop after this many files
    #[arg(long)]
    pub count: Option<usize>,

    /// Relay address, overrides relay.host and relay.port
    #[arg(long)]
    pub addr: Option<String>,
}

impl SubscribeArgs {
    /// Execute the subscribe command
    pub async fn execute(
        &self,
        config_path: &str,
        mut shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        let Some(config) = load_validated_config(config_path) else {
            return Ok(2);
        };

        let topic = match Topic::new(self.topic.clone()) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("❌ Invalid topic: {e}");
                return Ok(2);
            }
        };
        let addr = self.addr.clone().unwrap_or_else(|| config.relay.address());
        let client = RelayClient::new(addr.clone(), self.folder.clone());

        println!("📥 Subscribing to '{topic}' on {addr}");

        let limit = self.count;
        if limit == Some(0) {
            return Ok(0);
        }

        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();
        let handler = receive_fn(move |path: PathBuf| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                println!("  {} {}", n, path.display());
                match limit {
                    Some(limit) if n >= limit => Ok(ReceiveAction::Stop),
                    _ => Ok(ReceiveAction::Continue),
                }
            }
        });

        let result = tokio::select! {
            result = client.subscribe(&topic, handler) => result,
            _ = wait_for_shutdown(&mut shutdown_signal) => {
                println!();
                println!("⚠️  Shutdown signal received");
                Ok(received.load(Ordering::SeqCst))
            }
        };

        match result {
            Ok(count) => {
                println!("✅ Received {count} file(s)");
                Ok(0)
            }
            Err(e @ StudyhubError::Relay(RelayError::InvalidFolder(_))) => {
                eprintln!("❌ {e}");
                Ok(2)
            }
            Err(e @ StudyhubError::Relay(_)) => {
                tracing::error!(error = %e, "Relay subscription failed");
                eprintln!("❌ {e}");
                Ok(4)
            }
            Err(e) => {
                tracing::error!(error = %e, "Relay subscription failed");
                eprintln!("❌ {e}");
                Ok(5)
            }
        }
    }
}

async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    loop {
        let stop = *signal.borrow_and_update();
        if stop {
            return;
        }
        if signal.changed().await.is_err() {
            // Sender gone, nobody can request a shutdown anymore
            std::future::pending::<()>().await;
        }
    }
}

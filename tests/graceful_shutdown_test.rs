//! Integration tests for graceful shutdown of the relay and drain monitor
//!
//! These wire a monitor to a relay server the way `serve` does and stop both
//! through a shutdown channel, checking that:
//! - Subscribers see a clean end of stream
//! - Files nobody received stay in the staging tree
//! - Both loops return without error

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use studyhub::adapters::relay::{receive_fn, ReceiveAction, RelayClient, RelayServer};
use studyhub::cli::commands::serve::topic_for_path;
use studyhub::core::monitor::{handler_fn, DrainMonitor};
use studyhub::domain::Topic;
use tempfile::TempDir;
use tokio::sync::watch;

fn relay_handler(
    server: RelayServer,
    root: PathBuf,
) -> impl studyhub::core::monitor::FileHandler + 'static {
    let default_topic = Topic::new("default").unwrap();
    handler_fn(move |path: PathBuf| {
        let server = server.clone();
        let topic = topic_for_path(&root, &path, &default_topic);
        async move {
            server
                .publish(&topic, &path)
                .await
                .map(|delivered| delivered > 0)
        }
    })
}

/// Stop monitor and relay once the shutdown channel flips
fn spawn_shutdown_task(
    mut shutdown_rx: watch::Receiver<bool>,
    monitor: Arc<DrainMonitor>,
    server: RelayServer,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while shutdown_rx.changed().await.is_ok() {
            if *shutdown_rx.borrow() {
                break;
            }
        }
        monitor.stop();
        server.stop();
    })
}

#[tokio::test]
async fn test_shutdown_signal_propagation() {
    let (shutdown_tx, shutdown_rx1) = watch::channel(false);
    let shutdown_rx2 = shutdown_rx1.clone();

    assert!(!*shutdown_rx1.borrow());
    shutdown_tx.send(true).unwrap();

    assert!(*shutdown_rx1.borrow());
    assert!(*shutdown_rx2.borrow());
}

#[tokio::test]
async fn test_shutdown_stops_monitor_and_relay() {
    let staging = TempDir::new().unwrap();
    let kept = staging.path().join("nobody").join("orphan.dcm");
    std::fs::create_dir_all(kept.parent().unwrap()).unwrap();
    std::fs::write(&kept, b"unclaimed").unwrap();

    let server = RelayServer::new();
    server.bind("127.0.0.1:0").await.unwrap();
    let accept = server.clone();
    let serve_task = tokio::spawn(async move { accept.serve().await });

    let monitor = Arc::new(
        DrainMonitor::new(
            staging.path(),
            relay_handler(server.clone(), staging.path().to_path_buf()),
        )
        .with_scan_interval(Duration::from_millis(100)),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = spawn_shutdown_task(shutdown_rx, monitor.clone(), server.clone());

    let runner = monitor.clone();
    let monitor_task = tokio::spawn(async move { runner.start().await });

    // Let a few periodic scans retry the unclaimed file
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(monitor.scan_count() >= 2);

    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), monitor_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), serve_task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    signal_task.await.unwrap();

    assert!(kept.exists());
}

#[tokio::test]
async fn test_subscriber_receives_then_ends_cleanly_on_shutdown() {
    let staging = TempDir::new().unwrap();
    let inbox = TempDir::new().unwrap();

    let server = RelayServer::new();
    let addr = server.bind("127.0.0.1:0").await.unwrap();
    let accept = server.clone();
    let serve_task = tokio::spawn(async move { accept.serve().await });

    let client = RelayClient::new(addr.to_string(), inbox.path());
    let subscriber = tokio::spawn(async move {
        client
            .subscribe(
                &Topic::new("foo").unwrap(),
                receive_fn(|_| async { Ok(ReceiveAction::Continue) }),
            )
            .await
    });

    let foo = Topic::new("foo").unwrap();
    for _ in 0..250 {
        if server.subscriber_count(&foo).await == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.subscriber_count(&foo).await, 1);

    // Staged before the monitor starts, so the initial scan relays it
    let staged = staging.path().join("foo").join("1.2.3").join("img.dcm");
    std::fs::create_dir_all(staged.parent().unwrap()).unwrap();
    std::fs::write(&staged, b"DICM payload").unwrap();

    let monitor = Arc::new(DrainMonitor::new(
        staging.path(),
        relay_handler(server.clone(), staging.path().to_path_buf()),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = spawn_shutdown_task(shutdown_rx, monitor.clone(), server.clone());

    let runner = monitor.clone();
    let monitor_task = tokio::spawn(async move { runner.start().await });

    for _ in 0..250 {
        if !staged.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!staged.exists());
    assert!(!staging.path().join("foo").exists());

    shutdown_tx.send(true).unwrap();

    let received = tokio::time::timeout(Duration::from_secs(5), subscriber)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(received, 1);

    let files: Vec<_> = std::fs::read_dir(inbox.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"DICM payload");

    monitor_task.await.unwrap().unwrap();
    serve_task.await.unwrap().unwrap();
    signal_task.await.unwrap();
}

//! Integration tests for the staging directory drain monitor
//!
//! Files are created before the monitor starts where possible, so the
//! initial scan sees them regardless of file system notification latency.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use studyhub::core::monitor::{handler_fn, hook_fn, DrainMonitor};
use tempfile::TempDir;
use tokio::sync::Notify;

/// Poll `condition` until it holds or `timeout` elapses
async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

#[tokio::test]
async fn test_file_handled_once_and_removed() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("image.dcm");
    std::fs::write(&file, vec![0x42u8; 4096]).unwrap();

    let seen: Arc<Mutex<Vec<(PathBuf, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let monitor = DrainMonitor::new(
        dir.path(),
        handler_fn(move |path: PathBuf| {
            let recorder = recorder.clone();
            async move {
                let size = tokio::fs::metadata(&path).await.unwrap().len();
                recorder.lock().unwrap().push((path, size));
                Ok(true)
            }
        }),
    );
    let handle = monitor.stop_handle();
    let monitor = Arc::new(monitor);
    let runner = monitor.clone();
    let task = tokio::spawn(async move { runner.start().await });

    assert!(wait_until(Duration::from_secs(5), || !file.exists()).await);
    // Give any follow-up scans a chance to run before counting calls
    tokio::time::sleep(Duration::from_millis(200)).await;

    handle.stop();
    task.await.unwrap().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].0.ends_with("image.dcm"));
    assert_eq!(seen[0].1, 4096);
    assert!(dir.path().exists());
}

#[tokio::test]
async fn test_empty_subdirectories_removed_but_not_root() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("foo").join("1.2.3");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("a.dcm"), b"a").unwrap();
    std::fs::create_dir_all(dir.path().join("empty")).unwrap();

    let monitor = DrainMonitor::new(dir.path(), handler_fn(|_| async { Ok(true) }));
    let handle = monitor.stop_handle();
    let monitor = monitor.with_after_scan(hook_fn(move || {
        let handle = handle.clone();
        async move { handle.stop() }
    }));

    monitor.start().await.unwrap();

    assert!(dir.path().exists());
    assert!(!dir.path().join("foo").exists());
    assert!(!dir.path().join("empty").exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_kept_file_leaves_directory_in_place() {
    let dir = TempDir::new().unwrap();
    let topic_dir = dir.path().join("foo");
    std::fs::create_dir_all(&topic_dir).unwrap();
    std::fs::write(topic_dir.join("keep.dcm"), b"k").unwrap();
    std::fs::write(topic_dir.join("done.dcm"), b"d").unwrap();

    let monitor = DrainMonitor::new(
        dir.path(),
        handler_fn(|path: PathBuf| async move { Ok(path.ends_with("done.dcm")) }),
    );
    let handle = monitor.stop_handle();
    let monitor = monitor.with_after_scan(hook_fn(move || {
        let handle = handle.clone();
        async move { handle.stop() }
    }));

    monitor.start().await.unwrap();

    assert!(topic_dir.join("keep.dcm").exists());
    assert!(!topic_dir.join("done.dcm").exists());
}

#[tokio::test]
async fn test_new_file_picked_up_by_notification() {
    let dir = TempDir::new().unwrap();
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();

    let monitor = DrainMonitor::new(
        dir.path(),
        handler_fn(move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
        }),
    )
    // Long interval, so only notifications can trigger the second scan
    .with_scan_interval(Duration::from_secs(3600));
    let handle = monitor.stop_handle();
    let monitor = Arc::new(monitor);
    let runner = monitor.clone();
    let task = tokio::spawn(async move { runner.start().await });

    assert!(wait_until(Duration::from_secs(5), || monitor.scan_count() >= 1).await);

    // Write outside the root and move in, so the file is complete when seen
    let outside = TempDir::new().unwrap();
    let staging = outside.path().join("incoming");
    std::fs::write(&staging, b"payload").unwrap();
    let file = dir.path().join("late.dcm");
    std::fs::rename(&staging, &file).unwrap();

    assert!(wait_until(Duration::from_secs(5), || !file.exists()).await);

    handle.stop();
    task.await.unwrap().unwrap();
    assert!(handled.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_hooks_run_around_each_scan() {
    let dir = TempDir::new().unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));

    let before = events.clone();
    let after = events.clone();
    let monitor = DrainMonitor::new(dir.path(), handler_fn(|_| async { Ok(true) }));
    let handle = monitor.stop_handle();
    let monitor = monitor
        .with_before_scan(hook_fn(move || {
            let before = before.clone();
            async move { before.lock().unwrap().push("before") }
        }))
        .with_after_scan(hook_fn(move || {
            let after = after.clone();
            let handle = handle.clone();
            async move {
                after.lock().unwrap().push("after");
                handle.stop();
            }
        }));

    monitor.start().await.unwrap();

    assert_eq!(*events.lock().unwrap(), vec!["before", "after"]);
    assert_eq!(monitor.scan_count(), 1);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let dir = TempDir::new().unwrap();
    let monitor = DrainMonitor::new(dir.path(), handler_fn(|_| async { Ok(true) }));
    let handle = monitor.stop_handle();
    let monitor = monitor.with_after_scan(hook_fn(move || {
        let handle = handle.clone();
        async move { handle.stop() }
    }));

    monitor.start().await.unwrap();
    monitor.start().await.unwrap();
    assert_eq!(monitor.scan_count(), 2);
}

#[tokio::test]
async fn test_stop_abandons_pending_handler() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("stuck.dcm");
    std::fs::write(&file, b"data").unwrap();

    let entered = Arc::new(Notify::new());
    let signal = entered.clone();
    let monitor = DrainMonitor::new(
        dir.path(),
        handler_fn(move |_| {
            let signal = signal.clone();
            async move {
                signal.notify_one();
                // A subscriber that never reads keeps the handler here
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(true)
            }
        }),
    );
    let handle = monitor.stop_handle();
    let task = tokio::spawn(async move { monitor.start().await });

    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .unwrap();
    handle.stop();

    let result = tokio::time::timeout(Duration::from_secs(2), task).await;
    result.expect("stop did not interrupt the handler").unwrap().unwrap();
    assert!(file.exists());
}

#[tokio::test]
async fn test_event_burst_during_scan_coalesces_into_one_rescan() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("first.dcm"), b"first").unwrap();

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let blocked_once = Arc::new(AtomicBool::new(false));
    let (signal, gate, once) = (entered.clone(), release.clone(), blocked_once.clone());

    // Files are kept, so the scans themselves cause no change events
    let monitor = DrainMonitor::new(
        dir.path(),
        handler_fn(move |_| {
            let (signal, gate, once) = (signal.clone(), gate.clone(), once.clone());
            async move {
                if !once.swap(true, Ordering::SeqCst) {
                    signal.notify_one();
                    gate.notified().await;
                }
                Ok(false)
            }
        }),
    )
    .with_scan_interval(Duration::from_secs(3600));
    let handle = monitor.stop_handle();
    let monitor = Arc::new(monitor);
    let runner = monitor.clone();
    let task = tokio::spawn(async move { runner.start().await });

    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .unwrap();
    for i in 0..20 {
        std::fs::write(dir.path().join(format!("burst-{i}.dcm")), b"x").unwrap();
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(monitor.scan_count(), 0);

    release.notify_one();
    assert!(wait_until(Duration::from_secs(5), || monitor.scan_count() >= 2).await);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(monitor.scan_count(), 2);

    handle.stop();
    task.await.unwrap().unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 21);
}

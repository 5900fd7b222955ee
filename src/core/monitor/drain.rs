//! Directory drain monitor
//!
//! Watches a staging tree and hands every file to a [`FileHandler`]. Processed
//! files are deleted and emptied subdirectories removed, so the tree drains.
//!
//! Scans are requested by three sources: file system change events, a
//! periodic timer and one initial request at start. Requests go through a
//! channel of capacity one, so at most one scan runs and one more is queued;
//! further requests in the meantime are dropped.

use super::debounce::Debouncer;
use super::handler::{FileHandler, ScanHook};
use crate::config::MonitorConfig;
use crate::domain::errors::{MonitorError, StudyhubError};
use crate::domain::Result;
use crate::log_scan_complete;
use futures::future::{BoxFuture, FutureExt};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Default time between forced scans
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);

/// Stops a running [`DrainMonitor`]
///
/// Cloneable, so a file handler or scan hook can stop the monitor it runs in.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    shutdown: Arc<watch::Sender<bool>>,
}

impl MonitorHandle {
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// Counts of a single scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Files the handler processed (and that were deleted)
    pub processed: usize,
    /// Files the handler left in place
    pub kept: usize,
    /// Empty subdirectories removed
    pub removed_dirs: usize,
}

/// Watches a staging directory tree and drains it through a file handler
///
/// # Example
///
/// ```no_run
/// use studyhub::core::monitor::{handler_fn, DrainMonitor};
///
/// # async fn example() -> studyhub::domain::Result<()> {
/// let monitor = DrainMonitor::new("/var/spool/studyhub", handler_fn(|path| async move {
///     println!("{}", path.display());
///     Ok(true)
/// }));
/// let handle = monitor.stop_handle();
/// tokio::spawn(async move {
///     tokio::signal::ctrl_c().await.ok();
///     handle.stop();
/// });
/// monitor.start().await?;
/// # Ok(())
/// # }
/// ```
pub struct DrainMonitor {
    root: PathBuf,
    handler: Arc<dyn FileHandler>,
    before_scan: Option<Arc<dyn ScanHook>>,
    after_scan: Option<Arc<dyn ScanHook>>,
    scan_interval: Duration,
    settle_delay: Duration,
    scan_count: Arc<AtomicU64>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl DrainMonitor {
    pub fn new(root: impl Into<PathBuf>, handler: impl FileHandler + 'static) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            root: root.into(),
            handler: Arc::new(handler),
            before_scan: None,
            after_scan: None,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            settle_delay: Duration::ZERO,
            scan_count: Arc::new(AtomicU64::new(0)),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Monitor configured from the `[monitor]` section
    pub fn from_config(config: &MonitorConfig, handler: impl FileHandler + 'static) -> Self {
        Self::new(config.root_path.clone(), handler)
            .with_scan_interval(config.scan_interval())
            .with_settle_delay(config.settle_delay())
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    /// Wait for change events to settle before requesting a scan
    ///
    /// Zero requests a scan on every event.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_before_scan(mut self, hook: impl ScanHook + 'static) -> Self {
        self.before_scan = Some(Arc::new(hook));
        self
    }

    pub fn with_after_scan(mut self, hook: impl ScanHook + 'static) -> Self {
        self.after_scan = Some(Arc::new(hook));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of completed scans since construction
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::SeqCst)
    }

    pub fn stop_handle(&self) -> MonitorHandle {
        MonitorHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Request the monitor to stop
    ///
    /// The request holds until a run observes it. Stopping before
    /// [`start`](Self::start) makes that run return at once.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Run until stopped or until the file handler fails
    ///
    /// A scan in progress is abandoned at its next suspension point once a
    /// stop is requested, including a handler call that is still pending.
    /// The file that handler was working on stays in place.
    ///
    /// # Errors
    ///
    /// - [`MonitorError::InvalidRoot`] if the root is missing or not a directory
    /// - [`MonitorError::Watch`] if change notifications can't be set up
    /// - [`MonitorError::Handler`] if the file handler returned an error
    pub async fn start(&self) -> Result<()> {
        let is_dir = tokio::fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(MonitorError::InvalidRoot(self.root.display().to_string()).into());
        }

        let mut shutdown_rx = self.shutdown.subscribe();
        if *shutdown_rx.borrow_and_update() {
            self.shutdown.send_replace(false);
            tracing::info!(root = %self.root.display(), "Drain monitor stopped before start");
            return Ok(());
        }

        let (scan_tx, mut scan_rx) = mpsc::channel::<()>(1);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            let _ = event_tx.send(event);
        })
        .map_err(|e| MonitorError::Watch(e.to_string()))?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|e| MonitorError::Watch(e.to_string()))?;

        let listener = spawn_event_listener(event_rx, scan_tx.clone(), self.settle_delay);
        let ticker = spawn_periodic_scans(scan_tx.clone(), self.scan_interval);

        tracing::info!(
            root = %self.root.display(),
            scan_interval_secs = self.scan_interval.as_secs(),
            settle_delay_ms = self.settle_delay.as_millis() as u64,
            "Drain monitor started"
        );

        request_scan(&scan_tx);

        let result = self.run_worker(&mut scan_rx, &mut shutdown_rx).await;

        listener.abort();
        ticker.abort();
        drop(watcher);
        // The stop was consumed by this run, a later start runs again
        self.shutdown.send_replace(false);

        match &result {
            Ok(()) => tracing::info!(root = %self.root.display(), "Drain monitor stopped"),
            Err(e) => {
                tracing::error!(root = %self.root.display(), error = %e, "Drain monitor failed")
            }
        }
        result
    }

    async fn run_worker(
        &self,
        scan_rx: &mut mpsc::Receiver<()>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        loop {
            if *shutdown_rx.borrow() {
                return Ok(());
            }

            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        return Ok(());
                    }
                }
                request = scan_rx.recv() => {
                    if request.is_none() {
                        return Ok(());
                    }
                    let mut stop_rx = shutdown_rx.clone();
                    tokio::select! {
                        biased;
                        _ = async { let _ = stop_rx.wait_for(|stopped| *stopped).await; } => {
                            tracing::info!(root = %self.root.display(), "Scan abandoned on stop");
                            return Ok(());
                        }
                        scanned = self.scan_once(shutdown_rx) => scanned?,
                    }
                }
            }
        }
    }

    async fn scan_once(&self, shutdown_rx: &watch::Receiver<bool>) -> Result<()> {
        if let Some(hook) = &self.before_scan {
            hook.on_scan().await;
        }

        let started = Instant::now();
        let mut stats = ScanStats::default();
        self.scan_path(self.root.clone(), &mut stats, shutdown_rx)
            .await?;
        let scan = self.scan_count.fetch_add(1, Ordering::SeqCst) + 1;
        log_scan_complete!(
            scan,
            stats.processed,
            stats.kept,
            stats.removed_dirs,
            started.elapsed()
        );

        if let Some(hook) = &self.after_scan {
            hook.on_scan().await;
        }
        Ok(())
    }

    /// Depth-first scan of `path`
    fn scan_path<'a>(
        &'a self,
        path: PathBuf,
        stats: &'a mut ScanStats,
        shutdown_rx: &'a watch::Receiver<bool>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if *shutdown_rx.borrow() {
                return Ok(());
            }

            // Entries may vanish between listing and visiting
            let metadata = match tokio::fs::metadata(&path).await {
                Ok(metadata) => metadata,
                Err(_) => return Ok(()),
            };

            if metadata.is_file() {
                let processed = self.handler.handle(&path).await.map_err(|e| {
                    StudyhubError::from(MonitorError::Handler {
                        path: path.display().to_string(),
                        message: e.to_string(),
                    })
                })?;

                if processed {
                    match tokio::fs::remove_file(&path).await {
                        Ok(()) => {}
                        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                        Err(e) => {
                            return Err(StudyhubError::Io(format!(
                                "Failed to delete processed file {}: {}",
                                path.display(),
                                e
                            )))
                        }
                    }
                    tracing::debug!(path = %path.display(), "File processed");
                    stats.processed += 1;
                } else {
                    tracing::trace!(path = %path.display(), "File kept");
                    stats.kept += 1;
                }
            } else if metadata.is_dir() {
                let mut children = Vec::new();
                let mut entries = match tokio::fs::read_dir(&path).await {
                    Ok(entries) => entries,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                    Err(e) => return Err(e.into()),
                };
                while let Some(entry) = entries.next_entry().await? {
                    children.push(entry.path());
                }
                children.sort();

                for child in children {
                    self.scan_path(child, stats, shutdown_rx).await?;
                }

                if path != self.root && remove_if_empty(&path).await {
                    tracing::debug!(path = %path.display(), "Empty directory removed");
                    stats.removed_dirs += 1;
                }
            }

            Ok(())
        }
        .boxed()
    }
}

/// Remove `dir` if it has no entries
///
/// A file may be written into the directory at any moment, so a failing
/// removal is not an error.
async fn remove_if_empty(dir: &Path) -> bool {
    let is_empty = match tokio::fs::read_dir(dir).await {
        Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
        Err(_) => false,
    };
    is_empty && tokio::fs::remove_dir(dir).await.is_ok()
}

/// Queue a scan unless one is already queued
fn request_scan(scan_tx: &mpsc::Sender<()>) {
    if scan_tx.try_send(()).is_err() {
        tracing::trace!("Scan already pending");
    }
}

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_)
    )
}

fn spawn_event_listener(
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    scan_tx: mpsc::Sender<()>,
    settle_delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut debouncer = if settle_delay.is_zero() {
            None
        } else {
            let scan_tx = scan_tx.clone();
            Some(Debouncer::new(settle_delay, move || request_scan(&scan_tx)))
        };

        while let Some(event) = events.recv().await {
            match event {
                Ok(event) if is_relevant(&event) => match debouncer.as_mut() {
                    Some(debouncer) => debouncer.trigger(),
                    None => request_scan(&scan_tx),
                },
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            }
        }
    })
}

fn spawn_periodic_scans(scan_tx: mpsc::Sender<()>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately, the initial scan is requested separately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            request_scan(&scan_tx);
        }
    })
}

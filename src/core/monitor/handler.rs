//! File handler and scan hook contracts
//!
//! All callbacks of the drain monitor are asynchronous. Closures returning a
//! future are adapted with [`handler_fn`] and [`hook_fn`].

use crate::domain::Result;
use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Processes one completed file found in the staging tree
///
/// Returning `Ok(true)` marks the file as processed and the monitor deletes
/// it. `Ok(false)` keeps the file for a later scan. An error terminates the
/// monitor.
#[async_trait]
pub trait FileHandler: Send + Sync {
    async fn handle(&self, path: &Path) -> Result<bool>;
}

/// Callback run once before or after every scan cycle
#[async_trait]
pub trait ScanHook: Send + Sync {
    async fn on_scan(&self);
}

/// [`FileHandler`] backed by a closure
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> FileHandler for FnHandler<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send,
{
    async fn handle(&self, path: &Path) -> Result<bool> {
        (self.0)(path.to_path_buf()).await
    }
}

/// Adapt an async closure into a [`FileHandler`]
///
/// # Example
///
/// ```
/// use studyhub::core::monitor::{handler_fn, FileHandler};
///
/// let handler = handler_fn(|path| async move {
///     tracing::info!(path = %path.display(), "Got file");
///     Ok(true)
/// });
/// # fn assert_handler(_: &impl FileHandler) {}
/// # assert_handler(&handler);
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(PathBuf) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send,
{
    FnHandler(f)
}

/// [`ScanHook`] backed by a closure
pub struct FnHook<F>(F);

#[async_trait]
impl<F, Fut> ScanHook for FnHook<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    async fn on_scan(&self) {
        (self.0)().await
    }
}

/// Adapt an async closure into a [`ScanHook`]
pub fn hook_fn<F, Fut>(f: F) -> FnHook<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = ()> + Send,
{
    FnHook(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_handler_fn_passes_path() {
        let handler = handler_fn(|path: PathBuf| async move { Ok(path.ends_with("a.dcm")) });
        assert!(handler.handle(Path::new("/tmp/a.dcm")).await.unwrap());
        assert!(!handler.handle(Path::new("/tmp/b.dcm")).await.unwrap());
    }

    #[tokio::test]
    async fn test_hook_fn_runs_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let hook = hook_fn(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        hook.on_scan().await;
        hook.on_scan().await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

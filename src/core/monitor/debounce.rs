//! Trailing-edge debouncer

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs an action once a delay has elapsed without further triggers
///
/// Every [`trigger`](Debouncer::trigger) restarts the delay. Dropping the
/// debouncer cancels a pending action. Must be used within a Tokio runtime.
///
/// # Example
///
/// ```no_run
/// use studyhub::core::monitor::Debouncer;
/// use std::time::Duration;
///
/// # async fn example() {
/// let mut debouncer = Debouncer::new(Duration::from_millis(200), || {
///     println!("settled");
/// });
/// debouncer.trigger();
/// debouncer.trigger(); // "settled" is printed once, 200ms after this call
/// # }
/// ```
pub struct Debouncer {
    delay: Duration,
    action: Arc<dyn Fn() + Send + Sync>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            pending: None,
        }
    }

    /// Schedule the action, replacing an already pending one
    pub fn trigger(&mut self) {
        self.cancel();
        let action = self.action.clone();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        }));
    }

    /// Drop the pending action, if any
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .map(|pending| !pending.is_finished())
            .unwrap_or(false)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(delay_ms: u64) -> (Debouncer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let debouncer = Debouncer::new(Duration::from_millis(delay_ms), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (debouncer, calls)
    }

    #[tokio::test]
    async fn test_bursts_collapse_into_one_call() {
        let (mut debouncer, calls) = counting(50);
        for _ in 0..5 {
            debouncer.trigger();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test]
    async fn test_cancel_prevents_call() {
        let (mut debouncer, calls) = counting(30);
        debouncer.trigger();
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_cancels_pending_call() {
        let (mut debouncer, calls) = counting(30);
        debouncer.trigger();
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

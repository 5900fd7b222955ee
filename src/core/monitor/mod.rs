//! Directory drain monitor
//!
//! Watches a staging directory tree for completed files and hands each one to
//! a caller-supplied [`FileHandler`] exactly once. Bursts of file system
//! events are coalesced into a bounded number of scans.
//!
//! - [`DrainMonitor`] - the monitor and its scan worker
//! - [`MonitorHandle`] - cloneable stop handle
//! - [`Debouncer`] - optional settling of change events

pub mod debounce;
pub mod drain;
pub mod handler;

pub use debounce::Debouncer;
pub use drain::{DrainMonitor, MonitorHandle, ScanStats, DEFAULT_SCAN_INTERVAL};
pub use handler::{handler_fn, hook_fn, FileHandler, FnHandler, FnHook, ScanHook};

//! Topic file relay
//!
//! Point-to-multipoint file delivery over TCP. Subscribers connect and send a
//! topic line, the server then streams every file published on that topic to
//! them. Delivery is at-most-once with no acknowledgement or replay.
//!
//! - [`RelayServer`] - accept loop, session registry and publishing
//! - [`RelayClient`] - subscriber storing received files in a folder
//! - [`probe_relay`] - reachability check
//! - [`codec`] - wire format

pub mod client;
pub mod codec;
pub mod probe;
pub mod server;

pub use client::{receive_fn, FnReceiver, ReceiveAction, ReceiveHandler, RelayClient};
pub use probe::probe_relay;
pub use server::{RelayServer, SessionListener};

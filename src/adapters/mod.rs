//! External integrations for Studyhub.
//!
//! - [`relay`] - TCP topic file relay between a producer and its subscribers
//!
//! Adapters keep transport types out of the domain. Relay failures surface as
//! [`crate::domain::RelayError`].

pub mod relay;

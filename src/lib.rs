// Studyhub - Imaging Study Transfer Backbone
// Copyright (c) 2025 Studyhub Contributors
// Licensed under the MIT License

//! # Studyhub - Imaging Study Transfer Backbone
//!
//! Studyhub is the orchestration backbone of a service that moves medical
//! imaging studies between archives in batches.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Compiling** uploaded batch files into validated, grouped transfer tasks
//! - **Scheduling** batch work into a recurring daily time window
//! - **Draining** a staging folder through a caller-supplied file handler
//! - **Relaying** staged files over TCP to topic subscribers
//!
//! ## Architecture
//!
//! Studyhub follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (compiler, schedule, monitor)
//! - [`adapters`] - External integrations (topic file relay)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studyhub::config::load_config;
//! use studyhub::core::compiler::{load_csv_file, CompilerOptions, RequestCompiler};
//! use studyhub::core::schedule::ScheduleWindow;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("studyhub.toml")?;
//!
//!     let window = ScheduleWindow::from_config(&config.schedule)?;
//!     if window.must_defer(&chrono::Utc::now()) {
//!         println!("Next slot at {}", window.next_slot(&chrono::Utc::now()));
//!         return Ok(());
//!     }
//!
//!     let rows = load_csv_file("batch.csv", config.batch.delimiter_byte())?;
//!     let compiler = RequestCompiler::new(CompilerOptions::from_config(&config.batch));
//!     let tasks = compiler.compile(&rows)?;
//!     println!("Compiled {} tasks", tasks.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Staging Drain and Relay
//!
//! Files dropped into the staging tree are handed to a handler once and
//! removed after processing. The `serve` command wires the monitor to the
//! relay server:
//!
//! ```rust,no_run
//! use studyhub::adapters::relay::RelayServer;
//! use studyhub::core::monitor::{handler_fn, DrainMonitor};
//! use studyhub::domain::Topic;
//!
//! # async fn example() -> studyhub::domain::Result<()> {
//! let server = RelayServer::new();
//! server.bind("127.0.0.1:14638").await?;
//! let accept = server.clone();
//! tokio::spawn(async move { accept.serve().await });
//!
//! let monitor = DrainMonitor::new("/var/spool/studyhub", handler_fn(move |path| {
//!     let server = server.clone();
//!     async move {
//!         let topic = Topic::new("default").unwrap();
//!         let delivered = server.publish(&topic, &path).await?;
//!         Ok::<_, studyhub::domain::StudyhubError>(delivered > 0)
//!     }
//! }));
//! monitor.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Studyhub uses the [`domain::StudyhubError`] type for all errors:
//!
//! ```rust,no_run
//! use studyhub::domain::StudyhubError;
//!
//! fn example() -> Result<(), StudyhubError> {
//!     let config = studyhub::config::load_config("studyhub.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Studyhub uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!("Starting drain");
//! warn!(topic = "foo", "No subscribers");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

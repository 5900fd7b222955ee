//! Core business logic for Studyhub.
//!
//! # Modules
//!
//! - [`compiler`] - Batch request parsing, validation and grouping into tasks
//! - [`schedule`] - Daily transfer window evaluation
//! - [`monitor`] - Staging directory drain monitor
//!
//! # Workflow
//!
//! 1. **Schedule**: check the transfer window before starting a batch
//! 2. **Compile**: turn an uploaded batch file into ordered transfer tasks
//! 3. **Transfer**: an external executor runs the tasks and deposits files
//!    for unreachable destinations into the staging tree
//! 4. **Drain**: the monitor hands staged files to the relay and deletes them

pub mod compiler;
pub mod monitor;
pub mod schedule;

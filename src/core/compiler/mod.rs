//! Batch request compiler
//!
//! Turns the rows of an uploaded batch file into an ordered list of
//! [`CompiledTask`](crate::domain::CompiledTask)s:
//!
//! 1. Each row is trimmed and cleaned field by field ([`RowCleaner`])
//! 2. Rows are checked against each other for patient identity conflicts
//! 3. Rows sharing patient ID and study are grouped into one task
//!
//! All problems are collected into a
//! [`ValidationReport`](crate::domain::ValidationReport). Compilation fails as a
//! whole if the report is non-empty.
//!
//! # Example
//!
//! ```rust,no_run
//! use studyhub::core::compiler::{load_csv_file, CompilerOptions, RequestCompiler};
//!
//! # fn example() -> studyhub::domain::Result<()> {
//! let rows = load_csv_file("batch.csv", b';')?;
//! let tasks = RequestCompiler::new(CompilerOptions::default()).compile(&rows)?;
//! for task in tasks {
//!     println!("{} {} {}", task.task_id, task.patient_id, task.study_uid);
//! }
//! # Ok(())
//! # }
//! ```

pub mod compile;
pub mod csv_loader;
pub mod identity;
pub mod mapping;
pub mod row;

pub use compile::{CompilerOptions, RequestCompiler};
pub use csv_loader::{load_csv, load_csv_file, DEFAULT_DELIMITER};
pub use identity::IdentityTracker;
pub use mapping::{Field, FieldMapping};
pub use row::{RawRow, RequestRow, RowCleaner};

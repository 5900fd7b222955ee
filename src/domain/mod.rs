//! Domain models and types for Studyhub.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`StudyUid`], [`SeriesUid`], [`Topic`])
//! - **Domain models** ([`CompiledTask`], [`ValidationReport`])
//! - **Error types** ([`StudyhubError`], [`MonitorError`], [`RelayError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Identifiers use the newtype pattern so a series UID can't be passed where a
//! study UID is expected:
//!
//! ```rust
//! use studyhub::domain::{SeriesUid, StudyUid};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let study_uid = StudyUid::new("1.2.4")?;
//! let series_uid = SeriesUid::new("1.2.4.1")?;
//!
//! // let wrong: StudyUid = series_uid;  // Compile error!
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, StudyhubError>`]:
//!
//! ```rust,no_run
//! use studyhub::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = studyhub::config::load_config("studyhub.toml")?;
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod report;
pub mod task;

// Re-export commonly used types for convenience
pub use errors::{MonitorError, RelayError, Result, StudyhubError};
pub use ids::{SeriesUid, StudyUid, Topic};
pub use report::{ReportEntry, ValidationReport};
pub use task::CompiledTask;

//! Schedule window evaluator
//!
//! Decides whether batch work may run at a given instant and when the next
//! eligible instant is. Windows recur daily, may cross midnight and may be
//! expressed in an IANA timezone.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use studyhub::core::schedule::{parse_time_of_day, ScheduleWindow};
//!
//! let window = ScheduleWindow::new(
//!     parse_time_of_day("22:00").unwrap(),
//!     parse_time_of_day("06:00").unwrap(),
//!     None,
//! );
//! let now = Utc.with_ymd_and_hms(2020, 11, 5, 23, 0, 0).unwrap();
//! assert!(!window.must_defer(&now));
//! assert_eq!(
//!     window.next_slot(&now),
//!     Utc.with_ymd_and_hms(2020, 11, 6, 22, 0, 0).unwrap()
//! );
//! ```

pub mod window;

pub use window::{is_time_between, parse_time_of_day, ScheduleWindow};

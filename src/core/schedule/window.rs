//! Daily schedule window

use crate::config::ScheduleConfig;
use crate::domain::errors::StudyhubError;
use crate::domain::Result;
use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, Offset, TimeZone};
use chrono_tz::Tz;
use std::fmt;

/// Whether `check` lies in the window from `begin` to `end`, bounds included
///
/// A `begin` after `end` describes a window crossing midnight.
///
/// # Examples
///
/// ```
/// use chrono::NaiveTime;
/// use studyhub::core::schedule::is_time_between;
///
/// let t = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
/// assert!(is_time_between(t(1), t(3), t(3)));
/// assert!(is_time_between(t(23), t(1), t(0)));
/// assert!(!is_time_between(t(23), t(1), t(2)));
/// ```
pub fn is_time_between(begin: NaiveTime, end: NaiveTime, check: NaiveTime) -> bool {
    if begin < end {
        check >= begin && check <= end
    } else {
        check >= begin || check <= end
    }
}

/// Parse "HH:MM" or "HH:MM:SS"
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| {
            StudyhubError::Configuration(format!(
                "Invalid time of day '{value}'. Expected HH:MM or HH:MM:SS"
            ))
        })
}

/// Recurring daily time window in which transfers may run
///
/// Equal begin and end disable scheduling, work may then always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    begin: NaiveTime,
    end: NaiveTime,
    timezone: Option<Tz>,
}

impl ScheduleWindow {
    /// Create a window, times are interpreted in `timezone` when given and
    /// otherwise in the timezone of the instant being evaluated
    pub fn new(begin: NaiveTime, end: NaiveTime, timezone: Option<Tz>) -> Self {
        Self {
            begin,
            end,
            timezone,
        }
    }

    /// Build a window from the `[schedule]` configuration section
    ///
    /// # Examples
    ///
    /// ```
    /// use studyhub::config::ScheduleConfig;
    /// use studyhub::core::schedule::ScheduleWindow;
    ///
    /// let config = ScheduleConfig {
    ///     begin_time: "22:00".to_string(),
    ///     end_time: "06:00".to_string(),
    ///     timezone: Some("Europe/Berlin".to_string()),
    /// };
    /// let window = ScheduleWindow::from_config(&config).unwrap();
    /// assert!(window.crosses_midnight());
    /// ```
    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        let begin = parse_time_of_day(&config.begin_time)?;
        let end = parse_time_of_day(&config.end_time)?;
        let timezone = match config.timezone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(name.parse::<Tz>().map_err(|_| {
                StudyhubError::Configuration(format!("Invalid timezone '{name}'"))
            })?),
        };
        Ok(Self::new(begin, end, timezone))
    }

    pub fn begin(&self) -> NaiveTime {
        self.begin
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    pub fn is_disabled(&self) -> bool {
        self.begin == self.end
    }

    pub fn crosses_midnight(&self) -> bool {
        self.begin > self.end
    }

    /// Whether work must wait for the next slot instead of running at `now`
    pub fn must_defer<Z: TimeZone>(&self, now: &DateTime<Z>) -> bool {
        if self.is_disabled() {
            return false;
        }
        !is_time_between(self.begin, self.end, self.local(now).time())
    }

    /// Next instant at which the window opens, in the timezone of `now`
    ///
    /// The slot is `begin` today if the local time of day is still before it,
    /// otherwise `begin` tomorrow. A slot falling into a DST gap is moved
    /// forward by the gap, an ambiguous one resolves to the earlier instant.
    pub fn next_slot<Z: TimeZone>(&self, now: &DateTime<Z>) -> DateTime<Z> {
        let local = self.local(now);
        let date = if local.time() < self.begin {
            local.date()
        } else {
            local.date() + Duration::days(1)
        };
        let slot = date.and_time(self.begin);

        let reference = now.timezone();
        match self.timezone {
            Some(tz) => localize(&tz, slot).with_timezone(&reference),
            None => localize(&reference, slot),
        }
    }

    /// How long to wait before work may start, zero when it may start now
    pub fn wait_duration<Z: TimeZone>(&self, now: &DateTime<Z>) -> std::time::Duration {
        if !self.must_defer(now) {
            return std::time::Duration::ZERO;
        }
        self.next_slot(now)
            .signed_duration_since(now.clone())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    fn local<Z: TimeZone>(&self, now: &DateTime<Z>) -> NaiveDateTime {
        match self.timezone {
            Some(tz) => now.with_timezone(&tz).naive_local(),
            None => now.naive_local(),
        }
    }
}

impl fmt::Display for ScheduleWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_disabled() {
            return write!(f, "disabled");
        }
        write!(
            f,
            "{}-{}",
            self.begin.format("%H:%M:%S"),
            self.end.format("%H:%M:%S")
        )?;
        if let Some(tz) = self.timezone {
            write!(f, " ({})", tz.name())?;
        }
        Ok(())
    }
}

/// Attach `tz` to a local date and time, resolving DST transitions
fn localize<Z: TimeZone>(tz: &Z, local: NaiveDateTime) -> DateTime<Z> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            // Interpret with the offset in effect before the gap
            let before = tz.offset_from_utc_datetime(&(local - Duration::days(1))).fix();
            let utc = local - Duration::seconds(i64::from(before.local_minus_utc()));
            tz.from_utc_datetime(&utc)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("22:00").unwrap(), t(22, 0));
        assert_eq!(
            parse_time_of_day("06:30:15").unwrap(),
            NaiveTime::from_hms_opt(6, 30, 15).unwrap()
        );
        assert!(parse_time_of_day("6pm").is_err());
    }

    #[test]
    fn test_disabled_window_never_defers() {
        let window = ScheduleWindow::new(t(0, 0), t(0, 0), None);
        assert!(window.is_disabled());
        assert!(!window.must_defer(&utc(2020, 11, 5, 23, 0)));
        assert_eq!(window.wait_duration(&utc(2020, 11, 5, 23, 0)), std::time::Duration::ZERO);
        assert_eq!(window.to_string(), "disabled");
    }

    #[test]
    fn test_window_with_timezone_converts_now() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let window = ScheduleWindow::new(t(22, 0), t(6, 0), Some(tz));
        // 21:30 UTC is 22:30 in Berlin during winter time
        assert!(!window.must_defer(&utc(2020, 11, 5, 21, 30)));
        assert!(window.must_defer(&utc(2020, 11, 5, 20, 30)));
    }

    #[test]
    fn test_next_slot_returned_in_reference_timezone() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let window = ScheduleWindow::new(t(22, 0), t(6, 0), Some(tz));
        let slot = window.next_slot(&utc(2020, 11, 5, 10, 0));
        assert_eq!(slot, utc(2020, 11, 5, 21, 0));
    }

    #[test]
    fn test_next_slot_in_dst_gap_moves_forward() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let window = ScheduleWindow::new(t(2, 30), t(4, 0), Some(tz));
        // 2021-03-28 02:30 does not exist in Berlin, clocks jump to 03:00
        let slot = window.next_slot(&utc(2021, 3, 27, 12, 0));
        let local = slot.with_timezone(&tz).naive_local();
        assert_eq!(
            local,
            NaiveDate::from_ymd_opt(2021, 3, 28).unwrap().and_hms_opt(3, 30, 0).unwrap()
        );
        assert_eq!(slot, utc(2021, 3, 28, 1, 30));
    }

    #[test]
    fn test_next_slot_ambiguous_takes_earliest() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let window = ScheduleWindow::new(t(2, 30), t(4, 0), Some(tz));
        // 2021-10-31 02:30 happens twice in Berlin, first at 00:30 UTC
        let slot = window.next_slot(&utc(2021, 10, 30, 12, 0));
        assert_eq!(slot, utc(2021, 10, 31, 0, 30));
    }

    #[test]
    fn test_wait_duration_until_slot() {
        let window = ScheduleWindow::new(t(22, 0), t(6, 0), None);
        let wait = window.wait_duration(&utc(2020, 11, 5, 21, 0));
        assert_eq!(wait, std::time::Duration::from_secs(3600));
    }

    #[test]
    fn test_from_config_rejects_unknown_timezone() {
        let config = ScheduleConfig {
            begin_time: "22:00".to_string(),
            end_time: "06:00".to_string(),
            timezone: Some("Nowhere/City".to_string()),
        };
        let err = ScheduleWindow::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("Nowhere/City"));
    }

    #[test]
    fn test_display() {
        let tz: Tz = "UTC".parse().unwrap();
        let window = ScheduleWindow::new(t(22, 0), t(6, 0), Some(tz));
        assert_eq!(window.to_string(), "22:00:00-06:00:00 (UTC)");
    }
}

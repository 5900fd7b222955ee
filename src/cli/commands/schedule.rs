//! Schedule command implementation

use super::load_validated_config;
use crate::core::schedule::ScheduleWindow;
use chrono::{DateTime, FixedOffset, Local};
use clap::Args;

/// Arguments for the schedule command
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Instant to evaluate (RFC 3339), defaults to now
    #[arg(long, value_name = "RFC3339")]
    pub at: Option<String>,
}

impl ScheduleArgs {
    /// Execute the schedule command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let Some(config) = load_validated_config(config_path) else {
            return Ok(2);
        };
        let window = match ScheduleWindow::from_config(&config.schedule) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(2);
            }
        };

        let now = match self.instant() {
            Ok(now) => now,
            Err(e) => {
                eprintln!("❌ Invalid --at value: {e}");
                return Ok(2);
            }
        };

        print_schedule(&window, &now);
        Ok(0)
    }

    fn instant(&self) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
        match &self.at {
            Some(at) => DateTime::parse_from_rfc3339(at),
            None => Ok(Local::now().fixed_offset()),
        }
    }
}

/// Print the window state at `now`, shared with the status command
pub(crate) fn print_schedule(window: &ScheduleWindow, now: &DateTime<FixedOffset>) {
    println!("🕒 Schedule window: {window}");
    println!("   Evaluated at: {}", now.to_rfc3339());

    if window.is_disabled() {
        println!("   Transfers may run at any time");
        return;
    }

    if window.must_defer(now) {
        let slot = window.next_slot(now);
        let wait = window.wait_duration(now);
        println!("   ⏸️  Transfers must wait");
        println!(
            "   Next slot: {} (in {}h {:02}m)",
            slot.to_rfc3339(),
            wait.as_secs() / 3600,
            (wait.as_secs() % 3600) / 60
        );
    } else {
        println!("   ▶️  Transfers may run now");
        println!("   Next slot: {}", window.next_slot(now).to_rfc3339());
    }
}

// SPDX-License-Identifier: MIT

//! Time based conditions. All of them are pure functions of the clock plus
//! whatever state their last `reset()` captured.

mod day_of_week;
mod fixed;
mod interval;
mod window;

pub use day_of_week::DayOfWeekCondition;
pub use fixed::FixedEndTimeCondition;
pub use interval::IntervalCondition;
pub use window::TimeWindowCondition;

use chrono::{DateTime, Duration, Local};

/// Longest span a time condition schedules ahead: 100 years
pub const MAX_SPAN_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// `seconds` as a duration, capped at [`MAX_SPAN_SECONDS`]
pub(crate) fn span_seconds(seconds: u64) -> Duration {
    Duration::seconds(seconds.min(MAX_SPAN_SECONDS) as i64)
}

/// Compact duration text like `1h 30m` or `45s`
pub(crate) fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

/// Share of `[start, end]` already elapsed at `now`
pub(crate) fn elapsed_percent(
    start: DateTime<Local>,
    end: DateTime<Local>,
    now: DateTime<Local>,
) -> f64 {
    let span = (end - start).num_milliseconds();
    if span <= 0 {
        return if now >= end { 100.0 } else { 0.0 };
    }
    let done = (now - start).num_milliseconds();
    super::percent(done as f64, span as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(0)), "0s");
        assert_eq!(format_duration(Duration::seconds(45)), "45s");
        assert_eq!(format_duration(Duration::seconds(5400)), "1h 30m");
        assert_eq!(format_duration(Duration::seconds(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_span_seconds_is_capped() {
        assert_eq!(span_seconds(90), Duration::seconds(90));
        assert_eq!(span_seconds(u64::MAX).num_seconds() as u64, MAX_SPAN_SECONDS);
    }

    #[test]
    fn test_elapsed_percent() {
        let start = Local.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap();
        let end = start + Duration::minutes(10);
        assert_eq!(elapsed_percent(start, end, start), 0.0);
        assert_eq!(elapsed_percent(start, end, start + Duration::minutes(5)), 50.0);
        assert_eq!(elapsed_percent(start, end, end + Duration::hours(1)), 100.0);
        assert_eq!(elapsed_percent(end, end, end), 100.0);
    }
}

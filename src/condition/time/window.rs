// SPDX-License-Identifier: MIT

use crate::condition::{Condition, ConditionContext, ConditionKind};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};

/// Met while the local time of day is inside `[start, end)`.
///
/// A window whose start is after its end wraps past midnight; equal bounds
/// cover the whole day. An optional date range limits the days it applies to.
#[derive(Debug, Clone)]
pub struct TimeWindowCondition {
    start_time: NaiveTime,
    end_time: NaiveTime,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl TimeWindowCondition {
    pub const VERSION: &'static str = "0.0.3";

    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_dates(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start_time > self.end_time
    }

    fn date_in_range(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }

    fn time_in_window(&self, time: NaiveTime) -> bool {
        if self.start_time == self.end_time {
            true
        } else if self.wraps_midnight() {
            time >= self.start_time || time < self.end_time
        } else {
            time >= self.start_time && time < self.end_time
        }
    }
}

impl Condition for TimeWindowCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::TimeWindow
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        self.date_in_range(now.date_naive()) && self.time_in_window(now.time())
    }

    fn description(&self) -> String {
        let mut text = format!(
            "Between {} and {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        );
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => text.push_str(&format!(" from {} to {}", start, end)),
            (Some(start), None) => text.push_str(&format!(" from {}", start)),
            (None, Some(end)) => text.push_str(&format!(" until {}", end)),
            (None, None) => {}
        }
        text
    }

    fn reset(&mut self, _ctx: &mut ConditionContext<'_>) {}

    fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        let now = Local::now();
        if self.is_met_at(now) {
            return None;
        }
        let today = now.date_naive();
        let mut date = if now.time() < self.start_time {
            today
        } else {
            today + Duration::days(1)
        };
        if let Some(start) = self.start_date {
            date = date.max(start);
        }
        if self.end_date.is_some_and(|end| date > end) {
            return None;
        }
        Local
            .from_local_datetime(&date.and_time(self.start_time))
            .earliest()
    }
}

// SPDX-License-Identifier: MIT

use crate::condition::{Condition, ConditionContext, ConditionKind};
use chrono::{DateTime, Datelike, Local, NaiveDate, Weekday};
use std::collections::HashMap;

/// Met on the configured weekdays, optionally a limited number of times per day.
#[derive(Debug, Clone)]
pub struct DayOfWeekCondition {
    active_days: Vec<Weekday>,
    /// 0 means unlimited
    max_repeats_per_day: u32,
    daily_counts: HashMap<NaiveDate, u32>,
}

impl DayOfWeekCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(days: impl IntoIterator<Item = Weekday>) -> Self {
        let mut active_days: Vec<Weekday> = Vec::new();
        for day in days {
            if !active_days.contains(&day) {
                active_days.push(day);
            }
        }
        active_days.sort_by_key(|d| d.num_days_from_monday());
        Self {
            active_days,
            max_repeats_per_day: 0,
            daily_counts: HashMap::new(),
        }
    }

    pub fn weekdays() -> Self {
        Self::new([
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ])
    }

    pub fn weekends() -> Self {
        Self::new([Weekday::Sat, Weekday::Sun])
    }

    pub fn with_max_repeats_per_day(mut self, max: u32) -> Self {
        self.max_repeats_per_day = max;
        self
    }

    pub fn active_days(&self) -> &[Weekday] {
        &self.active_days
    }

    pub fn max_repeats_per_day(&self) -> u32 {
        self.max_repeats_per_day
    }

    pub fn count_on(&self, date: NaiveDate) -> u32 {
        self.daily_counts.get(&date).copied().unwrap_or(0)
    }

    fn is_active_day(&self, now: DateTime<Local>) -> bool {
        self.active_days.contains(&now.weekday())
    }

    fn has_repeats_left(&self, now: DateTime<Local>) -> bool {
        self.max_repeats_per_day == 0 || self.count_on(now.date_naive()) < self.max_repeats_per_day
    }
}

impl Condition for DayOfWeekCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::DayOfWeek
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        self.is_active_day(now) && self.has_repeats_left(now)
    }

    fn description(&self) -> String {
        if self.active_days.is_empty() {
            return "Active on no days".to_string();
        }
        let days: Vec<String> = self.active_days.iter().map(|d| d.to_string()).collect();
        let mut text = format!("Active on {}", days.join(", "));
        if self.max_repeats_per_day > 0 {
            text.push_str(&format!(", at most {} per day", self.max_repeats_per_day));
        }
        text
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if self.is_met_at(ctx.now) {
            *self.daily_counts.entry(ctx.now.date_naive()).or_insert(0) += 1;
        }
        let today = ctx.now.date_naive();
        self.daily_counts
            .retain(|date, _| (today - *date).num_days() < 7);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::testing::{rng, t0};
    use crate::runtime::world::SnapshotWorld;
    use chrono::Duration;

    #[test]
    fn test_active_days() {
        // t0 is a Monday
        let condition = DayOfWeekCondition::weekdays();
        assert!(condition.is_met_at(t0()));
        assert!(!condition.is_met_at(t0() + Duration::days(5)));
        assert!(DayOfWeekCondition::weekends().is_met_at(t0() + Duration::days(6)));
    }

    #[test]
    fn test_duplicates_removed_and_sorted() {
        let condition = DayOfWeekCondition::new([Weekday::Fri, Weekday::Mon, Weekday::Fri]);
        assert_eq!(condition.active_days(), &[Weekday::Mon, Weekday::Fri]);
        assert_eq!(condition.description(), "Active on Mon, Fri");
    }

    #[test]
    fn test_daily_repeat_limit() {
        let world = SnapshotWorld::default();
        let mut rng = rng();
        let mut condition = DayOfWeekCondition::new([Weekday::Mon, Weekday::Tue])
            .with_max_repeats_per_day(1);
        let mut ctx = ConditionContext::new(&world, &mut rng).at(t0());
        assert!(condition.is_met_at(t0()));
        condition.reset(&mut ctx);
        assert!(!condition.is_met_at(t0() + Duration::hours(1)));
        assert!(condition.is_met_at(t0() + Duration::days(1)));
    }
}

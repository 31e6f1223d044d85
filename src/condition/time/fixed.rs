// SPDX-License-Identifier: MIT

use super::{elapsed_percent, format_duration, span_seconds};
use crate::condition::{Condition, ConditionContext, ConditionKind, TargetRange};
use crate::runtime::world::WorldView;
use chrono::{DateTime, Duration, Local};

/// Met once the clock passes a deadline.
///
/// The deadline is either absolute, or derived from a duration (optionally
/// randomized) counted from construction and from every reset.
#[derive(Debug, Clone)]
pub struct FixedEndTimeCondition {
    start: DateTime<Local>,
    end: DateTime<Local>,
    /// Duration in seconds for relative deadlines
    duration: Option<TargetRange>,
}

impl FixedEndTimeCondition {
    pub const VERSION: &'static str = "0.0.1";

    /// Absolute deadline
    pub fn at(end: DateTime<Local>) -> Self {
        let now = Local::now();
        Self {
            start: now.min(end),
            end,
            duration: None,
        }
    }

    /// Deadline `duration` after `ctx.now`
    pub fn after(duration: Duration, ctx: &mut ConditionContext<'_>) -> Self {
        let seconds = duration.num_seconds().max(0) as u64;
        Self::randomized(TargetRange::fixed(seconds), ctx)
    }

    /// Deadline after a random number of seconds drawn from `seconds`
    pub fn randomized(seconds: TargetRange, ctx: &mut ConditionContext<'_>) -> Self {
        let rolled = seconds.resolve(ctx.rng);
        Self {
            start: ctx.now,
            end: ctx.now + span_seconds(rolled),
            duration: Some(seconds),
        }
    }

    /// Rebuild from persisted state
    pub(crate) fn restore(
        start: DateTime<Local>,
        end: DateTime<Local>,
        duration: Option<TargetRange>,
    ) -> Self {
        Self {
            start: start.min(end),
            end,
            duration,
        }
    }

    pub fn start(&self) -> DateTime<Local> {
        self.start
    }

    pub fn end(&self) -> DateTime<Local> {
        self.end
    }

    pub fn duration_range(&self) -> Option<TargetRange> {
        self.duration
    }

    pub fn remaining_at(&self, now: DateTime<Local>) -> Duration {
        (self.end - now).max(Duration::zero())
    }
}

impl Condition for FixedEndTimeCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::FixedEndTime
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        now >= self.end
    }

    fn description(&self) -> String {
        let mut text = format!("Time reached: {}", self.end.format("%Y-%m-%d %H:%M:%S"));
        if let Some(range) = self.duration {
            if range.is_randomized() {
                text.push_str(&format!(
                    " (random delay {}-{})",
                    format_duration(span_seconds(range.min())),
                    format_duration(span_seconds(range.max()))
                ));
            }
        }
        text
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        elapsed_percent(self.start, self.end, now)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        let Some(range) = self.duration else {
            return;
        };
        let span = if ctx.randomize {
            span_seconds(range.resolve(ctx.rng))
        } else {
            self.end - self.start
        };
        self.start = ctx.now;
        self.end = ctx.now + span;
    }

    fn resume(&mut self, paused_for: Duration, _world: &dyn WorldView) {
        if self.duration.is_some() {
            self.start += paused_for;
            self.end += paused_for;
        }
    }

    fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        Some(self.end)
    }
}

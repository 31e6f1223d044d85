// SPDX-License-Identifier: MIT

use super::{elapsed_percent, format_duration, span_seconds, MAX_SPAN_SECONDS};
use crate::condition::{Condition, ConditionContext, ConditionKind};
use crate::runtime::error::ConditionError;
use crate::runtime::world::WorldView;
use chrono::{DateTime, Duration, Local};
use rand::{Rng, RngCore};

/// Recurring trigger: met once `interval` has elapsed since the last reset.
///
/// With a jitter factor `f` the effective interval is drawn from
/// `[interval * (1 - f), interval * (1 + f)]`, once per reset.
#[derive(Debug, Clone)]
pub struct IntervalCondition {
    interval: Duration,
    jitter: f64,
    initial_delay: Option<Duration>,
    /// 0 means unlimited
    max_repeats: u32,
    trigger_count: u32,
    current_interval: Duration,
    last_reset: DateTime<Local>,
    next_trigger: DateTime<Local>,
}

impl IntervalCondition {
    pub const VERSION: &'static str = "0.0.3";

    pub fn new(interval: Duration, ctx: &mut ConditionContext<'_>) -> Result<Self, ConditionError> {
        Self::with_jitter(interval, 0.0, ctx)
    }

    pub fn with_jitter(
        interval: Duration,
        jitter: f64,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        if interval <= Duration::zero() {
            return Err(ConditionError::invalid_argument(
                "interval must be longer than zero",
            ));
        }
        if interval > span_seconds(MAX_SPAN_SECONDS) {
            return Err(ConditionError::invalid_argument(format!(
                "interval of {}s exceeds {}s",
                interval.num_seconds(),
                MAX_SPAN_SECONDS
            )));
        }
        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConditionError::invalid_argument(format!(
                "jitter factor {} outside [0, 1]",
                jitter
            )));
        }
        let mut condition = Self {
            interval,
            jitter,
            initial_delay: None,
            max_repeats: 0,
            trigger_count: 0,
            current_interval: interval,
            last_reset: ctx.now,
            next_trigger: ctx.now,
        };
        condition.current_interval = condition.roll(ctx.rng);
        condition.next_trigger = ctx.now + condition.current_interval;
        Ok(condition)
    }

    /// First trigger fires after `delay` instead of a full interval
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        let delay = delay.clamp(Duration::zero(), span_seconds(MAX_SPAN_SECONDS));
        self.initial_delay = Some(delay);
        self.next_trigger = self.last_reset + delay;
        self
    }

    pub fn with_max_repeats(mut self, max_repeats: u32) -> Self {
        self.max_repeats = max_repeats;
        self
    }

    pub(crate) fn restore_schedule(
        mut self,
        trigger_count: u32,
        next_trigger: Option<DateTime<Local>>,
    ) -> Self {
        self.trigger_count = trigger_count;
        if let Some(next) = next_trigger {
            self.next_trigger = next;
        }
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn initial_delay(&self) -> Option<Duration> {
        self.initial_delay
    }

    pub fn max_repeats(&self) -> u32 {
        self.max_repeats
    }

    pub fn trigger_count(&self) -> u32 {
        self.trigger_count
    }

    pub fn current_interval(&self) -> Duration {
        self.current_interval
    }

    /// Bounds of the jittered interval
    pub fn interval_bounds(&self) -> (Duration, Duration) {
        let base = self.interval.num_seconds() as f64;
        let min = (base * (1.0 - self.jitter)).round().max(1.0) as i64;
        let max = (base * (1.0 + self.jitter)).round().max(1.0) as i64;
        (Duration::seconds(min), Duration::seconds(max))
    }

    pub fn can_trigger_again(&self) -> bool {
        self.max_repeats == 0 || self.trigger_count < self.max_repeats
    }

    fn roll(&self, rng: &mut dyn RngCore) -> Duration {
        if self.jitter <= 0.0 {
            return self.interval;
        }
        let (min, max) = self.interval_bounds();
        Duration::seconds(rng.gen_range(min.num_seconds()..=max.num_seconds()))
    }
}

impl Condition for IntervalCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Interval
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        self.can_trigger_again() && now >= self.next_trigger
    }

    fn description(&self) -> String {
        let mut text = format!("Every {}", format_duration(self.interval));
        if self.jitter > 0.0 {
            let (min, max) = self.interval_bounds();
            text.push_str(&format!(
                " (randomized {}-{})",
                format_duration(min),
                format_duration(max)
            ));
        }
        if self.max_repeats > 0 {
            text.push_str(&format!(
                ", {}/{} triggers",
                self.trigger_count, self.max_repeats
            ));
        }
        if self.can_trigger_again() {
            text.push_str(&format!(", next at {}", self.next_trigger.format("%H:%M:%S")));
        } else {
            text.push_str(", no repeats left");
        }
        text
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        if !self.can_trigger_again() {
            return 0.0;
        }
        elapsed_percent(self.last_reset, self.next_trigger, now)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if self.is_met_at(ctx.now) {
            self.trigger_count += 1;
        }
        self.current_interval = self.roll(ctx.rng);
        self.last_reset = ctx.now;
        self.next_trigger = ctx.now + self.current_interval;
    }

    fn resume(&mut self, paused_for: Duration, _world: &dyn WorldView) {
        self.last_reset += paused_for;
        self.next_trigger += paused_for;
    }

    fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        self.can_trigger_again().then_some(self.next_trigger)
    }
}

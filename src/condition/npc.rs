// SPDX-License-Identifier: MIT

//! NPC kill conditions.

use super::resource::ItemPattern;
use super::{percent, Condition, ConditionContext, ConditionKind, TargetRange};
use crate::runtime::error::ConditionError;
use crate::runtime::event::NpcKilled;
use crate::runtime::world::WorldView;
use chrono::{DateTime, Local};

/// Met once enough NPCs with a matching name have died.
///
/// Names match with the same rules as item names; an empty name counts
/// every kill. The kill count only grows until `reset()`.
#[derive(Debug, Clone)]
pub struct NpcKillCountCondition {
    pattern: ItemPattern,
    target_range: TargetRange,
    target_count: u64,
    kill_count: u64,
}

impl NpcKillCountCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(
        npc_name: &str,
        count: u64,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        Self::randomized(npc_name, TargetRange::fixed(count), ctx)
    }

    /// Target count drawn once from `range`
    pub fn randomized(
        npc_name: &str,
        range: TargetRange,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        let pattern = ItemPattern::new(npc_name)?;
        let target_count = range.resolve(ctx.rng);
        Ok(Self::restore(pattern, range, target_count, 0))
    }

    pub(crate) fn restore(
        pattern: ItemPattern,
        target_range: TargetRange,
        target_count: u64,
        kill_count: u64,
    ) -> Self {
        Self {
            pattern,
            target_range,
            target_count,
            kill_count,
        }
    }

    pub fn pattern(&self) -> &ItemPattern {
        &self.pattern
    }

    pub fn target_range(&self) -> TargetRange {
        self.target_range
    }

    pub fn target_count(&self) -> u64 {
        self.target_count
    }

    pub fn kill_count(&self) -> u64 {
        self.kill_count
    }

    fn display_name(&self) -> &str {
        match self.pattern.as_str() {
            "" => "NPCs",
            name => name,
        }
    }
}

impl Condition for NpcKillCountCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::NpcKillCount
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.kill_count >= self.target_count
    }

    fn description(&self) -> String {
        let mut text = format!("Kill {} {}", self.target_count, self.display_name());
        if self.target_range.is_randomized() {
            text.push_str(&format!(" (randomized {})", self.target_range));
        }
        text.push_str(&format!(
            " ({}/{}, {:.1}%)",
            self.kill_count,
            self.target_count,
            self.progress_percentage()
        ));
        text
    }

    fn progress_percentage_at(&self, _now: DateTime<Local>) -> f64 {
        percent(self.kill_count as f64, self.target_count as f64)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if ctx.randomize {
            self.target_count = self.target_range.resolve(ctx.rng);
        }
        self.kill_count = 0;
    }

    fn on_npc_killed(&mut self, event: &NpcKilled, _world: &dyn WorldView) {
        if !self.pattern.matches(&event.name) {
            return;
        }
        self.kill_count = self.kill_count.saturating_add(1);
        log::debug!(
            "{}: killed {} ({}/{})",
            self.kind(),
            event.name,
            self.kill_count,
            self.target_count
        );
    }
}

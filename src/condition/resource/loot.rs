// SPDX-License-Identifier: MIT

use super::{held_quantity, ItemPattern, MonotonicCounter};
use crate::condition::{percent, Condition, ConditionContext, ConditionKind, TargetRange};
use crate::runtime::error::ConditionError;
use crate::runtime::event::ItemContainerChanged;
use crate::runtime::world::{ContainerId, WorldView};
use chrono::{DateTime, Duration, Local};

/// Met once enough matching items have been collected.
///
/// Every increase of the matching quantity in a watched container counts;
/// decreases (banking, dropping, using) never take credit away.
#[derive(Debug, Clone)]
pub struct LootItemCondition {
    pattern: ItemPattern,
    target_range: TargetRange,
    target_amount: u64,
    include_noted: bool,
    containers: Vec<ContainerId>,
    counters: Vec<MonotonicCounter>,
}

impl LootItemCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(
        item_name: &str,
        amount: u64,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        Self::randomized(item_name, TargetRange::fixed(amount), ctx)
    }

    /// Target amount drawn once from `range`
    pub fn randomized(
        item_name: &str,
        range: TargetRange,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        let pattern = ItemPattern::new(item_name)?;
        let target_amount = range.resolve(ctx.rng);
        Ok(Self::restore(
            pattern,
            range,
            target_amount,
            false,
            vec![ContainerId::Inventory],
            ctx.world,
        ))
    }

    pub(crate) fn restore(
        pattern: ItemPattern,
        target_range: TargetRange,
        target_amount: u64,
        include_noted: bool,
        containers: Vec<ContainerId>,
        world: &dyn WorldView,
    ) -> Self {
        let mut unique: Vec<ContainerId> = Vec::new();
        for container in containers {
            if !unique.contains(&container) {
                unique.push(container);
            }
        }
        let mut containers = unique;
        if containers.is_empty() {
            containers.push(ContainerId::Inventory);
        }
        let mut condition = Self {
            pattern,
            target_range,
            target_amount,
            include_noted,
            counters: vec![MonotonicCounter::default(); containers.len()],
            containers,
        };
        condition.rebaseline(world, true);
        condition
    }

    /// Count noted stacks as well
    pub fn include_noted(mut self, include: bool, world: &dyn WorldView) -> Self {
        self.include_noted = include;
        self.rebaseline(world, false);
        self
    }

    /// Watch these containers instead of the inventory alone
    pub fn watching(self, containers: Vec<ContainerId>, world: &dyn WorldView) -> Self {
        Self::restore(
            self.pattern,
            self.target_range,
            self.target_amount,
            self.include_noted,
            containers,
            world,
        )
    }

    pub fn pattern(&self) -> &ItemPattern {
        &self.pattern
    }

    pub fn target_range(&self) -> TargetRange {
        self.target_range
    }

    pub fn target_amount(&self) -> u64 {
        self.target_amount
    }

    pub fn includes_noted(&self) -> bool {
        self.include_noted
    }

    pub fn containers(&self) -> &[ContainerId] {
        &self.containers
    }

    /// Items collected since construction or the last reset
    pub fn tracked_count(&self) -> u64 {
        self.counters.iter().map(|c| c.total()).sum()
    }

    fn rebaseline(&mut self, world: &dyn WorldView, clear: bool) {
        for (container, counter) in self.containers.iter().zip(self.counters.iter_mut()) {
            let held = held_quantity(world, *container, &self.pattern, self.include_noted);
            if clear {
                *counter = MonotonicCounter::seeded(held);
            } else {
                counter.rebase(held);
            }
        }
    }
}

impl Condition for LootItemCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::LootItem
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.tracked_count() >= self.target_amount
    }

    fn description(&self) -> String {
        let mut text = format!("Collect {} {}", self.target_amount, self.pattern);
        if self.target_range.is_randomized() {
            text.push_str(&format!(" (randomized {})", self.target_range));
        }
        if self.include_noted {
            text.push_str(" incl. noted");
        }
        text.push_str(&format!(
            " ({}/{})",
            self.tracked_count().min(self.target_amount),
            self.target_amount
        ));
        text
    }

    fn progress_percentage_at(&self, _now: DateTime<Local>) -> f64 {
        percent(self.tracked_count() as f64, self.target_amount as f64)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if ctx.randomize {
            self.target_amount = self.target_range.resolve(ctx.rng);
        }
        self.rebaseline(ctx.world, true);
    }

    fn resume(&mut self, _paused_for: Duration, world: &dyn WorldView) {
        self.rebaseline(world, false);
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, _world: &dyn WorldView) {
        let Some(index) = self.containers.iter().position(|c| *c == event.container) else {
            return;
        };
        let held = self.pattern.count(&event.items, self.include_noted);
        let gained = self.counters[index].observe(held);
        if gained > 0 {
            log::debug!(
                "{}: +{} {} ({}/{})",
                self.kind(),
                gained,
                self.pattern,
                self.tracked_count(),
                self.target_amount
            );
        }
    }
}

// SPDX-License-Identifier: MIT

use super::ItemPattern;
use crate::condition::{percent, Condition, ConditionContext, ConditionKind, TargetRange};
use crate::runtime::error::ConditionError;
use crate::runtime::event::ItemContainerChanged;
use crate::runtime::world::{ContainerId, ItemStack, WorldView};
use chrono::{DateTime, Duration, Local};
use std::fmt;

/// One input or output of a processing step
#[derive(Debug, Clone)]
pub struct ProcessItem {
    pattern: ItemPattern,
    quantity: u64,
}

impl ProcessItem {
    pub fn new(item_name: &str, quantity: u64) -> Result<Self, ConditionError> {
        if quantity == 0 {
            return Err(ConditionError::invalid_argument(format!(
                "quantity per process for '{}' must be at least 1",
                item_name
            )));
        }
        Ok(Self {
            pattern: ItemPattern::new(item_name)?,
            quantity,
        })
    }

    pub fn pattern(&self) -> &ItemPattern {
        &self.pattern
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }
}

impl fmt::Display for ProcessItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.pattern, self.quantity)
    }
}

/// Which inventory changes count as a completed process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    /// All sources consumed
    SourceConsumption,
    /// All targets produced
    #[default]
    TargetProduction,
    /// Either family changed
    Either,
    /// Both families changed together
    Both,
}

impl TrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::SourceConsumption => "SOURCE_CONSUMPTION",
            TrackingMode::TargetProduction => "TARGET_PRODUCTION",
            TrackingMode::Either => "EITHER",
            TrackingMode::Both => "BOTH",
        }
    }

    pub fn parse(value: &str) -> Option<TrackingMode> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SOURCE_CONSUMPTION" => Some(TrackingMode::SourceConsumption),
            "TARGET_PRODUCTION" => Some(TrackingMode::TargetProduction),
            "EITHER" => Some(TrackingMode::Either),
            "BOTH" => Some(TrackingMode::Both),
            _ => None,
        }
    }
}

/// Quantities of each source and target in one inventory snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProcessSnapshot {
    sources: Vec<u64>,
    targets: Vec<u64>,
}

/// Met after a number of processing steps (source items turned into target
/// items) were observed in the inventory.
///
/// A step is recognized when every source dropped by the same multiple of
/// its per-process quantity, and/or every target rose that way, depending on
/// the [`TrackingMode`].
#[derive(Debug, Clone)]
pub struct ProcessItemCondition {
    sources: Vec<ProcessItem>,
    targets: Vec<ProcessItem>,
    mode: TrackingMode,
    target_range: TargetRange,
    target_count: u64,
    processed: u64,
    last: Option<ProcessSnapshot>,
}

impl ProcessItemCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(
        sources: Vec<ProcessItem>,
        targets: Vec<ProcessItem>,
        mode: TrackingMode,
        range: TargetRange,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        let target_count = range.resolve(ctx.rng);
        Self::restore(sources, targets, mode, range, target_count, ctx.world)
    }

    pub(crate) fn restore(
        sources: Vec<ProcessItem>,
        targets: Vec<ProcessItem>,
        mode: TrackingMode,
        target_range: TargetRange,
        target_count: u64,
        world: &dyn WorldView,
    ) -> Result<Self, ConditionError> {
        let missing = match mode {
            TrackingMode::SourceConsumption => sources.is_empty(),
            TrackingMode::TargetProduction => targets.is_empty(),
            TrackingMode::Either => sources.is_empty() && targets.is_empty(),
            TrackingMode::Both => sources.is_empty() || targets.is_empty(),
        };
        if missing {
            return Err(ConditionError::invalid_argument(format!(
                "tracking mode {} needs matching source/target items",
                mode.as_str()
            )));
        }
        let mut condition = Self {
            sources,
            targets,
            mode,
            target_range,
            target_count,
            processed: 0,
            last: None,
        };
        condition.last = condition.snapshot_world(world);
        Ok(condition)
    }

    pub fn sources(&self) -> &[ProcessItem] {
        &self.sources
    }

    pub fn targets(&self) -> &[ProcessItem] {
        &self.targets
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn target_range(&self) -> TargetRange {
        self.target_range
    }

    pub fn target_count(&self) -> u64 {
        self.target_count
    }

    pub fn processed_count(&self) -> u64 {
        self.processed
    }

    fn snapshot(&self, items: &[ItemStack]) -> ProcessSnapshot {
        ProcessSnapshot {
            sources: self
                .sources
                .iter()
                .map(|s| s.pattern.count(items, false))
                .collect(),
            targets: self
                .targets
                .iter()
                .map(|t| t.pattern.count(items, false))
                .collect(),
        }
    }

    fn snapshot_world(&self, world: &dyn WorldView) -> Option<ProcessSnapshot> {
        match world.container_items(ContainerId::Inventory) {
            Ok(items) => Some(self.snapshot(&items)),
            Err(e) => {
                log::warn!("Cannot read inventory for process tracking: {}", e);
                None
            }
        }
    }

    /// Number of steps seen between two snapshots
    fn steps_between(&self, before: &ProcessSnapshot, after: &ProcessSnapshot) -> u64 {
        let consumed = uniform_multiple(&self.sources, &before.sources, &after.sources, |b, a| {
            b.checked_sub(a)
        });
        let produced = uniform_multiple(&self.targets, &before.targets, &after.targets, |b, a| {
            a.checked_sub(b)
        });
        match self.mode {
            TrackingMode::SourceConsumption => consumed.unwrap_or(0),
            TrackingMode::TargetProduction => produced.unwrap_or(0),
            TrackingMode::Either => consumed.or(produced).unwrap_or(0),
            TrackingMode::Both => match (consumed, produced) {
                (Some(c), Some(p)) if c == p => c,
                _ => 0,
            },
        }
    }
}

/// `Some(k)` when every item changed by exactly `k * quantity` for one `k >= 1`
fn uniform_multiple<F>(items: &[ProcessItem], before: &[u64], after: &[u64], delta: F) -> Option<u64>
where
    F: Fn(u64, u64) -> Option<u64>,
{
    if items.is_empty() {
        return None;
    }
    let mut steps = None;
    for ((item, b), a) in items.iter().zip(before).zip(after) {
        let change = delta(*b, *a)?;
        if change == 0 || change % item.quantity != 0 {
            return None;
        }
        let k = change / item.quantity;
        match steps {
            None => steps = Some(k),
            Some(existing) if existing == k => {}
            Some(_) => return None,
        }
    }
    steps
}

impl Condition for ProcessItemCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::ProcessItem
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.processed >= self.target_count
    }

    fn description(&self) -> String {
        let list = |items: &[ProcessItem]| {
            items
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut text = format!("Process {} times", self.target_count);
        if self.target_range.is_randomized() {
            text.push_str(&format!(" (randomized {})", self.target_range));
        }
        match (self.sources.is_empty(), self.targets.is_empty()) {
            (false, false) => text.push_str(&format!(
                ": {} -> {}",
                list(&self.sources),
                list(&self.targets)
            )),
            (false, true) => text.push_str(&format!(": consume {}", list(&self.sources))),
            (true, false) => text.push_str(&format!(": produce {}", list(&self.targets))),
            (true, true) => {}
        }
        text.push_str(&format!(" (processed {})", self.processed));
        text
    }

    fn progress_percentage_at(&self, _now: DateTime<Local>) -> f64 {
        percent(self.processed as f64, self.target_count as f64)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if ctx.randomize {
            self.target_count = self.target_range.resolve(ctx.rng);
        }
        self.processed = 0;
        self.last = self.snapshot_world(ctx.world);
    }

    fn resume(&mut self, _paused_for: Duration, world: &dyn WorldView) {
        self.last = self.snapshot_world(world);
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, _world: &dyn WorldView) {
        if event.container != ContainerId::Inventory {
            return;
        }
        let current = self.snapshot(&event.items);
        if let Some(previous) = &self.last {
            let steps = self.steps_between(previous, &current);
            if steps > 0 {
                self.processed += steps;
                log::debug!(
                    "{}: {} step(s) detected ({}/{})",
                    self.kind(),
                    steps,
                    self.processed,
                    self.target_count
                );
            }
        }
        self.last = Some(current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::testing::{rng, stack, world};

    fn inventory(items: Vec<ItemStack>) -> ItemContainerChanged {
        ItemContainerChanged {
            container: ContainerId::Inventory,
            items,
        }
    }

    fn herb_cleaning(mode: TrackingMode, ctx: &mut ConditionContext<'_>) -> ProcessItemCondition {
        ProcessItemCondition::new(
            vec![ProcessItem::new("Grimy guam leaf", 1).unwrap()],
            vec![ProcessItem::new("^Guam leaf$", 1).unwrap()],
            mode,
            TargetRange::fixed(3),
            ctx,
        )
        .unwrap()
    }

    #[test]
    fn test_both_mode_counts_conversions() {
        let world = world();
        world.set_container(ContainerId::Inventory, vec![stack("Grimy guam leaf", 5)]);
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut condition = herb_cleaning(TrackingMode::Both, &mut ctx);

        condition.on_item_container_changed(
            &inventory(vec![stack("Grimy guam leaf", 4), stack("Guam leaf", 1)]),
            &world,
        );
        condition.on_item_container_changed(
            &inventory(vec![stack("Grimy guam leaf", 2), stack("Guam leaf", 3)]),
            &world,
        );
        assert_eq!(condition.processed_count(), 3);
        assert!(condition.is_met());
    }

    #[test]
    fn test_both_mode_ignores_one_sided_changes() {
        let world = world();
        world.set_container(ContainerId::Inventory, vec![stack("Grimy guam leaf", 5)]);
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut condition = herb_cleaning(TrackingMode::Both, &mut ctx);
        condition.on_item_container_changed(&inventory(vec![stack("Grimy guam leaf", 4)]), &world);
        assert_eq!(condition.processed_count(), 0);

        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut either = herb_cleaning(TrackingMode::Either, &mut ctx);
        either.on_item_container_changed(&inventory(vec![stack("Grimy guam leaf", 4)]), &world);
        assert_eq!(either.processed_count(), 1);
    }

    #[test]
    fn test_mismatched_quantities_are_not_a_step() {
        let world = world();
        world.set_container(
            ContainerId::Inventory,
            vec![stack("Bronze bar", 10), stack("Bronze arrowtips", 0)],
        );
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut condition = ProcessItemCondition::new(
            vec![ProcessItem::new("Bronze bar", 2).unwrap()],
            vec![],
            TrackingMode::SourceConsumption,
            TargetRange::fixed(2),
            &mut ctx,
        )
        .unwrap();
        condition.on_item_container_changed(&inventory(vec![stack("Bronze bar", 9)]), &world);
        assert_eq!(condition.processed_count(), 0);
        condition.on_item_container_changed(&inventory(vec![stack("Bronze bar", 5)]), &world);
        assert_eq!(condition.processed_count(), 2);
    }

    #[test]
    fn test_mode_requires_items() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let result = ProcessItemCondition::new(
            vec![ProcessItem::new("Logs", 1).unwrap()],
            vec![],
            TrackingMode::Both,
            TargetRange::fixed(1),
            &mut ctx,
        );
        assert!(matches!(result, Err(ConditionError::InvalidArgument(_))));
        assert!(ProcessItem::new("Logs", 0).is_err());
    }

    #[test]
    fn test_processed_count_is_monotonic() {
        let world = world();
        world.set_container(ContainerId::Inventory, vec![stack("Grimy guam leaf", 5)]);
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut condition = herb_cleaning(TrackingMode::Either, &mut ctx);
        let snapshots = [
            vec![stack("Grimy guam leaf", 4), stack("Guam leaf", 1)],
            vec![stack("Grimy guam leaf", 10)],
            vec![],
            vec![stack("Guam leaf", 2)],
            vec![stack("Guam leaf", 1)],
        ];
        let mut previous = 0;
        for items in snapshots {
            condition.on_item_container_changed(&inventory(items), &world);
            assert!(condition.processed_count() >= previous);
            previous = condition.processed_count();
        }
    }
}

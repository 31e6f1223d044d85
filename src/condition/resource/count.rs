// SPDX-License-Identifier: MIT

use super::{held_quantity, ItemPattern};
use crate::condition::{percent, Condition, ConditionContext, ConditionKind, TargetRange};
use crate::runtime::error::ConditionError;
use crate::runtime::event::ItemContainerChanged;
use crate::runtime::world::{ContainerId, WorldView};
use chrono::{DateTime, Local};

/// Highest matching quantity seen in one container since the last reset.
///
/// The high-water mark never drops, so once the target has been held the
/// condition stays met until reset.
#[derive(Debug, Clone)]
struct HeldItems {
    container: ContainerId,
    pattern: ItemPattern,
    target_range: TargetRange,
    target_count: u64,
    include_noted: bool,
    current: u64,
    highest: u64,
}

impl HeldItems {
    fn new(
        container: ContainerId,
        pattern: ItemPattern,
        target_range: TargetRange,
        target_count: u64,
        include_noted: bool,
        world: &dyn WorldView,
    ) -> Self {
        let mut held = Self {
            container,
            pattern,
            target_range,
            target_count,
            include_noted,
            current: 0,
            highest: 0,
        };
        held.capture(world);
        held
    }

    fn capture(&mut self, world: &dyn WorldView) {
        let current =
            held_quantity(world, self.container, &self.pattern, self.include_noted).unwrap_or(0);
        self.current = current;
        self.highest = current;
    }

    fn is_met(&self) -> bool {
        self.highest >= self.target_count
    }

    fn describe(&self, place: &str) -> String {
        let mut text = format!("Have {} {} in {}", self.target_count, self.pattern, place);
        if self.target_range.is_randomized() {
            text.push_str(&format!(" (randomized {})", self.target_range));
        }
        text.push_str(&format!(" (current {})", self.current));
        text
    }

    fn progress(&self) -> f64 {
        percent(self.highest as f64, self.target_count as f64)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if ctx.randomize {
            self.target_count = self.target_range.resolve(ctx.rng);
        }
        self.capture(ctx.world);
    }

    fn observe(&mut self, event: &ItemContainerChanged) {
        if event.container != self.container {
            return;
        }
        self.current = self.pattern.count(&event.items, self.include_noted);
        self.highest = self.highest.max(self.current);
    }
}

/// Met once the inventory holds at least the target amount of an item.
#[derive(Debug, Clone)]
pub struct InventoryItemCountCondition {
    held: HeldItems,
}

impl InventoryItemCountCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(
        item_name: &str,
        count: u64,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        Self::randomized(item_name, TargetRange::fixed(count), false, ctx)
    }

    pub fn randomized(
        item_name: &str,
        range: TargetRange,
        include_noted: bool,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        let pattern = ItemPattern::new(item_name)?;
        let target = range.resolve(ctx.rng);
        Ok(Self::restore(pattern, range, target, include_noted, ctx.world))
    }

    pub(crate) fn restore(
        pattern: ItemPattern,
        range: TargetRange,
        target: u64,
        include_noted: bool,
        world: &dyn WorldView,
    ) -> Self {
        Self {
            held: HeldItems::new(ContainerId::Inventory, pattern, range, target, include_noted, world),
        }
    }

    pub fn pattern(&self) -> &ItemPattern {
        &self.held.pattern
    }

    pub fn target_range(&self) -> TargetRange {
        self.held.target_range
    }

    pub fn target_count(&self) -> u64 {
        self.held.target_count
    }

    pub fn includes_noted(&self) -> bool {
        self.held.include_noted
    }

    pub fn current_count(&self) -> u64 {
        self.held.current
    }

    pub fn highest_count(&self) -> u64 {
        self.held.highest
    }
}

impl Condition for InventoryItemCountCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::InventoryItemCount
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.held.is_met()
    }

    fn description(&self) -> String {
        let mut text = self.held.describe("inventory");
        if self.held.include_noted {
            text.push_str(" incl. noted");
        }
        text
    }

    fn progress_percentage_at(&self, _now: DateTime<Local>) -> f64 {
        self.held.progress()
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        self.held.reset(ctx);
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, _world: &dyn WorldView) {
        self.held.observe(event);
    }
}

/// Met once the bank holds at least the target amount of an item.
#[derive(Debug, Clone)]
pub struct BankItemCountCondition {
    held: HeldItems,
}

impl BankItemCountCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(
        item_name: &str,
        count: u64,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        Self::randomized(item_name, TargetRange::fixed(count), ctx)
    }

    pub fn randomized(
        item_name: &str,
        range: TargetRange,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Self, ConditionError> {
        let pattern = ItemPattern::new(item_name)?;
        let target = range.resolve(ctx.rng);
        Ok(Self::restore(pattern, range, target, ctx.world))
    }

    pub(crate) fn restore(
        pattern: ItemPattern,
        range: TargetRange,
        target: u64,
        world: &dyn WorldView,
    ) -> Self {
        Self {
            held: HeldItems::new(ContainerId::Bank, pattern, range, target, false, world),
        }
    }

    pub fn pattern(&self) -> &ItemPattern {
        &self.held.pattern
    }

    pub fn target_range(&self) -> TargetRange {
        self.held.target_range
    }

    pub fn target_count(&self) -> u64 {
        self.held.target_count
    }

    pub fn current_count(&self) -> u64 {
        self.held.current
    }

    pub fn highest_count(&self) -> u64 {
        self.held.highest
    }
}

impl Condition for BankItemCountCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::BankItemCount
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.held.is_met()
    }

    fn description(&self) -> String {
        self.held.describe("bank")
    }

    fn progress_percentage_at(&self, _now: DateTime<Local>) -> f64 {
        self.held.progress()
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        self.held.reset(ctx);
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, _world: &dyn WorldView) {
        self.held.observe(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::testing::{rng, stack, world};

    #[test]
    fn test_inventory_count_stays_met_after_items_leave() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut condition = InventoryItemCountCondition::new("Raw lobster", 10, &mut ctx).unwrap();

        let change = |n| ItemContainerChanged {
            container: ContainerId::Inventory,
            items: vec![stack("Raw lobster", n)],
        };
        condition.on_item_container_changed(&change(6), &world);
        assert_eq!(condition.progress_percentage(), 60.0);
        condition.on_item_container_changed(&change(10), &world);
        assert!(condition.is_met());
        condition.on_item_container_changed(&change(0), &world);
        assert!(condition.is_met());
        assert_eq!(condition.current_count(), 0);
        assert_eq!(condition.highest_count(), 10);
    }

    #[test]
    fn test_already_held_items_count() {
        let world = world();
        world.set_container(ContainerId::Bank, vec![stack("Coins", 50_000)]);
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let condition = BankItemCountCondition::new("Coins", 10_000, &mut ctx).unwrap();
        assert!(condition.is_met());
    }

    #[test]
    fn test_bank_count_ignores_inventory() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut condition = BankItemCountCondition::new("Yew logs", 100, &mut ctx).unwrap();
        condition.on_item_container_changed(
            &ItemContainerChanged {
                container: ContainerId::Inventory,
                items: vec![stack("Yew logs", 500)],
            },
            &world,
        );
        assert!(!condition.is_met());
    }

    #[test]
    fn test_reset_recaptures_current_holdings() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut condition = InventoryItemCountCondition::new("Coal", 5, &mut ctx).unwrap();
        condition.on_item_container_changed(
            &ItemContainerChanged {
                container: ContainerId::Inventory,
                items: vec![stack("Coal", 5)],
            },
            &world,
        );
        assert!(condition.is_met());

        let mut ctx = ConditionContext::new(&world, &mut rng);
        condition.reset(&mut ctx);
        assert!(!condition.is_met());
        assert_eq!(condition.highest_count(), 0);
    }
}

// SPDX-License-Identifier: MIT

use super::location::{AreaCondition, PositionCondition, RegionCondition};
use super::lock::LockCondition;
use super::logical::{AndCondition, NotCondition, OrCondition};
use super::npc::NpcKillCountCondition;
use super::resource::{
    BankItemCountCondition, InventoryItemCountCondition, LootItemCondition, ProcessItemCondition,
};
use super::skill::{SkillLevelCondition, SkillXpCondition};
use super::time::{
    DayOfWeekCondition, FixedEndTimeCondition, IntervalCondition, TimeWindowCondition,
};
use super::{Condition, ConditionContext, ConditionKind};
use crate::runtime::event::{GameEvent, ItemContainerChanged, NpcKilled, StatChanged};
use crate::runtime::world::WorldView;
use chrono::{DateTime, Duration, Local};

/// Any node of a condition tree.
///
/// One variant per concrete condition kind; matching on it is exhaustive, so
/// adding a kind forces every consumer (serialization included) to handle it.
#[derive(Debug, Clone)]
pub enum ConditionNode {
    And(AndCondition),
    Or(OrCondition),
    Not(NotCondition),
    Lock(LockCondition),
    FixedEndTime(FixedEndTimeCondition),
    Interval(IntervalCondition),
    DayOfWeek(DayOfWeekCondition),
    TimeWindow(TimeWindowCondition),
    SkillLevel(SkillLevelCondition),
    SkillXp(SkillXpCondition),
    Position(PositionCondition),
    Area(AreaCondition),
    Region(RegionCondition),
    LootItem(LootItemCondition),
    InventoryItemCount(InventoryItemCountCondition),
    BankItemCount(BankItemCountCondition),
    ProcessItem(ProcessItemCondition),
    NpcKillCount(NpcKillCountCondition),
}

macro_rules! dispatch {
    ($node:expr, $inner:ident => $body:expr) => {
        match $node {
            ConditionNode::And($inner) => $body,
            ConditionNode::Or($inner) => $body,
            ConditionNode::Not($inner) => $body,
            ConditionNode::Lock($inner) => $body,
            ConditionNode::FixedEndTime($inner) => $body,
            ConditionNode::Interval($inner) => $body,
            ConditionNode::DayOfWeek($inner) => $body,
            ConditionNode::TimeWindow($inner) => $body,
            ConditionNode::SkillLevel($inner) => $body,
            ConditionNode::SkillXp($inner) => $body,
            ConditionNode::Position($inner) => $body,
            ConditionNode::Area($inner) => $body,
            ConditionNode::Region($inner) => $body,
            ConditionNode::LootItem($inner) => $body,
            ConditionNode::InventoryItemCount($inner) => $body,
            ConditionNode::BankItemCount($inner) => $body,
            ConditionNode::ProcessItem($inner) => $body,
            ConditionNode::NpcKillCount($inner) => $body,
        }
    };
}

macro_rules! node_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for ConditionNode {
                fn from(condition: $ty) -> Self {
                    ConditionNode::$variant(condition)
                }
            }
        )*
    };
}

node_from!(
    And(AndCondition),
    Or(OrCondition),
    Not(NotCondition),
    Lock(LockCondition),
    FixedEndTime(FixedEndTimeCondition),
    Interval(IntervalCondition),
    DayOfWeek(DayOfWeekCondition),
    TimeWindow(TimeWindowCondition),
    SkillLevel(SkillLevelCondition),
    SkillXp(SkillXpCondition),
    Position(PositionCondition),
    Area(AreaCondition),
    Region(RegionCondition),
    LootItem(LootItemCondition),
    InventoryItemCount(InventoryItemCountCondition),
    BankItemCount(BankItemCountCondition),
    ProcessItem(ProcessItemCondition),
    NpcKillCount(NpcKillCountCondition),
);

impl ConditionNode {
    /// Direct children of a combinator; empty for leaves
    pub fn children(&self) -> Vec<&ConditionNode> {
        match self {
            ConditionNode::And(and) => and.conditions().iter().collect(),
            ConditionNode::Or(or) => or.conditions().iter().collect(),
            ConditionNode::Not(not) => vec![not.inner()],
            _ => Vec::new(),
        }
    }

    fn children_mut(&mut self) -> Vec<&mut ConditionNode> {
        match self {
            ConditionNode::And(and) => and.conditions_mut().iter_mut().collect(),
            ConditionNode::Or(or) => or.conditions_mut().iter_mut().collect(),
            ConditionNode::Not(not) => vec![not.inner_mut()],
            _ => Vec::new(),
        }
    }

    /// Whether this node or any descendant is of `kind`
    pub fn contains_kind(&self, kind: ConditionKind) -> bool {
        self.kind() == kind || self.children().iter().any(|c| c.contains_kind(kind))
    }

    /// Every lock in this subtree, depth first
    pub fn lock_conditions(&self) -> Vec<&LockCondition> {
        match self {
            ConditionNode::Lock(lock) => vec![lock],
            _ => self
                .children()
                .into_iter()
                .flat_map(|c| c.lock_conditions())
                .collect(),
        }
    }

    pub fn lock_conditions_mut(&mut self) -> Vec<&mut LockCondition> {
        match self {
            ConditionNode::Lock(lock) => vec![lock],
            _ => self
                .children_mut()
                .into_iter()
                .flat_map(|c| c.lock_conditions_mut())
                .collect(),
        }
    }

    /// Whether any lock in this subtree is held
    pub fn is_locked(&self) -> bool {
        self.lock_conditions().iter().any(|lock| lock.is_locked())
    }
}

impl Condition for ConditionNode {
    fn kind(&self) -> ConditionKind {
        dispatch!(self, c => c.kind())
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        dispatch!(self, c => c.is_met_at(now))
    }

    fn description(&self) -> String {
        dispatch!(self, c => c.description())
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        dispatch!(self, c => c.progress_percentage_at(now))
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        dispatch!(self, c => c.reset(ctx))
    }

    fn activate(&mut self, world: &dyn WorldView) {
        dispatch!(self, c => c.activate(world))
    }

    fn deactivate(&mut self) {
        dispatch!(self, c => c.deactivate())
    }

    fn resume(&mut self, paused_for: Duration, world: &dyn WorldView) {
        dispatch!(self, c => c.resume(paused_for, world))
    }

    fn on_game_tick(&mut self, world: &dyn WorldView) {
        dispatch!(self, c => c.on_game_tick(world))
    }

    fn on_stat_changed(&mut self, event: &StatChanged, world: &dyn WorldView) {
        dispatch!(self, c => c.on_stat_changed(event, world))
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, world: &dyn WorldView) {
        dispatch!(self, c => c.on_item_container_changed(event, world))
    }

    fn on_npc_killed(&mut self, event: &NpcKilled, world: &dyn WorldView) {
        dispatch!(self, c => c.on_npc_killed(event, world))
    }

    fn handle_event(&mut self, event: &GameEvent, world: &dyn WorldView) {
        dispatch!(self, c => c.handle_event(event, world))
    }

    fn total_leaf_count(&self) -> usize {
        dispatch!(self, c => c.total_leaf_count())
    }

    fn met_leaf_count(&self) -> usize {
        dispatch!(self, c => c.met_leaf_count())
    }

    fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        dispatch!(self, c => c.next_trigger_time())
    }

    fn status_info(&self, indent: usize, show_progress: bool) -> String {
        dispatch!(self, c => c.status_info(indent, show_progress))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::testing::{rng, world};
    use crate::runtime::skill::Skill;

    #[test]
    fn test_node_reports_inner_kind() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let node: ConditionNode = SkillXpCondition::new(Skill::Attack, 10, &mut ctx).into();
        assert_eq!(node.kind(), ConditionKind::SkillXp);
        assert!(node.children().is_empty());

        let not: ConditionNode = NotCondition::new(node).into();
        assert_eq!(not.kind(), ConditionKind::Not);
        assert_eq!(not.children().len(), 1);
    }

    #[test]
    fn test_nested_locks_are_found() {
        let mut tree: ConditionNode = AndCondition::with(vec![
            LockCondition::new("outer").into(),
            OrCondition::with(vec![NotCondition::new(LockCondition::new("inner")).into()]).into(),
        ])
        .into();
        let reasons: Vec<&str> = tree.lock_conditions().into_iter().map(|l| l.reason()).collect();
        assert_eq!(reasons, vec!["outer", "inner"]);
        assert!(!tree.is_locked());

        tree.lock_conditions_mut()[1].lock();
        assert!(tree.is_locked());
        assert!(tree.contains_kind(ConditionKind::Lock));
    }
}

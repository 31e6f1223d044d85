// SPDX-License-Identifier: MIT

//! AND / OR / NOT combinators.
//!
//! Combinators own their children outright, so a tree can never share a node
//! or form a cycle. Every event is forwarded to every child; only `is_met()`
//! is allowed to short-circuit.

use super::{status_line, Condition, ConditionContext, ConditionKind, ConditionNode};
use crate::runtime::event::{ItemContainerChanged, NpcKilled, StatChanged};
use crate::runtime::world::WorldView;
use chrono::{DateTime, Duration, Local};

/// Shared child handling for AND and OR
mod children {
    use super::*;

    pub fn reset(children: &mut [ConditionNode], ctx: &mut ConditionContext<'_>) {
        for child in children {
            child.reset(ctx);
        }
    }

    pub fn activate(children: &mut [ConditionNode], world: &dyn WorldView) {
        for child in children {
            child.activate(world);
        }
    }

    pub fn deactivate(children: &mut [ConditionNode]) {
        for child in children {
            child.deactivate();
        }
    }

    pub fn resume(children: &mut [ConditionNode], paused_for: Duration, world: &dyn WorldView) {
        for child in children {
            child.resume(paused_for, world);
        }
    }

    pub fn tick(children: &mut [ConditionNode], world: &dyn WorldView) {
        for child in children {
            child.on_game_tick(world);
        }
    }

    pub fn stat(children: &mut [ConditionNode], event: &StatChanged, world: &dyn WorldView) {
        for child in children {
            child.on_stat_changed(event, world);
        }
    }

    pub fn items(
        children: &mut [ConditionNode],
        event: &ItemContainerChanged,
        world: &dyn WorldView,
    ) {
        for child in children {
            child.on_item_container_changed(event, world);
        }
    }

    pub fn npc(children: &mut [ConditionNode], event: &NpcKilled, world: &dyn WorldView) {
        for child in children {
            child.on_npc_killed(event, world);
        }
    }

    pub fn describe(children: &[ConditionNode], prefix: &str, joiner: &str) -> String {
        if children.is_empty() {
            return "No conditions".to_string();
        }
        let parts: Vec<String> = children.iter().map(|c| c.description()).collect();
        format!("{} ({})", prefix, parts.join(joiner))
    }

    pub fn total(children: &[ConditionNode]) -> usize {
        children.iter().map(|c| c.total_leaf_count()).sum()
    }

    pub fn met(children: &[ConditionNode]) -> usize {
        children.iter().map(|c| c.met_leaf_count()).sum()
    }

    pub fn status_info<C: Condition + ?Sized>(
        node: &C,
        children: &[ConditionNode],
        indent: usize,
        show_progress: bool,
    ) -> String {
        let mut text = status_line(
            indent,
            &node.description(),
            node.is_met(),
            show_progress.then(|| node.progress_percentage()),
        );
        text.push_str(&format!(
            " - {}/{} conditions SATISFIED",
            node.met_leaf_count(),
            node.total_leaf_count()
        ));
        for child in children {
            text.push('\n');
            text.push_str(&child.status_info(indent + 2, show_progress));
        }
        text
    }
}

/// Met when every child is met. An empty AND is met.
#[derive(Debug, Clone, Default)]
pub struct AndCondition {
    conditions: Vec<ConditionNode>,
}

impl AndCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(conditions: Vec<ConditionNode>) -> Self {
        Self { conditions }
    }

    pub fn add(&mut self, condition: impl Into<ConditionNode>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn remove(&mut self, index: usize) -> Option<ConditionNode> {
        (index < self.conditions.len()).then(|| self.conditions.remove(index))
    }

    pub fn conditions(&self) -> &[ConditionNode] {
        &self.conditions
    }

    pub fn conditions_mut(&mut self) -> &mut [ConditionNode] {
        &mut self.conditions
    }

    pub fn into_conditions(self) -> Vec<ConditionNode> {
        self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Children that currently keep this AND from being met
    pub fn blocking_conditions(&self) -> Vec<&ConditionNode> {
        self.blocking_conditions_at(Local::now())
    }

    pub fn blocking_conditions_at(&self, now: DateTime<Local>) -> Vec<&ConditionNode> {
        self.conditions.iter().filter(|c| !c.is_met_at(now)).collect()
    }
}

impl Condition for AndCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::And
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        self.conditions.iter().all(|c| c.is_met_at(now))
    }

    fn description(&self) -> String {
        children::describe(&self.conditions, "ALL of:", " AND ")
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        if self.conditions.is_empty() {
            return 100.0;
        }
        let sum: f64 = self
            .conditions
            .iter()
            .map(|c| c.progress_percentage_at(now))
            .sum();
        (sum / self.conditions.len() as f64).clamp(0.0, 100.0)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        children::reset(&mut self.conditions, ctx);
    }

    fn activate(&mut self, world: &dyn WorldView) {
        children::activate(&mut self.conditions, world);
    }

    fn deactivate(&mut self) {
        children::deactivate(&mut self.conditions);
    }

    fn resume(&mut self, paused_for: Duration, world: &dyn WorldView) {
        children::resume(&mut self.conditions, paused_for, world);
    }

    fn on_game_tick(&mut self, world: &dyn WorldView) {
        children::tick(&mut self.conditions, world);
    }

    fn on_stat_changed(&mut self, event: &StatChanged, world: &dyn WorldView) {
        children::stat(&mut self.conditions, event, world);
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, world: &dyn WorldView) {
        children::items(&mut self.conditions, event, world);
    }

    fn on_npc_killed(&mut self, event: &NpcKilled, world: &dyn WorldView) {
        children::npc(&mut self.conditions, event, world);
    }

    fn total_leaf_count(&self) -> usize {
        children::total(&self.conditions)
    }

    fn met_leaf_count(&self) -> usize {
        children::met(&self.conditions)
    }

    /// Latest trigger among children: nothing fires before all of them did
    fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        self.conditions
            .iter()
            .filter_map(|c| c.next_trigger_time())
            .max()
    }

    fn status_info(&self, indent: usize, show_progress: bool) -> String {
        children::status_info(self, &self.conditions, indent, show_progress)
    }
}

/// Met when at least one child is met. An empty OR is never met.
#[derive(Debug, Clone, Default)]
pub struct OrCondition {
    conditions: Vec<ConditionNode>,
}

impl OrCondition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(conditions: Vec<ConditionNode>) -> Self {
        Self { conditions }
    }

    pub fn add(&mut self, condition: impl Into<ConditionNode>) -> &mut Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn remove(&mut self, index: usize) -> Option<ConditionNode> {
        (index < self.conditions.len()).then(|| self.conditions.remove(index))
    }

    pub fn conditions(&self) -> &[ConditionNode] {
        &self.conditions
    }

    pub fn conditions_mut(&mut self) -> &mut [ConditionNode] {
        &mut self.conditions
    }

    pub fn into_conditions(self) -> Vec<ConditionNode> {
        self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// All children while none is met, otherwise nothing blocks
    pub fn blocking_conditions(&self) -> Vec<&ConditionNode> {
        self.blocking_conditions_at(Local::now())
    }

    pub fn blocking_conditions_at(&self, now: DateTime<Local>) -> Vec<&ConditionNode> {
        if self.is_met_at(now) {
            Vec::new()
        } else {
            self.conditions.iter().collect()
        }
    }
}

impl Condition for OrCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Or
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        self.conditions.iter().any(|c| c.is_met_at(now))
    }

    fn description(&self) -> String {
        children::describe(&self.conditions, "ANY of:", " OR ")
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        self.conditions
            .iter()
            .map(|c| c.progress_percentage_at(now))
            .fold(0.0, f64::max)
            .clamp(0.0, 100.0)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        children::reset(&mut self.conditions, ctx);
    }

    fn activate(&mut self, world: &dyn WorldView) {
        children::activate(&mut self.conditions, world);
    }

    fn deactivate(&mut self) {
        children::deactivate(&mut self.conditions);
    }

    fn resume(&mut self, paused_for: Duration, world: &dyn WorldView) {
        children::resume(&mut self.conditions, paused_for, world);
    }

    fn on_game_tick(&mut self, world: &dyn WorldView) {
        children::tick(&mut self.conditions, world);
    }

    fn on_stat_changed(&mut self, event: &StatChanged, world: &dyn WorldView) {
        children::stat(&mut self.conditions, event, world);
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, world: &dyn WorldView) {
        children::items(&mut self.conditions, event, world);
    }

    fn on_npc_killed(&mut self, event: &NpcKilled, world: &dyn WorldView) {
        children::npc(&mut self.conditions, event, world);
    }

    fn total_leaf_count(&self) -> usize {
        children::total(&self.conditions)
    }

    fn met_leaf_count(&self) -> usize {
        children::met(&self.conditions)
    }

    /// Earliest trigger among children
    fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        self.conditions
            .iter()
            .filter_map(|c| c.next_trigger_time())
            .min()
    }

    fn status_info(&self, indent: usize, show_progress: bool) -> String {
        children::status_info(self, &self.conditions, indent, show_progress)
    }
}

/// Inverts a single child. Counts as one leaf unit.
#[derive(Debug, Clone)]
pub struct NotCondition {
    condition: Box<ConditionNode>,
}

impl NotCondition {
    pub fn new(condition: impl Into<ConditionNode>) -> Self {
        Self {
            condition: Box::new(condition.into()),
        }
    }

    pub fn inner(&self) -> &ConditionNode {
        &self.condition
    }

    pub fn inner_mut(&mut self) -> &mut ConditionNode {
        &mut self.condition
    }

    pub fn into_inner(self) -> ConditionNode {
        *self.condition
    }
}

impl Condition for NotCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Not
    }

    fn is_met_at(&self, now: DateTime<Local>) -> bool {
        !self.condition.is_met_at(now)
    }

    fn description(&self) -> String {
        format!("NOT ({})", self.condition.description())
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        (100.0 - self.condition.progress_percentage_at(now)).clamp(0.0, 100.0)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        self.condition.reset(ctx);
    }

    fn activate(&mut self, world: &dyn WorldView) {
        self.condition.activate(world);
    }

    fn deactivate(&mut self) {
        self.condition.deactivate();
    }

    fn resume(&mut self, paused_for: Duration, world: &dyn WorldView) {
        self.condition.resume(paused_for, world);
    }

    fn on_game_tick(&mut self, world: &dyn WorldView) {
        self.condition.on_game_tick(world);
    }

    fn on_stat_changed(&mut self, event: &StatChanged, world: &dyn WorldView) {
        self.condition.on_stat_changed(event, world);
    }

    fn on_item_container_changed(&mut self, event: &ItemContainerChanged, world: &dyn WorldView) {
        self.condition.on_item_container_changed(event, world);
    }

    fn on_npc_killed(&mut self, event: &NpcKilled, world: &dyn WorldView) {
        self.condition.on_npc_killed(event, world);
    }

    fn status_info(&self, indent: usize, show_progress: bool) -> String {
        let own = status_line(
            indent,
            &self.description(),
            self.is_met(),
            show_progress.then(|| self.progress_percentage()),
        );
        format!(
            "{}\n{}",
            own,
            self.condition.status_info(indent + 2, show_progress)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::resource::LootItemCondition;
    use crate::condition::skill::SkillXpCondition;
    use crate::condition::testing::{rng, stack, t0, world};
    use crate::condition::time::FixedEndTimeCondition;
    use crate::runtime::event::GameEvent;
    use crate::runtime::skill::Skill;
    use crate::runtime::world::ContainerId;

    fn past() -> ConditionNode {
        FixedEndTimeCondition::at(t0() - Duration::days(1)).into()
    }

    fn future() -> ConditionNode {
        FixedEndTimeCondition::at(Local::now() + Duration::days(365)).into()
    }

    #[test]
    fn test_empty_combinators() {
        assert!(AndCondition::new().is_met());
        assert_eq!(AndCondition::new().progress_percentage(), 100.0);
        assert!(!OrCondition::new().is_met());
        assert_eq!(OrCondition::new().progress_percentage(), 0.0);
        assert_eq!(AndCondition::new().description(), "No conditions");
        assert_eq!(AndCondition::new().total_leaf_count(), 0);
    }

    #[test]
    fn test_and_or_truth_tables() {
        let and = AndCondition::with(vec![past(), future()]);
        assert!(!and.is_met());
        assert_eq!(and.met_leaf_count(), 1);
        assert_eq!(and.blocking_conditions().len(), 1);

        let or = OrCondition::with(vec![past(), future()]);
        assert!(or.is_met());
        assert!(or.blocking_conditions().is_empty());
    }

    #[test]
    fn test_blocking_conditions_at_pinned_clock() {
        let deadline = || -> ConditionNode { FixedEndTimeCondition::at(t0() + Duration::hours(1)).into() };
        let and = AndCondition::with(vec![past(), deadline()]);
        assert_eq!(and.blocking_conditions_at(t0()).len(), 1);
        assert!(and.blocking_conditions_at(t0() + Duration::hours(1)).is_empty());

        let or = OrCondition::with(vec![deadline(), deadline()]);
        assert_eq!(or.blocking_conditions_at(t0()).len(), 2);
        assert!(or.blocking_conditions_at(t0() + Duration::hours(2)).is_empty());
    }

    #[test]
    fn test_double_negation() {
        for node in [past(), future()] {
            let twice = NotCondition::new(NotCondition::new(node.clone()));
            assert_eq!(twice.is_met(), node.is_met());
        }
        let not = NotCondition::new(past());
        assert!(!not.is_met());
        assert_eq!(not.total_leaf_count(), 1);
        assert_eq!(not.progress_percentage(), 0.0);
    }

    #[test]
    fn test_descriptions() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let loot = LootItemCondition::new("Bones", 3, &mut ctx).unwrap();
        let xp = SkillXpCondition::new(Skill::Prayer, 100, &mut ctx);
        let or = OrCondition::with(vec![loot.clone().into(), xp.clone().into()]);
        assert_eq!(
            or.description(),
            format!("ANY of: ({} OR {})", loot.description(), xp.description())
        );
        let not = NotCondition::new(or);
        assert!(not.description().starts_with("NOT (ANY of: ("));
    }

    #[test]
    fn test_events_reach_every_child() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let first = LootItemCondition::new("Bones", 2, &mut ctx).unwrap();
        let second = LootItemCondition::new("Bones", 2, &mut ctx).unwrap();
        let mut or = OrCondition::with(vec![first.into(), second.into()]);

        or.handle_event(
            &GameEvent::container(ContainerId::Inventory, vec![stack("Bones", 2)]),
            &world,
        );
        assert_eq!(or.met_leaf_count(), 2);
    }

    #[test]
    fn test_progress_aggregation() {
        let world = world();
        let mut rng = rng();
        let mut ctx = ConditionContext::new(&world, &mut rng);
        let mut half = LootItemCondition::new("Bones", 4, &mut ctx).unwrap();
        half.on_item_container_changed(
            &ItemContainerChanged {
                container: ContainerId::Inventory,
                items: vec![stack("Bones", 2)],
            },
            &world,
        );
        let none = LootItemCondition::new("Feather", 4, &mut ctx).unwrap();

        let and = AndCondition::with(vec![half.clone().into(), none.clone().into()]);
        assert_eq!(and.progress_percentage(), 25.0);
        let or = OrCondition::with(vec![half.clone().into(), none.into()]);
        assert_eq!(or.progress_percentage(), 50.0);
        assert_eq!(NotCondition::new(half).progress_percentage(), 50.0);
    }

    #[test]
    fn test_status_info_layout() {
        let and = AndCondition::with(vec![past(), NotCondition::new(past()).into()]);
        let status = and.status_info(0, false);
        let lines: Vec<&str> = status.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("ALL of:"));
        assert!(lines[0].ends_with("[NOT SATISFIED] - 1/2 conditions SATISFIED"));
        assert!(lines[1].starts_with("  Time reached:"));
        assert!(lines[2].starts_with("  NOT (Time reached:"));
        assert!(lines[3].starts_with("    Time reached:"));
    }

    #[test]
    fn test_contains_kind_and_remove() {
        let mut and = AndCondition::with(vec![
            past(),
            NotCondition::new(OrCondition::with(vec![future()])).into(),
        ]);
        assert!(ConditionNode::from(and.clone()).contains_kind(ConditionKind::Or));
        assert!(!ConditionNode::from(and.clone()).contains_kind(ConditionKind::Region));
        assert!(and.remove(5).is_none());
        assert!(and.remove(0).is_some());
        assert_eq!(and.len(), 1);
    }

    #[test]
    fn test_next_trigger_time() {
        let early = t0() - Duration::days(2);
        let late = t0() - Duration::days(1);
        let nodes = vec![
            FixedEndTimeCondition::at(early).into(),
            FixedEndTimeCondition::at(late).into(),
        ];
        assert_eq!(AndCondition::with(nodes.clone()).next_trigger_time(), Some(late));
        assert_eq!(OrCondition::with(nodes).next_trigger_time(), Some(early));
    }
}

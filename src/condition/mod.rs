// SPDX-License-Identifier: MIT

//! Composable trigger conditions
//!
//! A condition tree is built from leaves (time, skill, location, resource, npc)
//! combined with AND / OR / NOT. Trees are driven by [`GameEvent`]s and asked
//! `is_met()` at any time; `is_met()` never does I/O, it only reads state the
//! event callbacks already folded in.

pub mod kind;
pub mod location;
pub mod lock;
pub mod logical;
pub mod manager;
pub mod node;
pub mod npc;
pub mod registry;
pub mod resource;
pub mod serialization;
pub mod skill;
pub mod target;
pub mod time;

#[cfg(test)]
pub(crate) mod testing;

pub use kind::{ConditionCategory, ConditionKind};
pub use lock::LockCondition;
pub use logical::{AndCondition, NotCondition, OrCondition};
pub use manager::{ConditionManager, ConditionService};
pub use node::ConditionNode;
pub use registry::{EventBus, SubscriptionId};
pub use target::TargetRange;

use crate::runtime::event::{GameEvent, ItemContainerChanged, NpcKilled, StatChanged};
use crate::runtime::world::WorldView;
use chrono::{DateTime, Duration, Local};
use rand::RngCore;

/// Everything a condition needs to capture baselines and roll targets.
///
/// Passed to leaf constructors and to `reset()`.
pub struct ConditionContext<'a> {
    pub world: &'a dyn WorldView,
    pub rng: &'a mut dyn RngCore,
    pub now: DateTime<Local>,
    /// Re-roll randomized targets on reset
    pub randomize: bool,
}

impl<'a> ConditionContext<'a> {
    pub fn new(world: &'a dyn WorldView, rng: &'a mut dyn RngCore) -> Self {
        Self {
            world,
            rng,
            now: Local::now(),
            randomize: false,
        }
    }

    pub fn at(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    pub fn randomizing(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }
}

/// Common capability of every node in a condition tree.
///
/// Event callbacks default to no-ops so leaves only implement what they
/// listen to. Combinators override all of them and forward to every child.
pub trait Condition {
    fn kind(&self) -> ConditionKind;

    /// Whether the condition holds at `now`. Leaves that are not time based
    /// ignore the argument.
    fn is_met_at(&self, now: DateTime<Local>) -> bool;

    fn is_met(&self) -> bool {
        self.is_met_at(Local::now())
    }

    fn description(&self) -> String;

    /// Progress towards being met, in `[0, 100]`
    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        if self.is_met_at(now) {
            100.0
        } else {
            0.0
        }
    }

    fn progress_percentage(&self) -> f64 {
        self.progress_percentage_at(Local::now())
    }

    /// Re-capture baselines and clear counters, keeping the tree shape.
    fn reset(&mut self, ctx: &mut ConditionContext<'_>);

    /// Start following the world. Conditions with cached state prime it here.
    fn activate(&mut self, _world: &dyn WorldView) {}

    fn deactivate(&mut self) {}

    /// Called when the owning manager resumes after a pause of `paused_for`.
    fn resume(&mut self, _paused_for: Duration, _world: &dyn WorldView) {}

    fn on_game_tick(&mut self, _world: &dyn WorldView) {}

    fn on_stat_changed(&mut self, _event: &StatChanged, _world: &dyn WorldView) {}

    fn on_item_container_changed(
        &mut self,
        _event: &ItemContainerChanged,
        _world: &dyn WorldView,
    ) {
    }

    fn on_npc_killed(&mut self, _event: &NpcKilled, _world: &dyn WorldView) {}

    fn handle_event(&mut self, event: &GameEvent, world: &dyn WorldView) {
        match event {
            GameEvent::Tick => self.on_game_tick(world),
            GameEvent::StatChanged(stat) => self.on_stat_changed(stat, world),
            GameEvent::ItemContainerChanged(change) => {
                self.on_item_container_changed(change, world)
            }
            GameEvent::NpcKilled(kill) => self.on_npc_killed(kill, world),
        }
    }

    /// Number of leaf units below this node
    fn total_leaf_count(&self) -> usize {
        1
    }

    fn met_leaf_count(&self) -> usize {
        usize::from(self.is_met())
    }

    /// Next moment a time based condition flips, if it has one
    fn next_trigger_time(&self) -> Option<DateTime<Local>> {
        None
    }

    /// One status line, indented by `indent` spaces
    fn status_info(&self, indent: usize, show_progress: bool) -> String {
        status_line(
            indent,
            &self.description(),
            self.is_met(),
            show_progress.then(|| self.progress_percentage()),
        )
    }
}

pub(crate) fn status_line(
    indent: usize,
    description: &str,
    met: bool,
    progress: Option<f64>,
) -> String {
    let mut line = format!(
        "{}{} [{}]",
        " ".repeat(indent),
        description,
        if met { "SATISFIED" } else { "NOT SATISFIED" }
    );
    if let Some(progress) = progress {
        if progress > 0.0 && progress < 100.0 {
            line.push_str(&format!(" ({:.1}%)", progress));
        }
    }
    line
}

/// Share of `done` over `target` as a percentage, clamped to `[0, 100]`.
/// A non-positive target counts as done.
pub(crate) fn percent(done: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 100.0;
    }
    (done / target * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_hides_trivial_progress() {
        assert_eq!(
            status_line(2, "Gain 10 Attack XP", false, Some(0.0)),
            "  Gain 10 Attack XP [NOT SATISFIED]"
        );
        assert_eq!(
            status_line(0, "Gain 10 Attack XP", false, Some(37.5)),
            "Gain 10 Attack XP [NOT SATISFIED] (37.5%)"
        );
        assert_eq!(
            status_line(0, "Gain 10 Attack XP", true, Some(100.0)),
            "Gain 10 Attack XP [SATISFIED]"
        );
    }

    #[test]
    fn test_percent_clamps() {
        assert_eq!(percent(5.0, 10.0), 50.0);
        assert_eq!(percent(50.0, 10.0), 100.0);
        assert_eq!(percent(1.0, 0.0), 100.0);
    }
}

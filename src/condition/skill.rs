// SPDX-License-Identifier: MIT

//! Skill progress conditions.
//!
//! Both leaves capture a baseline from the world when built. When the world
//! cannot answer yet (logged out) the first stat event for the skill becomes
//! the baseline instead.

use super::{percent, Condition, ConditionContext, ConditionKind, TargetRange};
use crate::runtime::event::StatChanged;
use crate::runtime::skill::Skill;
use crate::runtime::world::WorldView;
use chrono::{DateTime, Local};

fn read_level(world: &dyn WorldView, skill: Skill) -> Option<u32> {
    world
        .skill_level(skill)
        .map_err(|e| log::warn!("Cannot read {} level: {}", skill, e))
        .ok()
}

/// Level targets beyond `u32` saturate
fn level_target(rolled: u64) -> u32 {
    u32::try_from(rolled).unwrap_or(u32::MAX)
}

fn read_xp(world: &dyn WorldView, skill: Skill) -> Option<u64> {
    world
        .skill_xp(skill)
        .map_err(|e| log::warn!("Cannot read {} xp: {}", skill, e))
        .ok()
}

/// Met when the skill's level reaches an absolute target level.
#[derive(Debug, Clone)]
pub struct SkillLevelCondition {
    skill: Skill,
    target_range: TargetRange,
    target_level: u32,
    start_level: Option<u32>,
    current_level: Option<u32>,
}

impl SkillLevelCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(skill: Skill, target_level: u32, ctx: &mut ConditionContext<'_>) -> Self {
        Self::randomized(skill, TargetRange::fixed(target_level as u64), ctx)
    }

    /// Target level drawn once from `range`
    pub fn randomized(skill: Skill, range: TargetRange, ctx: &mut ConditionContext<'_>) -> Self {
        let target_level = level_target(range.resolve(ctx.rng));
        Self::restore(skill, range, target_level, ctx.world)
    }

    pub(crate) fn restore(
        skill: Skill,
        target_range: TargetRange,
        target_level: u32,
        world: &dyn WorldView,
    ) -> Self {
        let start_level = read_level(world, skill);
        Self {
            skill,
            target_range,
            target_level,
            start_level,
            current_level: start_level,
        }
    }

    pub fn skill(&self) -> Skill {
        self.skill
    }

    pub fn target_range(&self) -> TargetRange {
        self.target_range
    }

    pub fn target_level(&self) -> u32 {
        self.target_level
    }

    pub fn start_level(&self) -> Option<u32> {
        self.start_level
    }

    pub fn current_level(&self) -> Option<u32> {
        self.current_level
    }

    fn observe(&mut self, level: u32) {
        if self.start_level.is_none() {
            self.start_level = Some(level);
        }
        self.current_level = Some(level);
    }
}

impl Condition for SkillLevelCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::SkillLevel
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.current_level
            .is_some_and(|level| level >= self.target_level)
    }

    fn description(&self) -> String {
        let mut text = format!("Reach level {} {}", self.target_level, self.skill);
        if self.target_range.is_randomized() {
            text.push_str(&format!(" (randomized {})", self.target_range));
        }
        if let Some(level) = self.current_level {
            text.push_str(&format!(" (current {})", level));
        }
        text
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        if self.is_met_at(now) {
            return 100.0;
        }
        match (self.start_level, self.current_level) {
            (Some(start), Some(current)) if start < self.target_level => percent(
                current.saturating_sub(start) as f64,
                (self.target_level - start) as f64,
            ),
            _ => 0.0,
        }
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if ctx.randomize {
            self.target_level = level_target(self.target_range.resolve(ctx.rng));
        }
        self.start_level = read_level(ctx.world, self.skill);
        self.current_level = self.start_level;
    }

    fn on_stat_changed(&mut self, event: &StatChanged, world: &dyn WorldView) {
        if self.skill.is_overall() {
            if let Some(level) = read_level(world, Skill::Overall) {
                self.observe(level);
            }
        } else if event.skill == self.skill {
            self.observe(event.level);
        }
    }
}

/// How an xp target is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XpMode {
    /// Target is xp gained since the baseline
    #[default]
    Relative,
    /// Target is a total xp value
    Absolute,
}

/// Met when enough experience has been gained in a skill.
#[derive(Debug, Clone)]
pub struct SkillXpCondition {
    skill: Skill,
    mode: XpMode,
    target_range: TargetRange,
    target_xp: u64,
    start_xp: Option<u64>,
    current_xp: Option<u64>,
}

impl SkillXpCondition {
    pub const VERSION: &'static str = "0.0.1";

    /// Gain `target_xp` experience from now on
    pub fn new(skill: Skill, target_xp: u64, ctx: &mut ConditionContext<'_>) -> Self {
        Self::randomized(skill, TargetRange::fixed(target_xp), ctx)
    }

    pub fn randomized(skill: Skill, range: TargetRange, ctx: &mut ConditionContext<'_>) -> Self {
        let target_xp = range.resolve(ctx.rng);
        Self::restore(skill, XpMode::Relative, range, target_xp, ctx.world)
    }

    /// Reach a total of `total_xp` experience
    pub fn absolute(skill: Skill, total_xp: u64, ctx: &mut ConditionContext<'_>) -> Self {
        Self::restore(
            skill,
            XpMode::Absolute,
            TargetRange::fixed(total_xp),
            total_xp,
            ctx.world,
        )
    }

    pub(crate) fn restore(
        skill: Skill,
        mode: XpMode,
        target_range: TargetRange,
        target_xp: u64,
        world: &dyn WorldView,
    ) -> Self {
        let start_xp = read_xp(world, skill);
        Self {
            skill,
            mode,
            target_range,
            target_xp,
            start_xp,
            current_xp: start_xp,
        }
    }

    pub fn skill(&self) -> Skill {
        self.skill
    }

    pub fn mode(&self) -> XpMode {
        self.mode
    }

    pub fn target_range(&self) -> TargetRange {
        self.target_range
    }

    pub fn target_xp(&self) -> u64 {
        self.target_xp
    }

    pub fn start_xp(&self) -> Option<u64> {
        self.start_xp
    }

    pub fn current_xp(&self) -> Option<u64> {
        self.current_xp
    }

    pub fn xp_gained(&self) -> u64 {
        match (self.start_xp, self.current_xp) {
            (Some(start), Some(current)) => current.saturating_sub(start),
            _ => 0,
        }
    }

    fn observe(&mut self, xp: u64) {
        if self.start_xp.is_none() {
            self.start_xp = Some(xp);
        }
        self.current_xp = Some(xp);
    }
}

impl Condition for SkillXpCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::SkillXp
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        match self.mode {
            XpMode::Relative => self.start_xp.is_some() && self.xp_gained() >= self.target_xp,
            XpMode::Absolute => self.current_xp.is_some_and(|xp| xp >= self.target_xp),
        }
    }

    fn description(&self) -> String {
        match self.mode {
            XpMode::Relative => {
                let mut text = format!("Gain {} {} XP", self.target_xp, self.skill);
                if self.target_range.is_randomized() {
                    text.push_str(&format!(" (randomized {})", self.target_range));
                }
                text.push_str(&format!(" (gained {})", self.xp_gained()));
                text
            }
            XpMode::Absolute => format!("Reach {} {} XP", self.target_xp, self.skill),
        }
    }

    fn progress_percentage_at(&self, now: DateTime<Local>) -> f64 {
        if self.is_met_at(now) {
            return 100.0;
        }
        match self.mode {
            XpMode::Relative => percent(self.xp_gained() as f64, self.target_xp as f64),
            XpMode::Absolute => match self.start_xp {
                Some(start) if start < self.target_xp => percent(
                    self.xp_gained() as f64,
                    (self.target_xp - start) as f64,
                ),
                _ => 0.0,
            },
        }
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if ctx.randomize && self.mode == XpMode::Relative {
            self.target_xp = self.target_range.resolve(ctx.rng);
        }
        self.start_xp = read_xp(ctx.world, self.skill);
        self.current_xp = self.start_xp;
    }

    fn on_stat_changed(&mut self, event: &StatChanged, world: &dyn WorldView) {
        if self.skill.is_overall() {
            if let Some(xp) = read_xp(world, Skill::Overall) {
                self.observe(xp);
            }
        } else if event.skill == self.skill {
            self.observe(event.xp);
        }
    }
}

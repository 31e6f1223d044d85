// SPDX-License-Identifier: MIT

//! Spatial conditions.
//!
//! Each leaf caches its last answer. `activate()` computes the first value
//! and turns on per-tick refreshes; `is_met()` only reads the cache.

use super::{Condition, ConditionContext, ConditionKind};
use crate::runtime::world::{WorldPoint, WorldView};
use chrono::{DateTime, Local};

/// Cached boolean shared by the spatial leaves
#[derive(Debug, Clone, Copy, Default)]
struct LocationCache {
    met: bool,
    active: bool,
}

impl LocationCache {
    fn refresh<F>(&mut self, world: &dyn WorldView, name: &str, test: F)
    where
        F: Fn(&WorldPoint) -> bool,
    {
        self.met = match world.player_location() {
            Ok(point) => test(&point),
            Err(e) => {
                log::warn!("Location check '{}' skipped: {}", name, e);
                false
            }
        };
    }
}

/// Met within `max_distance` tiles (Chebyshev) of a point on the same plane.
#[derive(Debug, Clone)]
pub struct PositionCondition {
    name: String,
    target: WorldPoint,
    max_distance: u32,
    cache: LocationCache,
}

impl PositionCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(name: impl Into<String>, target: WorldPoint, max_distance: u32) -> Self {
        Self {
            name: name.into(),
            target,
            max_distance,
            cache: LocationCache::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> WorldPoint {
        self.target
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    pub fn contains(&self, point: &WorldPoint) -> bool {
        self.target
            .distance_to(point)
            .is_some_and(|d| d <= self.max_distance)
    }

    fn refresh(&mut self, world: &dyn WorldView) {
        let (target, max) = (self.target, self.max_distance);
        self.cache.refresh(world, &self.name, |p| {
            target.distance_to(p).is_some_and(|d| d <= max)
        });
    }
}

impl Condition for PositionCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Position
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.cache.met
    }

    fn description(&self) -> String {
        format!(
            "Within {} tiles of {} {}",
            self.max_distance, self.name, self.target
        )
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if self.cache.active {
            self.refresh(ctx.world);
        }
    }

    fn activate(&mut self, world: &dyn WorldView) {
        self.cache.active = true;
        self.refresh(world);
    }

    fn deactivate(&mut self) {
        self.cache.active = false;
    }

    fn on_game_tick(&mut self, world: &dyn WorldView) {
        if self.cache.active {
            self.refresh(world);
        }
    }
}

/// Met inside an inclusive rectangle on one plane.
#[derive(Debug, Clone)]
pub struct AreaCondition {
    name: String,
    min: WorldPoint,
    max: WorldPoint,
    cache: LocationCache,
}

impl AreaCondition {
    pub const VERSION: &'static str = "0.0.1";

    /// Rectangle spanned by two opposite corners, in any order. The plane of
    /// the first corner is used.
    pub fn new(name: impl Into<String>, corner_a: WorldPoint, corner_b: WorldPoint) -> Self {
        let plane = corner_a.plane;
        Self {
            name: name.into(),
            min: WorldPoint::new(corner_a.x.min(corner_b.x), corner_a.y.min(corner_b.y), plane),
            max: WorldPoint::new(corner_a.x.max(corner_b.x), corner_a.y.max(corner_b.y), plane),
            cache: LocationCache::default(),
        }
    }

    /// Rectangle with its south-west corner at `(x, y)`
    pub fn from_rect(
        name: impl Into<String>,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        plane: i32,
    ) -> Self {
        // Far edges clamp at the coordinate limit
        let span = |extent: u32| i32::try_from(extent.max(1) - 1).unwrap_or(i32::MAX);
        Self::new(
            name,
            WorldPoint::new(x, y, plane),
            WorldPoint::new(
                x.saturating_add(span(width)),
                y.saturating_add(span(height)),
                plane,
            ),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_corner(&self) -> WorldPoint {
        self.min
    }

    pub fn max_corner(&self) -> WorldPoint {
        self.max
    }

    pub fn width(&self) -> u32 {
        self.min.x.abs_diff(self.max.x).saturating_add(1)
    }

    pub fn height(&self) -> u32 {
        self.min.y.abs_diff(self.max.y).saturating_add(1)
    }

    pub fn contains(&self, point: &WorldPoint) -> bool {
        area_contains(self.min, self.max, point)
    }

    fn refresh(&mut self, world: &dyn WorldView) {
        let (min, max) = (self.min, self.max);
        self.cache
            .refresh(world, &self.name, |p| area_contains(min, max, p));
    }
}

fn area_contains(min: WorldPoint, max: WorldPoint, point: &WorldPoint) -> bool {
    point.plane == min.plane
        && (min.x..=max.x).contains(&point.x)
        && (min.y..=max.y).contains(&point.y)
}

impl Condition for AreaCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Area
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.cache.met
    }

    fn description(&self) -> String {
        format!("Inside area {} {} to {}", self.name, self.min, self.max)
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if self.cache.active {
            self.refresh(ctx.world);
        }
    }

    fn activate(&mut self, world: &dyn WorldView) {
        self.cache.active = true;
        self.refresh(world);
    }

    fn deactivate(&mut self) {
        self.cache.active = false;
    }

    fn on_game_tick(&mut self, world: &dyn WorldView) {
        if self.cache.active {
            self.refresh(world);
        }
    }
}

/// Met while the player stands in one of the listed 64x64 map regions.
#[derive(Debug, Clone)]
pub struct RegionCondition {
    name: String,
    region_ids: Vec<i32>,
    cache: LocationCache,
}

impl RegionCondition {
    pub const VERSION: &'static str = "0.0.1";

    pub fn new(name: impl Into<String>, region_ids: impl IntoIterator<Item = i32>) -> Self {
        let mut ids: Vec<i32> = region_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        Self {
            name: name.into(),
            region_ids: ids,
            cache: LocationCache::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region_ids(&self) -> &[i32] {
        &self.region_ids
    }

    pub fn contains(&self, point: &WorldPoint) -> bool {
        self.region_ids.binary_search(&point.region_id()).is_ok()
    }

    fn refresh(&mut self, world: &dyn WorldView) {
        let ids = &self.region_ids;
        self.cache.refresh(world, &self.name, |p| {
            ids.binary_search(&p.region_id()).is_ok()
        });
    }
}

impl Condition for RegionCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Region
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        self.cache.met
    }

    fn description(&self) -> String {
        let ids: Vec<String> = self.region_ids.iter().map(|id| id.to_string()).collect();
        format!("In region {} [{}]", self.name, ids.join(", "))
    }

    fn reset(&mut self, ctx: &mut ConditionContext<'_>) {
        if self.cache.active {
            self.refresh(ctx.world);
        }
    }

    fn activate(&mut self, world: &dyn WorldView) {
        self.cache.active = true;
        self.refresh(world);
    }

    fn deactivate(&mut self) {
        self.cache.active = false;
    }

    fn on_game_tick(&mut self, world: &dyn WorldView) {
        if self.cache.active {
            self.refresh(world);
        }
    }
}

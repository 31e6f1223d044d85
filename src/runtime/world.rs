// SPDX-License-Identifier: MIT

//! Read-only view of the game world.
//!
//! Conditions never talk to the client directly; they query a `WorldView`
//! when capturing baselines and when reacting to events.

use super::error::WorldQueryError;
use super::event::GameEvent;
use super::skill::Skill;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

/// A tile in the world. Plane is the floor level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldPoint {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub plane: i32,
}

impl WorldPoint {
    pub fn new(x: i32, y: i32, plane: i32) -> Self {
        Self { x, y, plane }
    }

    /// Chebyshev (tile) distance, or `None` when the planes differ.
    pub fn distance_to(&self, other: &WorldPoint) -> Option<u32> {
        if self.plane != other.plane {
            return None;
        }
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        Some(dx.max(dy))
    }

    /// 64x64 map region containing this tile.
    pub fn region_id(&self) -> i32 {
        ((self.x >> 6) << 8) | (self.y >> 6)
    }
}

impl fmt::Display for WorldPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.plane)
    }
}

/// One stack of items inside a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: u32,
    pub name: String,
    pub quantity: u64,
    #[serde(default)]
    pub noted: bool,
}

impl ItemStack {
    pub fn new(id: u32, name: impl Into<String>, quantity: u64) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            noted: false,
        }
    }

    pub fn noted(mut self) -> Self {
        self.noted = true;
        self
    }
}

/// Item containers the engine knows how to watch.
///
/// Persisted as a plain string (`"inventory"`, `"bank"`, `"other:93"`) so it
/// can be used as a map key in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContainerId {
    Inventory,
    Bank,
    Equipment,
    Other(u32),
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerId::Inventory => f.write_str("inventory"),
            ContainerId::Bank => f.write_str("bank"),
            ContainerId::Equipment => f.write_str("equipment"),
            ContainerId::Other(id) => write!(f, "other:{}", id),
        }
    }
}

impl FromStr for ContainerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inventory" => Ok(ContainerId::Inventory),
            "bank" => Ok(ContainerId::Bank),
            "equipment" => Ok(ContainerId::Equipment),
            other => other
                .strip_prefix("other:")
                .and_then(|id| id.parse().ok())
                .map(ContainerId::Other)
                .ok_or_else(|| format!("Unknown container: {}", s)),
        }
    }
}

impl TryFrom<String> for ContainerId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ContainerId> for String {
    fn from(value: ContainerId) -> Self {
        value.to_string()
    }
}

/// Oracle over the current world state.
///
/// Every query may fail (logged out, data not loaded yet); callers decide how
/// to degrade.
pub trait WorldView: Send + Sync {
    fn player_location(&self) -> Result<WorldPoint, WorldQueryError>;

    fn skill_level(&self, skill: Skill) -> Result<u32, WorldQueryError>;

    fn skill_xp(&self, skill: Skill) -> Result<u64, WorldQueryError>;

    fn container_items(&self, container: ContainerId) -> Result<Vec<ItemStack>, WorldQueryError>;
}

/// Level and experience of a single skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkillState {
    pub level: u32,
    pub xp: u64,
}

/// Serializable picture of the world, used to seed a [`SnapshotWorld`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub location: Option<WorldPoint>,
    #[serde(default)]
    pub skills: HashMap<Skill, SkillState>,
    #[serde(default)]
    pub containers: HashMap<ContainerId, Vec<ItemStack>>,
}

/// In-memory `WorldView` that can follow a stream of events.
///
/// Used by the replay tooling and by tests; a live client integration would
/// implement `WorldView` directly.
#[derive(Debug, Default)]
pub struct SnapshotWorld {
    state: RwLock<WorldSnapshot>,
}

impl SnapshotWorld {
    pub fn new(snapshot: WorldSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.read().clone()
    }

    pub fn set_location(&self, location: Option<WorldPoint>) {
        self.write().location = location;
    }

    pub fn set_skill(&self, skill: Skill, level: u32, xp: u64) {
        self.write().skills.insert(skill, SkillState { level, xp });
    }

    pub fn set_container(&self, container: ContainerId, items: Vec<ItemStack>) {
        self.write().containers.insert(container, items);
    }

    /// Fold an event into the snapshot so later queries agree with it.
    pub fn apply(&self, event: &GameEvent) {
        match event {
            GameEvent::Tick | GameEvent::NpcKilled(_) => {}
            GameEvent::StatChanged(stat) => self.set_skill(stat.skill, stat.level, stat.xp),
            GameEvent::ItemContainerChanged(change) => {
                self.set_container(change.container, change.items.clone())
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, WorldSnapshot> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, WorldSnapshot> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn overall(&self) -> Option<SkillState> {
        let state = self.read();
        if let Some(explicit) = state.skills.get(&Skill::Overall) {
            return Some(*explicit);
        }
        let trained: Vec<&SkillState> = state
            .skills
            .iter()
            .filter(|(skill, _)| !skill.is_overall())
            .map(|(_, s)| s)
            .collect();
        if trained.is_empty() {
            return None;
        }
        Some(SkillState {
            level: trained.iter().map(|s| s.level).sum(),
            xp: trained.iter().map(|s| s.xp).sum(),
        })
    }

    fn skill_state(&self, skill: Skill) -> Result<SkillState, WorldQueryError> {
        let found = if skill.is_overall() {
            self.overall()
        } else {
            self.read().skills.get(&skill).copied()
        };
        found.ok_or_else(|| WorldQueryError::unavailable(format!("{} skill", skill)))
    }
}

impl WorldView for SnapshotWorld {
    fn player_location(&self) -> Result<WorldPoint, WorldQueryError> {
        self.read().location.ok_or(WorldQueryError::NotLoggedIn)
    }

    fn skill_level(&self, skill: Skill) -> Result<u32, WorldQueryError> {
        self.skill_state(skill).map(|s| s.level)
    }

    fn skill_xp(&self, skill: Skill) -> Result<u64, WorldQueryError> {
        self.skill_state(skill).map(|s| s.xp)
    }

    fn container_items(&self, container: ContainerId) -> Result<Vec<ItemStack>, WorldQueryError> {
        Ok(self
            .read()
            .containers
            .get(&container)
            .cloned()
            .unwrap_or_default())
    }
}

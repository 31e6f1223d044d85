// SPDX-License-Identifier: MIT

//! Events delivered to condition trees.

use super::skill::Skill;
use super::world::{ContainerId, ItemStack};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A skill's level or experience changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatChanged {
    pub skill: Skill,
    pub level: u32,
    pub xp: u64,
}

/// Full new contents of an item container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemContainerChanged {
    pub container: ContainerId,
    #[serde(default)]
    pub items: Vec<ItemStack>,
}

/// An NPC the player fought died
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcKilled {
    pub name: String,
}

/// Everything a condition can react to.
///
/// Tagged as `{"type": "stat_changed", ...}` in event logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    Tick,
    StatChanged(StatChanged),
    ItemContainerChanged(ItemContainerChanged),
    NpcKilled(NpcKilled),
}

impl GameEvent {
    pub fn stat(skill: Skill, level: u32, xp: u64) -> Self {
        Self::StatChanged(StatChanged { skill, level, xp })
    }

    pub fn container(container: ContainerId, items: Vec<ItemStack>) -> Self {
        Self::ItemContainerChanged(ItemContainerChanged { container, items })
    }

    pub fn npc_killed(name: impl Into<String>) -> Self {
        Self::NpcKilled(NpcKilled { name: name.into() })
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Tick => "tick",
            GameEvent::StatChanged(_) => "stat_changed",
            GameEvent::ItemContainerChanged(_) => "item_container_changed",
            GameEvent::NpcKilled(_) => "npc_killed",
        }
    }
}

/// Receiver side of the [`EventBus`](crate::condition::registry::EventBus).
///
/// Delivery is sequential; implementations must not block.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn deliver(&self, event: &GameEvent);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_log_format() {
        let event: GameEvent = serde_json::from_value(json!({
            "type": "item_container_changed",
            "container": "inventory",
            "items": [{"id": 21490, "name": "Seaweed spore", "quantity": 2}]
        }))
        .unwrap();
        assert_eq!(
            event,
            GameEvent::container(
                ContainerId::Inventory,
                vec![ItemStack::new(21490, "Seaweed spore", 2)]
            )
        );

        let tick: GameEvent = serde_json::from_value(json!({"type": "tick"})).unwrap();
        assert_eq!(tick, GameEvent::Tick);

        let kill: GameEvent =
            serde_json::from_value(json!({"type": "npc_killed", "name": "Goblin"})).unwrap();
        assert_eq!(kill, GameEvent::npc_killed("Goblin"));
        assert_eq!(kill.name(), "npc_killed");
    }

    #[test]
    fn test_stat_event_serializes_tagged() {
        let value = serde_json::to_value(GameEvent::stat(Skill::Attack, 70, 737_627)).unwrap();
        assert_eq!(
            value,
            json!({"type": "stat_changed", "skill": "ATTACK", "level": 70, "xp": 737627})
        );
    }
}

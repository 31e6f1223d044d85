// SPDX-License-Identifier: MIT

//! Everything conditions depend on from the outside: the world oracle, the
//! event model, configuration and error types.

pub mod config;
pub mod error;
pub mod event;
pub mod skill;
pub mod world;

pub use config::{EngineConfig, VersionPolicy};
pub use error::{ConditionError, SerializationError, TriggerError, WorldQueryError};
pub use event::{EventSink, GameEvent, ItemContainerChanged, NpcKilled, StatChanged};
pub use skill::Skill;
pub use world::{ContainerId, ItemStack, SnapshotWorld, WorldPoint, WorldSnapshot, WorldView};

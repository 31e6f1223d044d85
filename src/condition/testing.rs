// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests.

use crate::runtime::skill::Skill;
use crate::runtime::world::{ContainerId, ItemStack, SnapshotWorld, WorldPoint};
use chrono::{DateTime, Local, TimeZone};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub(crate) fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(0x5eed)
}

/// A Monday at noon, away from any DST transition
pub(crate) fn t0() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
        .single()
        .expect("unambiguous local time")
}

pub(crate) fn world() -> SnapshotWorld {
    let world = SnapshotWorld::default();
    world.set_location(Some(WorldPoint::new(3222, 3218, 0)));
    world.set_skill(Skill::Attack, 60, 273_742);
    world.set_skill(Skill::Fishing, 40, 37_224);
    world.set_container(ContainerId::Inventory, Vec::new());
    world
}

pub(crate) fn stack(name: &str, quantity: u64) -> ItemStack {
    let id = name.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    ItemStack::new(id, name, quantity)
}

// SPDX-License-Identifier: MIT

use super::{Condition, ConditionContext, ConditionKind};
use chrono::{DateTime, Local};

/// Manual gate: met while unlocked.
///
/// A script locks it around work that must not be interrupted, so a stop
/// tree containing it cannot fire until the lock is released. The lock
/// state belongs to the running session; only the reason is persisted and a
/// loaded lock always starts unlocked.
#[derive(Debug, Clone, Default)]
pub struct LockCondition {
    reason: String,
    locked: bool,
}

impl LockCondition {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            locked: false,
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        if !self.locked {
            log::debug!("Locked: {}", self.reason);
        }
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        if self.locked {
            log::debug!("Unlocked: {}", self.reason);
        }
        self.locked = false;
    }

    /// Flip the lock, returning the new state
    pub fn toggle(&mut self) -> bool {
        if self.locked {
            self.unlock();
        } else {
            self.lock();
        }
        self.locked
    }
}

impl Condition for LockCondition {
    fn kind(&self) -> ConditionKind {
        ConditionKind::Lock
    }

    fn is_met_at(&self, _now: DateTime<Local>) -> bool {
        !self.locked
    }

    fn description(&self) -> String {
        format!(
            "Lock: {} ({})",
            self.reason,
            if self.locked { "LOCKED" } else { "UNLOCKED" }
        )
    }

    // Locks are released explicitly, never by a reset
    fn reset(&mut self, _ctx: &mut ConditionContext<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::testing::{rng, world};

    #[test]
    fn test_met_only_while_unlocked() {
        let mut lock = LockCondition::new("banking");
        assert!(lock.is_met());
        lock.lock();
        assert!(!lock.is_met());
        assert_eq!(lock.description(), "Lock: banking (LOCKED)");
        lock.unlock();
        assert!(lock.is_met());
    }

    #[test]
    fn test_toggle_and_reset() {
        let world = world();
        let mut rng = rng();
        let mut lock = LockCondition::new("mid-trip");
        assert!(lock.toggle());
        let mut ctx = ConditionContext::new(&world, &mut rng).randomizing(true);
        lock.reset(&mut ctx);
        assert!(lock.is_locked());
        assert!(!lock.toggle());
        assert_eq!(lock.progress_percentage(), 100.0);
    }
}

// SPDX-License-Identifier: MIT

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive `[min, max]` range a randomized target is drawn from.
///
/// Construction normalizes swapped bounds; `min == max` is a fixed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRange {
    min: u64,
    max: u64,
}

impl TargetRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn fixed(value: u64) -> Self {
        Self::new(value, value)
    }

    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn is_randomized(&self) -> bool {
        self.min != self.max
    }

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Draw a concrete target
    pub fn resolve(&self, rng: &mut dyn RngCore) -> u64 {
        if self.is_randomized() {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

impl From<u64> for TargetRange {
    fn from(value: u64) -> Self {
        Self::fixed(value)
    }
}

impl fmt::Display for TargetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_randomized() {
            write!(f, "{}-{}", self.min, self.max)
        } else {
            write!(f, "{}", self.min)
        }
    }
}

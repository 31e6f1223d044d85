// SPDX-License-Identifier: MIT

//! Item and resource conditions.
//!
//! All counters here are monotonic: they only ever grow until `reset()`.

mod count;
mod loot;
mod process;

pub use count::{BankItemCountCondition, InventoryItemCountCondition};
pub use loot::LootItemCondition;
pub use process::{ProcessItem, ProcessItemCondition, TrackingMode};

use crate::runtime::error::ConditionError;
use crate::runtime::world::{ContainerId, ItemStack, WorldView};
use regex::{Regex, RegexBuilder};
use std::fmt;

/// Case-insensitive name matcher for items and NPCs.
///
/// An empty pattern matches every item. Input that looks like a regular
/// expression (anchored, or using `.*`, `[` or `(`) is compiled as a
/// full-match regex; anything else matches names containing it.
#[derive(Debug, Clone)]
pub struct ItemPattern {
    source: String,
    regex: Regex,
}

impl ItemPattern {
    pub fn new(pattern: &str) -> Result<Self, ConditionError> {
        let source = pattern.trim().to_string();
        let expression = if source.is_empty() {
            ".*".to_string()
        } else if Self::looks_like_regex(&source) {
            source
                .trim_start_matches('^')
                .trim_end_matches('$')
                .to_string()
        } else {
            format!(".*{}.*", regex::escape(&source))
        };
        let regex = RegexBuilder::new(&format!("^(?:{})$", expression))
            .case_insensitive(true)
            .build()
            .map_err(|e| ConditionError::InvalidPattern {
                pattern: source.clone(),
                source: e,
            })?;
        Ok(Self { source, regex })
    }

    fn looks_like_regex(pattern: &str) -> bool {
        pattern.starts_with('^')
            || pattern.ends_with('$')
            || pattern.contains(".*")
            || pattern.contains('[')
            || pattern.contains('(')
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, item_name: &str) -> bool {
        self.regex.is_match(item_name)
    }

    /// Total quantity of matching stacks. Noted stacks count only when asked.
    pub fn count(&self, items: &[ItemStack], include_noted: bool) -> u64 {
        items
            .iter()
            .filter(|item| include_noted || !item.noted)
            .filter(|item| self.matches(&item.name))
            .map(|item| item.quantity)
            .sum()
    }
}

impl fmt::Display for ItemPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            f.write_str("any item")
        } else {
            f.write_str(&self.source)
        }
    }
}

/// Accumulates increases of an observed quantity.
///
/// Decreases only move the baseline, so the total never goes down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonotonicCounter {
    last_seen: Option<u64>,
    total: u64,
}

impl MonotonicCounter {
    pub fn seeded(current: Option<u64>) -> Self {
        Self {
            last_seen: current,
            total: 0,
        }
    }

    /// Fold a new observation in, returning the amount credited
    pub fn observe(&mut self, current: u64) -> u64 {
        let gained = match self.last_seen {
            Some(previous) => current.saturating_sub(previous),
            None => 0,
        };
        self.total += gained;
        self.last_seen = Some(current);
        gained
    }

    /// Move the baseline without crediting the difference
    pub fn rebase(&mut self, current: Option<u64>) {
        self.last_seen = current;
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn last_seen(&self) -> Option<u64> {
        self.last_seen
    }
}

/// Matching quantity currently in `container`, or `None` when the world
/// cannot tell.
pub(crate) fn held_quantity(
    world: &dyn WorldView,
    container: ContainerId,
    pattern: &ItemPattern,
    include_noted: bool,
) -> Option<u64> {
    match world.container_items(container) {
        Ok(items) => Some(pattern.count(&items, include_noted)),
        Err(e) => {
            log::warn!("Cannot read {} contents: {}", container, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::testing::stack;

    #[test]
    fn test_plain_name_is_case_insensitive_contains() {
        let pattern = ItemPattern::new("seaweed spore").unwrap();
        assert!(pattern.matches("Seaweed spore"));
        assert!(pattern.matches("Giant seaweed spore"));
        assert!(!pattern.matches("Seaweed"));
    }

    #[test]
    fn test_plain_name_special_characters_are_literal() {
        let pattern = ItemPattern::new("Prayer potion+").unwrap();
        assert!(pattern.matches("prayer potion+"));
        assert!(!pattern.matches("Prayer potionn"));
    }

    #[test]
    fn test_regex_patterns_match_whole_name() {
        let pattern = ItemPattern::new("^Raw (shrimps|anchovies)$").unwrap();
        assert!(pattern.matches("Raw shrimps"));
        assert!(pattern.matches("raw anchovies"));
        assert!(!pattern.matches("Raw shrimps pie"));

        let wildcard = ItemPattern::new(".*logs").unwrap();
        assert!(wildcard.matches("Oak logs"));
        assert!(!wildcard.matches("Oak logs (u)"));
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let pattern = ItemPattern::new("").unwrap();
        assert!(pattern.matches("Coins"));
        assert_eq!(pattern.to_string(), "any item");
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let err = ItemPattern::new("Rune (").unwrap_err();
        assert!(matches!(err, ConditionError::InvalidPattern { .. }));
    }

    #[test]
    fn test_count_respects_noted_flag() {
        let pattern = ItemPattern::new("Oak logs").unwrap();
        let items = vec![stack("Oak logs", 3), stack("Oak logs", 20).noted(), stack("Logs", 5)];
        assert_eq!(pattern.count(&items, false), 3);
        assert_eq!(pattern.count(&items, true), 23);
    }

    #[test]
    fn test_counter_never_decreases() {
        let mut counter = MonotonicCounter::seeded(Some(2));
        let observations = [3, 1, 0, 4, 4, 10, 2];
        let mut previous_total = 0;
        for value in observations {
            counter.observe(value);
            assert!(counter.total() >= previous_total);
            previous_total = counter.total();
        }
        assert_eq!(counter.total(), 1 + 4 + 6);
    }

    #[test]
    fn test_unseeded_counter_takes_first_observation_as_baseline() {
        let mut counter = MonotonicCounter::seeded(None);
        assert_eq!(counter.observe(7), 0);
        assert_eq!(counter.observe(9), 2);
    }
}

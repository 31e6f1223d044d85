// SPDX-License-Identifier: MIT

//! Closed set of condition kinds, used as the persisted discriminator.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionCategory {
    Logical,
    Time,
    Skill,
    Location,
    Resource,
    Npc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    And,
    Or,
    Not,
    Lock,
    FixedEndTime,
    Interval,
    DayOfWeek,
    TimeWindow,
    SkillLevel,
    SkillXp,
    Position,
    Area,
    Region,
    LootItem,
    InventoryItemCount,
    BankItemCount,
    ProcessItem,
    NpcKillCount,
}

/// Names written by older releases that differ from the current ones
static LEGACY_NAMES: Lazy<HashMap<&'static str, ConditionKind>> = Lazy::new(|| {
    HashMap::from([("SingleTriggerTimeCondition", ConditionKind::FixedEndTime)])
});

impl ConditionKind {
    pub const ALL: [ConditionKind; 18] = [
        ConditionKind::And,
        ConditionKind::Or,
        ConditionKind::Not,
        ConditionKind::Lock,
        ConditionKind::FixedEndTime,
        ConditionKind::Interval,
        ConditionKind::DayOfWeek,
        ConditionKind::TimeWindow,
        ConditionKind::SkillLevel,
        ConditionKind::SkillXp,
        ConditionKind::Position,
        ConditionKind::Area,
        ConditionKind::Region,
        ConditionKind::LootItem,
        ConditionKind::InventoryItemCount,
        ConditionKind::BankItemCount,
        ConditionKind::ProcessItem,
        ConditionKind::NpcKillCount,
    ];

    /// Discriminator written to the `type` field
    pub fn type_name(&self) -> &'static str {
        match self {
            ConditionKind::And => "AndCondition",
            ConditionKind::Or => "OrCondition",
            ConditionKind::Not => "NotCondition",
            ConditionKind::Lock => "LockCondition",
            ConditionKind::FixedEndTime => "FixedEndTimeCondition",
            ConditionKind::Interval => "IntervalCondition",
            ConditionKind::DayOfWeek => "DayOfWeekCondition",
            ConditionKind::TimeWindow => "TimeWindowCondition",
            ConditionKind::SkillLevel => "SkillLevelCondition",
            ConditionKind::SkillXp => "SkillXpCondition",
            ConditionKind::Position => "PositionCondition",
            ConditionKind::Area => "AreaCondition",
            ConditionKind::Region => "RegionCondition",
            ConditionKind::LootItem => "LootItemCondition",
            ConditionKind::InventoryItemCount => "InventoryItemCountCondition",
            ConditionKind::BankItemCount => "BankItemCountCondition",
            ConditionKind::ProcessItem => "ProcessItemCondition",
            ConditionKind::NpcKillCount => "NpcKillCountCondition",
        }
    }

    pub fn category(&self) -> ConditionCategory {
        match self {
            ConditionKind::And | ConditionKind::Or | ConditionKind::Not | ConditionKind::Lock => {
                ConditionCategory::Logical
            }
            ConditionKind::FixedEndTime
            | ConditionKind::Interval
            | ConditionKind::DayOfWeek
            | ConditionKind::TimeWindow => ConditionCategory::Time,
            ConditionKind::SkillLevel | ConditionKind::SkillXp => ConditionCategory::Skill,
            ConditionKind::Position | ConditionKind::Area | ConditionKind::Region => {
                ConditionCategory::Location
            }
            ConditionKind::LootItem
            | ConditionKind::InventoryItemCount
            | ConditionKind::BankItemCount
            | ConditionKind::ProcessItem => ConditionCategory::Resource,
            ConditionKind::NpcKillCount => ConditionCategory::Npc,
        }
    }

    pub fn is_logical(&self) -> bool {
        self.category() == ConditionCategory::Logical
    }

    /// Resolve a discriminator. Fully qualified names are accepted when
    /// their last path segment is exactly a known name.
    pub fn from_type_name(name: &str) -> Option<ConditionKind> {
        let simple = name
            .rsplit(['.', '$'])
            .next()
            .unwrap_or(name)
            .trim();
        ConditionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_name() == simple)
            .or_else(|| LEGACY_NAMES.get(simple).copied())
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for ConditionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConditionKind::from_type_name(s).ok_or_else(|| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for kind in ConditionKind::ALL {
            assert_eq!(ConditionKind::from_type_name(kind.type_name()), Some(kind));
        }
    }

    #[test]
    fn test_qualified_names_match_on_last_segment() {
        assert_eq!(
            ConditionKind::from_type_name("com.example.condition.logical.OrCondition"),
            Some(ConditionKind::Or)
        );
        assert_eq!(
            ConditionKind::from_type_name("com.example.time.SingleTriggerTimeCondition"),
            Some(ConditionKind::FixedEndTime)
        );
    }

    #[test]
    fn test_suffix_match_is_not_enough() {
        assert_eq!(ConditionKind::from_type_name("XOrCondition"), None);
        assert_eq!(ConditionKind::from_type_name("com.example.MyAndCondition"), None);
        assert_eq!(ConditionKind::from_type_name(""), None);
    }

    #[test]
    fn test_categories() {
        assert!(ConditionKind::Not.is_logical());
        assert_eq!(ConditionKind::Region.category(), ConditionCategory::Location);
        assert_eq!(ConditionKind::ProcessItem.category(), ConditionCategory::Resource);
        assert_eq!(ConditionKind::NpcKillCount.category(), ConditionCategory::Npc);
        assert!(ConditionKind::Lock.is_logical());
    }
}

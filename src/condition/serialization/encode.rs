// SPDX-License-Identifier: MIT

use super::{envelope, logical_to_value};
use crate::condition::location::{AreaCondition, PositionCondition, RegionCondition};
use crate::condition::npc::NpcKillCountCondition;
use crate::condition::resource::{
    BankItemCountCondition, InventoryItemCountCondition, LootItemCondition, ProcessItem,
    ProcessItemCondition,
};
use crate::condition::skill::{SkillLevelCondition, SkillXpCondition, XpMode};
use crate::condition::time::{
    DayOfWeekCondition, FixedEndTimeCondition, IntervalCondition, TimeWindowCondition,
};
use crate::condition::{Condition, ConditionKind, ConditionNode, TargetRange};
use chrono::Weekday;
use serde_json::{json, Map, Value};

pub(super) const TIME_FORMAT: &str = "%H:%M:%S";
pub(super) const DATE_FORMAT: &str = "%Y-%m-%d";

pub(super) fn node(node: &ConditionNode) -> Value {
    let data = match node {
        ConditionNode::And(and) => return logical_to_value(ConditionKind::And, and.conditions()),
        ConditionNode::Or(or) => return logical_to_value(ConditionKind::Or, or.conditions()),
        ConditionNode::Not(not) => json!({ "condition": self::node(not.inner()) }),
        ConditionNode::Lock(lock) => json!({ "reason": lock.reason() }),
        ConditionNode::FixedEndTime(c) => fixed_end_time(c),
        ConditionNode::Interval(c) => interval(c),
        ConditionNode::DayOfWeek(c) => day_of_week(c),
        ConditionNode::TimeWindow(c) => time_window(c),
        ConditionNode::SkillLevel(c) => skill_level(c),
        ConditionNode::SkillXp(c) => skill_xp(c),
        ConditionNode::Position(c) => position(c),
        ConditionNode::Area(c) => area(c),
        ConditionNode::Region(c) => region(c),
        ConditionNode::LootItem(c) => loot_item(c),
        ConditionNode::InventoryItemCount(c) => inventory_count(c),
        ConditionNode::BankItemCount(c) => bank_count(c),
        ConditionNode::ProcessItem(c) => process_item(c),
        ConditionNode::NpcKillCount(c) => npc_kill_count(c),
    };
    envelope(node.kind(), data)
}

/// Write `range` as `<prefix>Min` / `<prefix>Max` plus the resolved value
fn put_target(map: &mut Map<String, Value>, prefix: &str, current_key: &str, range: TargetRange, current: u64) {
    map.insert(format!("{}Min", prefix), json!(range.min()));
    map.insert(format!("{}Max", prefix), json!(range.max()));
    map.insert(current_key.to_string(), json!(current));
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn fixed_end_time(c: &FixedEndTimeCondition) -> Value {
    let mut map = object(json!({
        "version": FixedEndTimeCondition::VERSION,
        "targetTimeMillis": c.end().timestamp_millis(),
        "startTimeMillis": c.start().timestamp_millis(),
    }));
    if let Some(range) = c.duration_range() {
        map.insert("durationMinSeconds".into(), json!(range.min()));
        map.insert("durationMaxSeconds".into(), json!(range.max()));
    }
    Value::Object(map)
}

fn interval(c: &IntervalCondition) -> Value {
    json!({
        "version": IntervalCondition::VERSION,
        "intervalSeconds": c.interval().num_seconds(),
        "randomize": c.jitter() > 0.0,
        "randomFactor": c.jitter(),
        "maximumNumberOfRepeats": c.max_repeats(),
        "initialDelaySeconds": c.initial_delay().map(|d| d.num_seconds()),
        "currentTriggerCount": c.trigger_count(),
        "nextTriggerTimeMillis": c.next_trigger_time().map(|t| t.timestamp_millis()),
    })
}

pub(super) fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

fn day_of_week(c: &DayOfWeekCondition) -> Value {
    let days: Vec<&str> = c.active_days().iter().copied().map(weekday_name).collect();
    json!({
        "version": DayOfWeekCondition::VERSION,
        "activeDays": days,
        "maximumNumberOfRepeats": c.max_repeats_per_day(),
    })
}

fn time_window(c: &TimeWindowCondition) -> Value {
    json!({
        "version": TimeWindowCondition::VERSION,
        "startTime": c.start_time().format(TIME_FORMAT).to_string(),
        "endTime": c.end_time().format(TIME_FORMAT).to_string(),
        "startDate": c.start_date().map(|d| d.format(DATE_FORMAT).to_string()),
        "endDate": c.end_date().map(|d| d.format(DATE_FORMAT).to_string()),
    })
}

fn skill_level(c: &SkillLevelCondition) -> Value {
    let mut map = object(json!({
        "version": SkillLevelCondition::VERSION,
        "skill": c.skill(),
        "startLevel": c.start_level(),
    }));
    put_target(&mut map, "targetLevel", "currentTargetLevel", c.target_range(), c.target_level() as u64);
    Value::Object(map)
}

fn skill_xp(c: &SkillXpCondition) -> Value {
    let mut map = object(json!({
        "version": SkillXpCondition::VERSION,
        "skill": c.skill(),
        "startXp": c.start_xp(),
        "absolute": c.mode() == XpMode::Absolute,
    }));
    put_target(&mut map, "targetXp", "currentTargetXp", c.target_range(), c.target_xp());
    Value::Object(map)
}

fn position(c: &PositionCondition) -> Value {
    let target = c.target();
    json!({
        "version": PositionCondition::VERSION,
        "name": c.name(),
        "x": target.x,
        "y": target.y,
        "plane": target.plane,
        "maxDistance": c.max_distance(),
    })
}

fn area(c: &AreaCondition) -> Value {
    let corner = c.min_corner();
    json!({
        "version": AreaCondition::VERSION,
        "name": c.name(),
        "x": corner.x,
        "y": corner.y,
        "width": c.width(),
        "height": c.height(),
        "plane": corner.plane,
    })
}

fn region(c: &RegionCondition) -> Value {
    json!({
        "version": RegionCondition::VERSION,
        "name": c.name(),
        "regionIds": c.region_ids(),
    })
}

fn loot_item(c: &LootItemCondition) -> Value {
    let mut map = object(json!({
        "version": LootItemCondition::VERSION,
        "itemName": c.pattern().as_str(),
        "currentTrackedCount": c.tracked_count(),
        "includeNoted": c.includes_noted(),
        "containers": c.containers(),
    }));
    put_target(&mut map, "targetAmount", "currentTargetAmount", c.target_range(), c.target_amount());
    Value::Object(map)
}

fn inventory_count(c: &InventoryItemCountCondition) -> Value {
    let mut map = object(json!({
        "version": InventoryItemCountCondition::VERSION,
        "itemName": c.pattern().as_str(),
        "currentItemCount": c.current_count(),
        "includeNoted": c.includes_noted(),
    }));
    put_target(&mut map, "targetCount", "currentTargetCount", c.target_range(), c.target_count());
    Value::Object(map)
}

fn bank_count(c: &BankItemCountCondition) -> Value {
    let mut map = object(json!({
        "version": BankItemCountCondition::VERSION,
        "itemName": c.pattern().as_str(),
        "currentItemCount": c.current_count(),
    }));
    put_target(&mut map, "targetCount", "currentTargetCount", c.target_range(), c.target_count());
    Value::Object(map)
}

fn process_items(items: &[ProcessItem]) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| json!({ "itemName": item.pattern().as_str(), "quantity": item.quantity() }))
            .collect(),
    )
}

fn process_item(c: &ProcessItemCondition) -> Value {
    let mut map = object(json!({
        "version": ProcessItemCondition::VERSION,
        "sourceItems": process_items(c.sources()),
        "targetItems": process_items(c.targets()),
        "trackingMode": c.mode().as_str(),
        "processedCount": c.processed_count(),
    }));
    put_target(&mut map, "targetCount", "currentTargetCount", c.target_range(), c.target_count());
    Value::Object(map)
}

fn npc_kill_count(c: &NpcKillCountCondition) -> Value {
    let mut map = object(json!({
        "version": NpcKillCountCondition::VERSION,
        "npcName": c.pattern().as_str(),
        "currentKillCount": c.kill_count(),
    }));
    put_target(&mut map, "targetCount", "currentTargetCount", c.target_range(), c.target_count());
    Value::Object(map)
}

// SPDX-License-Identifier: MIT

use super::check_version;
use super::encode::{DATE_FORMAT, TIME_FORMAT};
use super::fields::Fields;
use crate::condition::location::{AreaCondition, PositionCondition, RegionCondition};
use crate::condition::npc::NpcKillCountCondition;
use crate::condition::resource::{
    BankItemCountCondition, InventoryItemCountCondition, ItemPattern, LootItemCondition,
    ProcessItem, ProcessItemCondition, TrackingMode,
};
use crate::condition::skill::{SkillLevelCondition, SkillXpCondition, XpMode};
use crate::condition::time::{
    DayOfWeekCondition, FixedEndTimeCondition, IntervalCondition, TimeWindowCondition,
    MAX_SPAN_SECONDS,
};
use crate::condition::{
    AndCondition, ConditionContext, ConditionKind, ConditionNode, LockCondition, NotCondition,
    OrCondition, TargetRange,
};
use crate::runtime::config::VersionPolicy;
use crate::runtime::error::{ConditionError, SerializationError};
use crate::runtime::skill::Skill;
use crate::runtime::world::{ContainerId, WorldPoint};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Weekday};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Persisted `{itemName, quantity}` entry of a process condition
#[derive(Debug, Deserialize)]
struct ProcessItemData {
    #[serde(rename = "itemName")]
    item_name: String,
    #[serde(default = "one")]
    quantity: u64,
}

fn one() -> u64 {
    1
}

fn invalid(kind: ConditionKind) -> impl Fn(ConditionError) -> SerializationError {
    move |e| SerializationError::deserialization(kind.type_name(), e.to_string())
}

fn millis(value: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(value).single()
}

/// A seconds field as a duration, rejecting spans no schedule can hold
fn span(fields: &Fields<'_>, key: &str, seconds: u64) -> Result<Duration, SerializationError> {
    if seconds > MAX_SPAN_SECONDS {
        return Err(SerializationError::deserialization(
            fields.kind().type_name(),
            format!("'{}' of {}s exceeds {}s", key, seconds, MAX_SPAN_SECONDS),
        ));
    }
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| {
            SerializationError::deserialization(
                fields.kind().type_name(),
                format!("'{}' of {}s is out of range", key, seconds),
            )
        })
}

pub(super) struct Decoder {
    policy: VersionPolicy,
}

impl Decoder {
    pub fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    pub fn node(
        &self,
        value: &Value,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<ConditionNode, SerializationError> {
        let envelope = value.as_object().ok_or_else(|| {
            SerializationError::deserialization("condition", "expected an object with 'type' and 'data'")
        })?;
        let type_name = envelope
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| SerializationError::deserialization("condition", "missing 'type'"))?;
        let kind = ConditionKind::from_type_name(type_name)
            .ok_or_else(|| SerializationError::UnknownKind(type_name.to_string()))?;

        let empty = Map::new();
        let mut data = match envelope.get("data") {
            Some(Value::Object(map)) => map,
            Some(Value::Null) | None => {
                log::warn!("{}: no 'data' payload, using defaults", kind);
                &empty
            }
            Some(other) => {
                return Err(SerializationError::deserialization(
                    kind.type_name(),
                    format!("'data' must be an object, found {}", other),
                ))
            }
        };
        // Older writers nested the payload one level deeper
        if let Some(Value::Object(inner)) = data.get("data") {
            log::debug!("{}: unwrapping nested legacy payload", kind);
            data = inner;
        }

        let fields = Fields::new(kind, data);
        if !kind.is_logical() {
            let version = fields.opt::<String>("version");
            check_version(kind, version.as_deref(), expected_version(kind), self.policy)?;
        }

        let node: ConditionNode = match kind {
            ConditionKind::And => AndCondition::with(self.children(&fields, ctx)?).into(),
            ConditionKind::Or => OrCondition::with(self.children(&fields, ctx)?).into(),
            ConditionKind::Not => {
                let inner = fields.raw("condition").ok_or_else(|| {
                    SerializationError::deserialization(kind.type_name(), "missing required field 'condition'")
                })?;
                NotCondition::new(self.node(inner, ctx)?).into()
            }
            ConditionKind::Lock => LockCondition::new(fields.string("reason", "")).into(),
            ConditionKind::FixedEndTime => fixed_end_time(&fields, ctx)?.into(),
            ConditionKind::Interval => interval(&fields, ctx)?.into(),
            ConditionKind::DayOfWeek => day_of_week(&fields).into(),
            ConditionKind::TimeWindow => time_window(&fields).into(),
            ConditionKind::SkillLevel => skill_level(&fields, ctx)?.into(),
            ConditionKind::SkillXp => skill_xp(&fields, ctx)?.into(),
            ConditionKind::Position => position(&fields)?.into(),
            ConditionKind::Area => area(&fields)?.into(),
            ConditionKind::Region => region(&fields).into(),
            ConditionKind::LootItem => loot_item(&fields, ctx)?.into(),
            ConditionKind::InventoryItemCount => inventory_count(&fields, ctx)?.into(),
            ConditionKind::BankItemCount => bank_count(&fields, ctx)?.into(),
            ConditionKind::ProcessItem => process_item(&fields, ctx)?.into(),
            ConditionKind::NpcKillCount => npc_kill_count(&fields, ctx)?.into(),
        };
        Ok(node)
    }

    fn children(
        &self,
        fields: &Fields<'_>,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<Vec<ConditionNode>, SerializationError> {
        match fields.raw("conditions") {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items.iter().map(|item| self.node(item, ctx)).collect(),
            Some(other) => Err(SerializationError::deserialization(
                fields.kind().type_name(),
                format!("'conditions' must be an array, found {}", other),
            )),
        }
    }
}

fn expected_version(kind: ConditionKind) -> &'static str {
    match kind {
        ConditionKind::FixedEndTime => FixedEndTimeCondition::VERSION,
        ConditionKind::Interval => IntervalCondition::VERSION,
        ConditionKind::DayOfWeek => DayOfWeekCondition::VERSION,
        ConditionKind::TimeWindow => TimeWindowCondition::VERSION,
        ConditionKind::SkillLevel => SkillLevelCondition::VERSION,
        ConditionKind::SkillXp => SkillXpCondition::VERSION,
        ConditionKind::Position => PositionCondition::VERSION,
        ConditionKind::Area => AreaCondition::VERSION,
        ConditionKind::Region => RegionCondition::VERSION,
        ConditionKind::LootItem => LootItemCondition::VERSION,
        ConditionKind::InventoryItemCount => InventoryItemCountCondition::VERSION,
        ConditionKind::BankItemCount => BankItemCountCondition::VERSION,
        ConditionKind::ProcessItem => ProcessItemCondition::VERSION,
        ConditionKind::NpcKillCount => NpcKillCountCondition::VERSION,
        ConditionKind::And | ConditionKind::Or | ConditionKind::Not | ConditionKind::Lock => "",
    }
}

fn fixed_end_time(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<FixedEndTimeCondition, SerializationError> {
    let start = fields
        .opt::<i64>("startTimeMillis")
        .and_then(millis)
        .unwrap_or(ctx.now);
    let min = fields.opt_u64("durationMinSeconds");
    let max = fields.opt_u64("durationMaxSeconds");
    for (key, seconds) in [("durationMinSeconds", min), ("durationMaxSeconds", max)] {
        if let Some(seconds) = seconds {
            span(fields, key, seconds)?;
        }
    }
    let duration = match (min, max) {
        (Some(min), max) => Some(TargetRange::new(min, max.unwrap_or(min))),
        (None, Some(max)) => Some(TargetRange::fixed(max)),
        (None, None) => None,
    };
    let end = match fields.opt::<i64>("targetTimeMillis").and_then(millis) {
        Some(end) => end,
        None => {
            let seconds = duration.map(|range| range.resolve(ctx.rng)).unwrap_or(0);
            log::warn!(
                "{}: no usable targetTimeMillis, ending {}s after start",
                fields.kind(),
                seconds
            );
            let delay = span(fields, "durationMinSeconds", seconds)?;
            start.checked_add_signed(delay).ok_or_else(|| {
                SerializationError::deserialization(
                    fields.kind().type_name(),
                    format!("deadline {}s after {} is out of range", seconds, start),
                )
            })?
        }
    };
    Ok(FixedEndTimeCondition::restore(start, end, duration))
}

fn interval(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<IntervalCondition, SerializationError> {
    let kind = fields.kind();
    let seconds = fields.opt_u64("intervalSeconds").ok_or_else(|| {
        SerializationError::deserialization(
            kind.type_name(),
            "missing required field 'intervalSeconds'",
        )
    })?;
    let every = span(fields, "intervalSeconds", seconds)?;
    let jitter = if fields.bool("randomize", false) {
        let factor = fields.get::<f64>("randomFactor", 0.0);
        if (0.0..=1.0).contains(&factor) {
            factor
        } else {
            log::warn!("{}: randomFactor {} clamped to [0, 1]", kind, factor);
            factor.clamp(0.0, 1.0)
        }
    } else {
        0.0
    };
    let mut condition = IntervalCondition::with_jitter(every, jitter, ctx)
        .map_err(invalid(kind))?
        .with_max_repeats(fields.get("maximumNumberOfRepeats", 0));
    let delay = fields.u64("initialDelaySeconds", 0);
    if delay > 0 {
        condition = condition.with_initial_delay(span(fields, "initialDelaySeconds", delay)?);
    }
    let next = fields.opt::<i64>("nextTriggerTimeMillis").and_then(millis);
    Ok(condition.restore_schedule(fields.get("currentTriggerCount", 0), next))
}

fn day_of_week(fields: &Fields<'_>) -> DayOfWeekCondition {
    let names: Vec<String> = fields.get("activeDays", Vec::new());
    let days = names.iter().filter_map(|name| match name.parse::<Weekday>() {
        Ok(day) => Some(day),
        Err(_) => {
            log::warn!("{}: skipping unknown day '{}'", fields.kind(), name);
            None
        }
    });
    DayOfWeekCondition::new(days).with_max_repeats_per_day(fields.get("maximumNumberOfRepeats", 0))
}

fn parse_time(fields: &Fields<'_>, key: &str) -> NaiveTime {
    let text = fields.string(key, "00:00");
    NaiveTime::parse_from_str(&text, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M"))
        .unwrap_or_else(|_| {
            log::warn!("{}: {} '{}' is not HH:mm[:ss], using 00:00", fields.kind(), key, text);
            NaiveTime::MIN
        })
}

fn parse_date(fields: &Fields<'_>, key: &str) -> Option<NaiveDate> {
    let text = fields.opt::<String>(key)?;
    match NaiveDate::parse_from_str(&text, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            log::warn!("{}: ignoring malformed {} '{}'", fields.kind(), key, text);
            None
        }
    }
}

fn time_window(fields: &Fields<'_>) -> TimeWindowCondition {
    TimeWindowCondition::new(parse_time(fields, "startTime"), parse_time(fields, "endTime"))
        .with_dates(parse_date(fields, "startDate"), parse_date(fields, "endDate"))
}

fn skill(fields: &Fields<'_>) -> Result<Skill, SerializationError> {
    let name: String = fields.required("skill")?;
    name.parse::<Skill>().map_err(|_| {
        SerializationError::deserialization(
            fields.kind().type_name(),
            format!("unknown skill '{}'", name),
        )
    })
}

fn skill_level(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<SkillLevelCondition, SerializationError> {
    let skill = skill(fields)?;
    let (range, target) = fields.target("targetLevelMin", "targetLevelMax", "currentTargetLevel", ctx.rng);
    let target = u32::try_from(target).unwrap_or(u32::MAX);
    Ok(SkillLevelCondition::restore(skill, range, target, ctx.world))
}

fn skill_xp(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<SkillXpCondition, SerializationError> {
    let skill = skill(fields)?;
    let mode = if fields.bool("absolute", false) {
        XpMode::Absolute
    } else {
        XpMode::Relative
    };
    let (range, target) = fields.target("targetXpMin", "targetXpMax", "currentTargetXp", ctx.rng);
    Ok(SkillXpCondition::restore(skill, mode, range, target, ctx.world))
}

fn position(fields: &Fields<'_>) -> Result<PositionCondition, SerializationError> {
    let target = WorldPoint::new(
        fields.required("x")?,
        fields.required("y")?,
        fields.get("plane", 0),
    );
    Ok(PositionCondition::new(
        fields.string("name", ""),
        target,
        fields.get("maxDistance", 0),
    ))
}

fn area(fields: &Fields<'_>) -> Result<AreaCondition, SerializationError> {
    Ok(AreaCondition::from_rect(
        fields.string("name", ""),
        fields.required("x")?,
        fields.required("y")?,
        fields.get("width", 1),
        fields.get("height", 1),
        fields.get("plane", 0),
    ))
}

fn region(fields: &Fields<'_>) -> RegionCondition {
    RegionCondition::new(
        fields.string("name", ""),
        fields.get::<Vec<i32>>("regionIds", Vec::new()),
    )
}

fn pattern(fields: &Fields<'_>) -> Result<ItemPattern, SerializationError> {
    let name: String = fields.required("itemName")?;
    ItemPattern::new(&name).map_err(invalid(fields.kind()))
}

fn loot_item(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<LootItemCondition, SerializationError> {
    let pattern = pattern(fields)?;
    let (range, target) = fields.target("targetAmountMin", "targetAmountMax", "currentTargetAmount", ctx.rng);
    let containers: Vec<ContainerId> = fields.get("containers", vec![ContainerId::Inventory]);
    Ok(LootItemCondition::restore(
        pattern,
        range,
        target,
        fields.bool("includeNoted", false),
        containers,
        ctx.world,
    ))
}

fn inventory_count(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<InventoryItemCountCondition, SerializationError> {
    let pattern = pattern(fields)?;
    let (range, target) = fields.target("targetCountMin", "targetCountMax", "currentTargetCount", ctx.rng);
    Ok(InventoryItemCountCondition::restore(
        pattern,
        range,
        target,
        fields.bool("includeNoted", false),
        ctx.world,
    ))
}

fn bank_count(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<BankItemCountCondition, SerializationError> {
    let pattern = pattern(fields)?;
    let (range, target) = fields.target("targetCountMin", "targetCountMax", "currentTargetCount", ctx.rng);
    Ok(BankItemCountCondition::restore(pattern, range, target, ctx.world))
}

fn process_items(fields: &Fields<'_>, key: &str) -> Result<Vec<ProcessItem>, SerializationError> {
    fields
        .get::<Vec<ProcessItemData>>(key, Vec::new())
        .into_iter()
        .map(|entry| ProcessItem::new(&entry.item_name, entry.quantity).map_err(invalid(fields.kind())))
        .collect()
}

fn process_item(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<ProcessItemCondition, SerializationError> {
    let kind = fields.kind();
    let sources = process_items(fields, "sourceItems")?;
    let targets = process_items(fields, "targetItems")?;
    let mode_name = fields.string("trackingMode", TrackingMode::default().as_str());
    let mode = TrackingMode::parse(&mode_name).unwrap_or_else(|| {
        log::warn!("{}: unknown trackingMode '{}', using default", kind, mode_name);
        TrackingMode::default()
    });
    let (range, target) = fields.target("targetCountMin", "targetCountMax", "currentTargetCount", ctx.rng);
    ProcessItemCondition::restore(sources, targets, mode, range, target, ctx.world)
        .map_err(invalid(kind))
}

fn npc_kill_count(
    fields: &Fields<'_>,
    ctx: &mut ConditionContext<'_>,
) -> Result<NpcKillCountCondition, SerializationError> {
    let name: String = fields.required("npcName")?;
    let pattern = ItemPattern::new(&name).map_err(invalid(fields.kind()))?;
    let (range, target) = fields.target("targetCountMin", "targetCountMax", "currentTargetCount", ctx.rng);
    Ok(NpcKillCountCondition::restore(
        pattern,
        range,
        target,
        fields.u64("currentKillCount", 0),
    ))
}

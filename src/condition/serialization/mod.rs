// SPDX-License-Identifier: MIT

//! Persisted form of condition trees
//!
//! Every node is written as an envelope:
//!
//! ```json
//! { "type": "OrCondition", "data": { "conditions": [ { "type": ..., "data": ... } ] } }
//! ```
//!
//! `type` is the closed [`ConditionKind`] discriminator; leaf payloads carry
//! their resolved targets and a `version`. Reading is lenient about individual
//! fields and strict about the discriminator.

mod decode;
mod encode;
mod fields;
mod loader;

pub use loader::DocumentLoader;

use super::{ConditionContext, ConditionKind, ConditionNode};
use crate::runtime::config::VersionPolicy;
use crate::runtime::error::SerializationError;
use serde_json::{json, Map, Value};

/// Tagged form of a node
pub fn to_value(node: &ConditionNode) -> Value {
    encode::node(node)
}

pub fn to_string_pretty(node: &ConditionNode) -> Result<String, SerializationError> {
    Ok(serde_json::to_string_pretty(&to_value(node))?)
}

/// Tagged form of an AND/OR over `children`
pub fn logical_to_value(kind: ConditionKind, children: &[ConditionNode]) -> Value {
    envelope(
        kind,
        json!({ "conditions": children.iter().map(encode::node).collect::<Vec<_>>() }),
    )
}

/// Rebuild a node. Leaves capture fresh baselines from `ctx.world`.
pub fn from_value(
    value: &Value,
    ctx: &mut ConditionContext<'_>,
    policy: VersionPolicy,
) -> Result<ConditionNode, SerializationError> {
    decode::Decoder::new(policy).node(value, ctx)
}

pub fn from_str(
    text: &str,
    ctx: &mut ConditionContext<'_>,
    policy: VersionPolicy,
) -> Result<ConditionNode, SerializationError> {
    let value: Value = serde_json::from_str(text)?;
    from_value(&value, ctx, policy)
}

pub(crate) fn envelope(kind: ConditionKind, data: Value) -> Value {
    let mut map = Map::new();
    map.insert("type".to_string(), Value::String(kind.type_name().to_string()));
    map.insert("data".to_string(), data);
    Value::Object(map)
}

/// Parsed `MAJOR.MINOR.PATCH`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Version(u64, u64, u64);

impl Version {
    fn parse(text: &str) -> Option<Version> {
        let mut parts = text.trim().split('.').map(|p| p.parse::<u64>().ok());
        let major = parts.next()??;
        let minor = parts.next().unwrap_or(Some(0))?;
        let patch = parts.next().unwrap_or(Some(0))?;
        if parts.next().is_some() {
            return None;
        }
        Some(Version(major, minor, patch))
    }
}

/// Apply `policy` to a payload version
pub(crate) fn check_version(
    kind: ConditionKind,
    found: Option<&str>,
    expected: &str,
    policy: VersionPolicy,
) -> Result<(), SerializationError> {
    let Some(found) = found else {
        if policy == VersionPolicy::Strict {
            return Err(SerializationError::version_mismatch(
                kind.type_name(),
                "none",
                expected,
            ));
        }
        log::warn!("{}: payload has no version, reading as {}", kind, expected);
        return Ok(());
    };
    if found == expected {
        return Ok(());
    }
    let major_differs = match (Version::parse(found), Version::parse(expected)) {
        (Some(a), Some(b)) => a.0 != b.0,
        _ => true,
    };
    let reject = match policy {
        VersionPolicy::Strict => true,
        VersionPolicy::RejectMajor => major_differs,
        VersionPolicy::Lenient => false,
    };
    if reject {
        return Err(SerializationError::version_mismatch(
            kind.type_name(),
            found,
            expected,
        ));
    }
    log::warn!(
        "{}: payload version {} differs from {}, reading anyway",
        kind,
        found,
        expected
    );
    Ok(())
}

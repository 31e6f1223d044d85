// SPDX-License-Identifier: MIT

//! Lenient field access for condition payloads.
//!
//! A missing field silently takes its default; a field of the wrong shape
//! logs a warning and takes its default. Only fields without any usable
//! default are reported as errors.

use crate::condition::{ConditionKind, TargetRange};
use crate::runtime::error::SerializationError;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub(crate) struct Fields<'a> {
    kind: ConditionKind,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(kind: ConditionKind, map: &'a Map<String, Value>) -> Self {
        Self { kind, map }
    }

    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn malformed<T: std::fmt::Debug>(&self, key: &str, value: &Value, default: T) -> T {
        log::warn!(
            "{}: field '{}' has unexpected value {}, using {:?}",
            self.kind,
            key,
            value,
            default
        );
        default
    }

    /// Typed read with the lenient policy
    pub fn get<T>(&self, key: &str, default: T) -> T
    where
        T: DeserializeOwned + std::fmt::Debug,
    {
        match self.raw(key) {
            None => default,
            Some(value) => match serde_json::from_value::<T>(value.clone()) {
                Ok(parsed) => parsed,
                Err(_) => self.malformed(key, value, default),
            },
        }
    }

    pub fn opt<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned + std::fmt::Debug,
    {
        self.raw(key).and_then(|value| {
            serde_json::from_value::<T>(value.clone())
                .map_err(|_| self.malformed(key, value, ()))
                .ok()
        })
    }

    pub fn u64(&self, key: &str, default: u64) -> u64 {
        self.opt_u64(key).unwrap_or(default)
    }

    pub fn opt_u64(&self, key: &str) -> Option<u64> {
        // Older writers stored counts as floating point numbers
        match self.raw(key)? {
            Value::Number(n) if n.as_u64().is_none() => match n.as_f64() {
                Some(f) if f >= 0.0 => Some(f.round() as u64),
                _ => {
                    self.malformed(key, &Value::Number(n.clone()), ());
                    None
                }
            },
            _ => self.opt(key),
        }
    }

    pub fn bool(&self, key: &str, default: bool) -> bool {
        self.get(key, default)
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        self.get(key, default.to_string())
    }

    /// A field the payload cannot be rebuilt without
    pub fn required<T>(&self, key: &str) -> Result<T, SerializationError>
    where
        T: DeserializeOwned,
    {
        let value = self.raw(key).ok_or_else(|| {
            SerializationError::deserialization(
                self.kind.type_name(),
                format!("missing required field '{}'", key),
            )
        })?;
        serde_json::from_value(value.clone()).map_err(|e| {
            SerializationError::deserialization(
                self.kind.type_name(),
                format!("field '{}': {}", key, e),
            )
        })
    }

    /// Range `[min_key, max_key]` plus the resolved target in `current_key`.
    ///
    /// A resolved target outside the range is rolled again.
    pub fn target(
        &self,
        min_key: &str,
        max_key: &str,
        current_key: &str,
        rng: &mut dyn RngCore,
    ) -> (TargetRange, u64) {
        let min = self.u64(min_key, 1);
        let max = self.u64(max_key, min);
        let range = TargetRange::new(min, max);
        let current = match self.raw(current_key) {
            None => range.resolve(rng),
            Some(_) => {
                let current = self.u64(current_key, range.min());
                if range.contains(current) {
                    current
                } else {
                    log::warn!(
                        "{}: {} = {} outside {}, rolling a new target",
                        self.kind,
                        current_key,
                        current,
                        range
                    );
                    range.resolve(rng)
                }
            }
        };
        (range, current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::testing::rng;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_missing_and_malformed_fields_use_defaults() {
        let data = map(json!({"count": "lots", "flag": true, "ratio": 0.5, "legacy": 12.0}));
        let fields = Fields::new(ConditionKind::LootItem, &data);
        assert_eq!(fields.u64("count", 7), 7);
        assert_eq!(fields.u64("absent", 3), 3);
        assert_eq!(fields.u64("legacy", 0), 12);
        assert!(fields.bool("flag", false));
        assert_eq!(fields.get::<f64>("ratio", 0.0), 0.5);
        assert_eq!(fields.opt::<u64>("count"), None);
    }

    #[test]
    fn test_required_field() {
        let data = map(json!({"itemName": "Logs", "skill": 5}));
        let fields = Fields::new(ConditionKind::LootItem, &data);
        assert_eq!(fields.required::<String>("itemName").unwrap(), "Logs");
        assert!(fields.required::<String>("missing").is_err());
        assert!(fields.required::<String>("skill").is_err());
    }

    #[test]
    fn test_target_respects_range() {
        let mut rng = rng();
        let data = map(json!({"min": 5, "max": 10, "current": 7, "bad": 50}));
        let fields = Fields::new(ConditionKind::LootItem, &data);
        assert_eq!(fields.target("min", "max", "current", &mut rng).1, 7);
        let (range, rolled) = fields.target("min", "max", "bad", &mut rng);
        assert!(range.contains(rolled));
    }
}

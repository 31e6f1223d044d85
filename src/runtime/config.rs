// SPDX-License-Identifier: MIT

//! Engine configuration: YAML file plus environment overrides.

use super::error::TriggerError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const ENV_VERSION_POLICY: &str = "TRIGGER_VERSION_POLICY";
pub const ENV_RNG_SEED: &str = "TRIGGER_RNG_SEED";

/// How persisted payload versions are checked against the running code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionPolicy {
    /// Any difference is an error
    Strict,
    /// Major differences are errors; minor and patch drift only warn
    #[default]
    RejectMajor,
    /// Never reject, only warn
    Lenient,
}

impl FromStr for VersionPolicy {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(VersionPolicy::Strict),
            "reject_major" => Ok(VersionPolicy::RejectMajor),
            "lenient" => Ok(VersionPolicy::Lenient),
            other => Err(TriggerError::config(format!(
                "Unknown version policy: {}",
                other
            ))),
        }
    }
}

/// Settings shared by the loader, the manager and the CLI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub version_policy: VersionPolicy,
    /// Fixed seed for target randomization; entropy when absent
    pub rng_seed: Option<u64>,
}

impl EngineConfig {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TriggerError> {
        let content = fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Parse a configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self, TriggerError> {
        let config: EngineConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Apply `TRIGGER_VERSION_POLICY` / `TRIGGER_RNG_SEED` from the process environment
    pub fn with_env_overrides(self) -> Result<Self, TriggerError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, TriggerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(policy) = lookup(ENV_VERSION_POLICY) {
            self.version_policy = policy.parse()?;
        }
        if let Some(seed) = lookup(ENV_RNG_SEED) {
            let seed = seed.trim().parse::<u64>().map_err(|e| {
                TriggerError::config(format!("{} must be an integer: {}", ENV_RNG_SEED, e))
            })?;
            self.rng_seed = Some(seed);
        }
        Ok(self)
    }

    /// Random source for target resolution
    pub fn rng(&self) -> ChaCha8Rng {
        match self.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashMap;

    #[test]
    fn test_parse_yaml_defaults() {
        let config = EngineConfig::parse_yaml("{}").unwrap();
        assert_eq!(config.version_policy, VersionPolicy::RejectMajor);
        assert_eq!(config.rng_seed, None);
    }

    #[test]
    fn test_parse_yaml_values() {
        let yaml = r#"
version_policy: strict
rng_seed: 42
"#;
        let config = EngineConfig::parse_yaml(yaml).unwrap();
        assert_eq!(config.version_policy, VersionPolicy::Strict);
        assert_eq!(config.rng_seed, Some(42));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [(ENV_VERSION_POLICY, "lenient"), (ENV_RNG_SEED, "7")]
            .into_iter()
            .collect();
        let config = EngineConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.version_policy, VersionPolicy::Lenient);
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let result = EngineConfig::default().with_overrides(|key| {
            (key == ENV_RNG_SEED).then(|| "not-a-number".to_string())
        });
        assert!(matches!(result, Err(TriggerError::Config(_))));
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let config = EngineConfig {
            rng_seed: Some(99),
            ..Default::default()
        };
        let a: u64 = config.rng().gen();
        let b: u64 = config.rng().gen();
        assert_eq!(a, b);
    }
}

// SPDX-License-Identifier: MIT

//! Condition documents on disk
//!
//! `.yaml` / `.yml` files are read as YAML, anything else as JSON. Both end up
//! as the same tagged JSON tree before decoding.

use crate::condition::{ConditionContext, ConditionNode};
use crate::runtime::config::VersionPolicy;
use crate::runtime::error::TriggerError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Loads condition trees from JSON or YAML files
pub struct DocumentLoader {
    policy: VersionPolicy,
}

impl DocumentLoader {
    pub fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> VersionPolicy {
        self.policy
    }

    /// Read and decode a condition tree
    pub fn load<P: AsRef<Path>>(
        &self,
        path: P,
        ctx: &mut ConditionContext<'_>,
    ) -> Result<ConditionNode, TriggerError> {
        let document = Self::read_document(path)?;
        Ok(super::from_value(&document, ctx, self.policy)?)
    }

    /// Read the raw tagged document without decoding it
    pub fn read_document<P: AsRef<Path>>(path: P) -> Result<Value, TriggerError> {
        log::debug!("Reading condition document {}", path.as_ref().display());
        Self::read_structured(path)
    }

    /// Whether `path` is read as YAML rather than JSON
    pub fn is_yaml(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
    }

    /// Read any JSON or YAML file into `T`, picking the format by extension
    pub fn read_structured<T, P>(path: P) -> Result<T, TriggerError>
    where
        T: DeserializeOwned,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if Self::is_yaml(path) {
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    pub fn parse_json(content: &str) -> Result<Value, TriggerError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn parse_yaml(content: &str) -> Result<Value, TriggerError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Write `node` as pretty JSON
    pub fn save<P: AsRef<Path>>(node: &ConditionNode, path: P) -> Result<(), TriggerError> {
        let text = super::to_string_pretty(node)?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(VersionPolicy::default())
    }
}

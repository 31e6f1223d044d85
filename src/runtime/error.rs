// SPDX-License-Identifier: MIT

//! Typed error handling for trigger-rs
//!
//! Each concern gets its own enum; `TriggerError` is the umbrella the loader,
//! configuration and CLI surfaces return.

use thiserror::Error;

/// Top-level error type for trigger-rs
#[derive(Debug, Error)]
pub enum TriggerError {
    /// Persisted condition documents that could not be read back
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// Invalid condition construction
    #[error("Condition error: {0}")]
    Condition(#[from] ConditionError),

    /// Configuration errors (bad env vars, invalid config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON parsing errors outside of condition documents
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while reading a persisted condition tree
#[derive(Debug, Error)]
pub enum SerializationError {
    /// The document is structurally unusable (missing envelope, wrong shape)
    #[error("Cannot deserialize {kind}: {message}")]
    Deserialization { kind: String, message: String },

    /// A payload was written by an incompatible version of its condition
    #[error("Version mismatch for {kind}: found {found}, expected {expected}")]
    VersionMismatch {
        kind: String,
        found: String,
        expected: String,
    },

    /// The `type` discriminator names no known condition
    #[error("Unknown condition type: {0}")]
    UnknownKind(String),

    /// Raw JSON syntax errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors raised when a condition is built with unusable arguments
#[derive(Debug, Error)]
pub enum ConditionError {
    /// An item name pattern did not compile
    #[error("Invalid item pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Any other argument that can never produce a working condition
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures of the external world oracle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldQueryError {
    /// No actor is present (logged out, loading screen)
    #[error("No player is logged in")]
    NotLoggedIn,

    /// The requested piece of state is not available right now
    #[error("World state unavailable: {0}")]
    Unavailable(String),
}

impl TriggerError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl SerializationError {
    /// Create a structural deserialization error for `kind`
    pub fn deserialization(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Deserialization {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a version mismatch error
    pub fn version_mismatch(
        kind: impl Into<String>,
        found: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::VersionMismatch {
            kind: kind.into(),
            found: found.into(),
            expected: expected.into(),
        }
    }
}

impl ConditionError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl WorldQueryError {
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable(what.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error_converts_to_trigger_error() {
        let err: TriggerError = SerializationError::UnknownKind("FooCondition".into()).into();
        assert!(matches!(err, TriggerError::Serialization(_)));
        assert_eq!(
            err.to_string(),
            "Serialization error: Unknown condition type: FooCondition"
        );
    }

    #[test]
    fn test_version_mismatch_message() {
        let err = SerializationError::version_mismatch("SkillXpCondition", "2.0.0", "0.0.1");
        assert_eq!(
            err.to_string(),
            "Version mismatch for SkillXpCondition: found 2.0.0, expected 0.0.1"
        );
    }

    #[test]
    fn test_world_query_error_display() {
        assert_eq!(
            WorldQueryError::unavailable("skills").to_string(),
            "World state unavailable: skills"
        );
    }
}

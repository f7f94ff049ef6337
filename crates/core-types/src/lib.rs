use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

mod ring;

pub use ring::RingBuffer;

/// Shared error taxonomy for the webrig orchestration core.
///
/// Every tool handler catches these at its boundary and turns them into a
/// structured failure result; none of them may abort the process.
#[derive(Debug, Error, Clone)]
pub enum RigError {
    #[error("{resource} not found")]
    NotFound { resource: String },
    #[error("invalid field `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("driver error: {message}")]
    Driver { message: String },
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("resource teardown failed: {message}")]
    Resource { message: String },
}

impl RigError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource {
            message: message.into(),
        }
    }

    /// Stable machine-readable kind tag surfaced in tool responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation",
            Self::Driver { .. } => "driver",
            Self::Timeout { .. } => "timeout",
            Self::Resource { .. } => "resource",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioId(pub String);

impl ScenarioId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ScenarioId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ScenarioId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn session_ids_are_unique() {
        let ids: HashSet<_> = (0..256).map(|_| SessionId::new().0).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn scenario_ids_are_unique() {
        let ids: HashSet<_> = (0..256).map(|_| ScenarioId::new().0).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(RigError::not_found("session abc").kind(), "not_found");
        assert_eq!(RigError::validation("name", "required").kind(), "validation");
        assert_eq!(RigError::timeout("navigate", 5000).kind(), "timeout");
    }

    #[test]
    fn validation_error_names_the_field() {
        let err = RigError::validation("scenarioId", "must be a string");
        assert!(err.to_string().contains("scenarioId"));
    }
}

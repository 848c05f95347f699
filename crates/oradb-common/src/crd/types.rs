//! Shared types used across oradb CRDs

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reported by every oradb resource
pub const READY_CONDITION: &str = "Ready";

/// Reasons carried by the `Ready` condition
pub mod reasons {
    /// Spec is invalid or prerequisites are missing
    pub const CREATE_PENDING: &str = "CreatePending";
    /// Resource is being brought up
    pub const CREATE_IN_PROGRESS: &str = "CreateInProgress";
    /// Resource is up
    pub const CREATE_COMPLETE: &str = "CreateComplete";
    /// A physical restore is running on the agent
    pub const RESTORE_IN_PROGRESS: &str = "RestoreInProgress";
    /// The last restore finished successfully
    pub const RESTORE_COMPLETE: &str = "RestoreComplete";
    /// The last restore reported an error
    pub const RESTORE_FAILED: &str = "RestoreFailed";
}

/// Condition status following Kubernetes conventions
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition is true
    True,
    /// Condition is false
    False,
    /// Condition status is unknown
    #[default]
    Unknown,
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Kubernetes-style condition for status reporting
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct Condition {
    /// Type of condition (e.g., Ready)
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,

    /// Machine-readable reason for the condition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    #[serde(rename = "lastTransitionTime")]
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a new condition with the current timestamp
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
        }
    }

    /// Shorthand for a `Ready` condition
    pub fn ready(
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(READY_CONDITION, status, reason, message)
    }
}

/// Kind of database backup
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BackupType {
    /// RMAN backup to object storage
    #[default]
    Physical,
    /// Volume snapshot
    Snapshot,
}

impl std::fmt::Display for BackupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Physical => write!(f, "Physical"),
            Self::Snapshot => write!(f, "Snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Story: status writers and kubectl agree on condition spelling
    #[test]
    fn story_condition_serializes_with_kubernetes_field_names() {
        let c = Condition::ready(
            ConditionStatus::False,
            reasons::RESTORE_IN_PROGRESS,
            "restoring",
        );
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "Ready");
        assert_eq!(json["status"], "False");
        assert_eq!(json["reason"], "RestoreInProgress");
        assert!(json.get("lastTransitionTime").is_some());
    }

    #[test]
    fn condition_status_defaults_to_unknown() {
        assert_eq!(ConditionStatus::default(), ConditionStatus::Unknown);
        assert_eq!(ConditionStatus::True.to_string(), "True");
    }

    #[test]
    fn backup_type_round_trips_through_json() {
        let parsed: BackupType = serde_json::from_str("\"Snapshot\"").unwrap();
        assert_eq!(parsed, BackupType::Snapshot);
        assert_eq!(BackupType::default(), BackupType::Physical);
    }
}

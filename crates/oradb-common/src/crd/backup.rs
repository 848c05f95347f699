//! Backup Custom Resource Definition
//!
//! Backups are executed by an external backup controller. That controller
//! records the database incarnation as a label and the timestamp/SCN the
//! backup was taken at as annotations; PITR reads those to anchor recovery
//! windows.

use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{BackupType, Condition};
use crate::{HasConditions, BACKUP_SCN_ANNOTATION, BACKUP_TIMESTAMP_ANNOTATION, INCARNATION_LABEL};

/// Phase of a Backup
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum BackupPhase {
    /// Backup has been requested
    #[default]
    Pending,
    /// Backup is running
    InProgress,
    /// Backup completed successfully
    Succeeded,
    /// Backup failed
    Failed,
}

impl BackupPhase {
    /// True once the phase can no longer change
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Specification for a Backup
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "oradb.dev",
    version = "v1alpha1",
    kind = "Backup",
    plural = "backups",
    shortname = "obk",
    namespaced,
    status = "BackupStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Instance","type":"string","jsonPath":".spec.instance"}"#,
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"BackupID","type":"string","jsonPath":".status.backupId"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    /// Name of the Instance to back up
    pub instance: String,

    /// Backup type
    #[serde(rename = "type", default)]
    pub type_: BackupType,

    /// Backup sub-type (e.g., "Instance", "Tablespace")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,

    /// Destination bucket for physical backups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
}

/// Status of a Backup
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    /// Current phase
    #[serde(default)]
    pub phase: BackupPhase,

    /// Agent-assigned backup identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// When the backup started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

impl HasConditions for Backup {
    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}

impl Backup {
    /// Current phase, `Pending` until the backup controller reports one
    pub fn phase(&self) -> BackupPhase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }

    /// Incarnation label, if recorded
    pub fn incarnation(&self) -> Option<&str> {
        self.labels().get(INCARNATION_LABEL).map(String::as_str)
    }

    /// Raw timestamp annotation, if recorded
    pub fn timestamp_annotation(&self) -> Option<&str> {
        self.annotations()
            .get(BACKUP_TIMESTAMP_ANNOTATION)
            .map(String::as_str)
    }

    /// Raw SCN annotation, if recorded
    pub fn scn_annotation(&self) -> Option<&str> {
        self.annotations().get(BACKUP_SCN_ANNOTATION).map(String::as_str)
    }
}

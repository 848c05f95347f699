//! Pitr Custom Resource Definition
//!
//! A Pitr enables point-in-time recovery for an Instance: it keeps a backup
//! schedule running with enough retention to cover `recoveryWindow`, and
//! publishes the windows the database can actually be recovered to.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::Condition;
use crate::HasConditions;

/// Default backup cadence: every four hours
pub const DEFAULT_BACKUP_SCHEDULE: &str = "0 */4 * * *";

/// Default recovery window: one week
pub const DEFAULT_RECOVERY_WINDOW: &str = "7d";

fn default_backup_schedule() -> String {
    DEFAULT_BACKUP_SCHEDULE.to_string()
}

fn default_recovery_window() -> String {
    DEFAULT_RECOVERY_WINDOW.to_string()
}

/// Specification for a Pitr
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "oradb.dev",
    version = "v1alpha1",
    kind = "Pitr",
    plural = "pitrs",
    shortname = "pitr",
    namespaced,
    status = "PitrStatus",
    printcolumn = r#"{"name":"Instance","type":"string","jsonPath":".spec.instanceRef"}"#,
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.backupSchedule"}"#,
    printcolumn = r#"{"name":"Window","type":"string","jsonPath":".spec.recoveryWindow"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PitrSpec {
    /// Name of the Instance in the same namespace
    pub instance_ref: String,

    /// Bucket for backups and archived redo (`gs://` or `s3://`)
    pub storage_uri: String,

    /// Cron schedule for backups (5 or 6 fields)
    #[serde(default = "default_backup_schedule")]
    pub backup_schedule: String,

    /// How far back recovery must be possible (e.g., "7d", "168h")
    #[serde(default = "default_recovery_window")]
    pub recovery_window: String,
}

/// A time range the database can be recovered to
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct TimeWindow {
    /// Earliest recoverable instant
    pub begin: DateTime<Utc>,
    /// Latest recoverable instant
    pub end: DateTime<Utc>,
}

/// An SCN range the database can be recovered to
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ScnWindow {
    /// Earliest recoverable SCN
    pub begin: String,
    /// Latest recoverable SCN
    pub end: String,
}

/// Status of a Pitr
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PitrStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Recoverable time ranges, in agent order
    #[serde(default)]
    pub available_recovery_window_time: Vec<TimeWindow>,

    /// Recoverable SCN ranges, parallel to the time ranges
    #[serde(default)]
    pub available_recovery_window_scn: Vec<ScnWindow>,

    /// Incarnation the windows belong to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_database_incarnation: Option<String>,

    /// Backups taken for this Pitr across all incarnations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_total: Option<i64>,

    /// Number of scheduled backups retained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_retention: Option<i64>,

    /// Observed generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl HasConditions for Pitr {
    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}

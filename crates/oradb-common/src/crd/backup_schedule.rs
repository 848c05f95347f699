//! BackupSchedule Custom Resource Definition
//!
//! The schedule runner is external. Pitr applies one BackupSchedule per Pitr
//! so that backups keep flowing with the computed retention.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Specification for a BackupSchedule
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "oradb.dev",
    version = "v1alpha1",
    kind = "BackupSchedule",
    plural = "backupschedules",
    shortname = "obs",
    namespaced,
    printcolumn = r#"{"name":"Instance","type":"string","jsonPath":".spec.instance"}"#,
    printcolumn = r#"{"name":"Schedule","type":"string","jsonPath":".spec.schedule"}"#,
    printcolumn = r#"{"name":"Retention","type":"integer","jsonPath":".spec.backupRetention"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackupScheduleSpec {
    /// Cron schedule
    pub schedule: String,

    /// Number of backups to keep
    pub backup_retention: i64,

    /// Instance to back up
    pub instance: String,

    /// Labels stamped on every Backup the schedule creates
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub backup_labels: BTreeMap<String, String>,

    /// Destination bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
}

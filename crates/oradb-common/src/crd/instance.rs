//! Instance Custom Resource Definition
//!
//! An Instance is one Oracle container database served by an agent sidecar.
//! Restores are requested by setting `spec.restore`; the instance controller
//! clears it again once the restore reaches a terminal state.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{BackupType, Condition};
use crate::HasConditions;

/// A request to restore the database from a backup
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSpec {
    /// ID of the backup to restore from, as recorded in Backup status
    pub backup_id: String,

    /// Type of the backup being restored
    #[serde(default)]
    pub backup_type: BackupType,

    /// Restores overwrite the running database and must be forced
    #[serde(default)]
    pub force: bool,

    /// When the request was made; identifies the request for deduplication
    pub request_time: DateTime<Utc>,

    /// Degree of parallelism for RMAN channels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dop: Option<i32>,

    /// Upper bound on the restore duration enforced by the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<i32>,
}

/// Specification for an Instance
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "oradb.dev",
    version = "v1alpha1",
    kind = "Instance",
    plural = "instances",
    shortname = "inst",
    namespaced,
    status = "InstanceStatus",
    printcolumn = r#"{"name":"CDB","type":"string","jsonPath":".spec.cdbName"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Reason","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].reason"}"#,
    printcolumn = r#"{"name":"Incarnation","type":"string","jsonPath":".status.currentDatabaseIncarnation"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSpec {
    /// Name of the container database
    pub cdb_name: String,

    /// Database domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_domain: Option<String>,

    /// Agent address override (defaults to the `<name>-agent` service)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_endpoint: Option<String>,

    /// Pending restore request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore: Option<RestoreSpec>,
}

/// Status of an Instance
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Human-readable description of the last notable event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Request time of the last restore that was submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_restore_time: Option<DateTime<Utc>>,

    /// Backup ID of the last restore that was submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restore_backup_id: Option<String>,

    /// Incarnation reported by the database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_database_incarnation: Option<String>,

    /// Observed generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl HasConditions for Instance {
    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}

impl Instance {
    /// Agent address for this instance on the given port
    ///
    /// Uses `spec.agentEndpoint` when set, otherwise the in-cluster service
    /// `<name>-agent.<namespace>`.
    pub fn agent_endpoint(&self, port: u16) -> String {
        if let Some(ep) = &self.spec.agent_endpoint {
            return ep.clone();
        }
        let name = self.metadata.name.as_deref().unwrap_or_default();
        let ns = self.metadata.namespace.as_deref().unwrap_or("default");
        format!("http://{name}-agent.{ns}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{reasons, ConditionStatus};
    use kube::api::ObjectMeta;

    fn instance(endpoint: Option<&str>) -> Instance {
        Instance {
            metadata: ObjectMeta {
                name: Some("mydb".into()),
                namespace: Some("db".into()),
                ..Default::default()
            },
            spec: InstanceSpec {
                cdb_name: "GCLOUD".into(),
                db_domain: None,
                agent_endpoint: endpoint.map(String::from),
                restore: None,
            },
            status: None,
        }
    }

    #[test]
    fn agent_endpoint_defaults_to_service_name() {
        assert_eq!(instance(None).agent_endpoint(3202), "http://mydb-agent.db:3202");
    }

    #[test]
    fn agent_endpoint_override_wins() {
        assert_eq!(
            instance(Some("http://10.0.0.5:9000")).agent_endpoint(3202),
            "http://10.0.0.5:9000"
        );
    }

    #[test]
    fn conditions_are_empty_without_status() {
        let inst = instance(None);
        assert!(inst.conditions().is_empty());
        assert!(!inst.is_condition_true("Ready"));
    }

    #[test]
    fn conditions_come_from_status() {
        let mut inst = instance(None);
        inst.status = Some(InstanceStatus {
            conditions: vec![Condition::ready(
                ConditionStatus::True,
                reasons::CREATE_COMPLETE,
                "",
            )],
            ..Default::default()
        });
        assert!(inst.is_condition_true("Ready"));
    }

    /// Story: a user pastes a restore request with only the required fields
    #[test]
    fn story_restore_request_parses_with_defaults() {
        let restore: RestoreSpec = serde_json::from_value(serde_json::json!({
            "backupId": "bkp-1",
            "requestTime": "2021-09-09T16:00:00Z"
        }))
        .unwrap();
        assert_eq!(restore.backup_type, BackupType::Physical);
        assert!(!restore.force);
        assert!(restore.dop.is_none());
    }
}

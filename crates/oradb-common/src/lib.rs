//! Common types for the oradb operator: CRDs, conditions, errors, and telemetry

#![deny(missing_docs)]

pub mod conditions;
pub mod crd;
pub mod error;
pub mod events;
pub mod kube_utils;
pub mod metrics;
pub mod retry;
pub mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::ResourceExt;

pub use conditions::HasConditions;
pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group for all oradb custom resources
pub const API_GROUP: &str = "oradb.dev";

/// Label carrying the name of the PITR a Backup was taken for
pub const PITR_LABEL: &str = "oradb.dev/pitr";

/// Label carrying the database incarnation a Backup belongs to
pub const INCARNATION_LABEL: &str = "oradb.dev/incarnation";

/// Label carrying the owning Instance name
pub const INSTANCE_LABEL: &str = "oradb.dev/instance";

/// Annotation with the RFC 3339 time a backup was taken
pub const BACKUP_TIMESTAMP_ANNOTATION: &str = "oradb.dev/backup-timestamp";

/// Annotation with the SCN at which a backup was taken
pub const BACKUP_SCN_ANNOTATION: &str = "oradb.dev/backup-scn";

/// Requeue interval for healthy resources (60 seconds)
pub const REQUEUE_SUCCESS_SECS: u64 = 60;

/// Requeue interval after a reconcile error (30 seconds)
pub const REQUEUE_ERROR_SECS: u64 = 30;

/// Error policy shared by controllers whose errors all retry the same way
///
/// Transient failures (API conflicts, agent timeouts) get a fixed backoff.
/// Non-retryable errors still requeue, but on the slower success interval,
/// since they only clear once the user edits the resource.
pub fn default_error_policy<K, C>(obj: Arc<K>, error: &Error, _ctx: Arc<C>) -> Action
where
    K: ResourceExt,
{
    tracing::error!(
        ?error,
        name = %obj.name_any(),
        namespace = obj.namespace().as_deref().unwrap_or_default(),
        "reconciliation failed"
    );
    if error.is_retryable() {
        Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS))
    } else {
        Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS))
    }
}

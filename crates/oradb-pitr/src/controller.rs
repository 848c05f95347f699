//! Pitr reconciliation
//!
//! Each pass validates the spec, keeps the BackupSchedule's retention in
//! line with the recovery window, makes sure the current incarnation has an
//! initial backup, and publishes the windows the database can be recovered
//! into.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::api::{Api, ObjectMeta};
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info, instrument, warn};

use oradb_agent::AgentResolver;
use oradb_common::conditions::upsert_condition;
use oradb_common::crd::{
    reasons as condition_reasons, BackupPhase, BackupSchedule, BackupScheduleSpec, Condition,
    ConditionStatus, Instance, Pitr, PitrStatus,
};
use oradb_common::events::{actions, reasons, EventPublisher};
use oradb_common::kube_utils::{apply_resource, patch_resource_status};
use oradb_common::metrics::{record_pitr_backups, ReconcileTimer};
use oradb_common::{Error, PITR_LABEL, REQUEUE_SUCCESS_SECS};

use crate::ensurer::{backup_selector, ensure_initial_backup, BackupStore, EnsureOutcome};
use crate::retention::retention_count;
use crate::validation::validate_pitr_spec;
use crate::window::compute_windows;

/// Intervals used by the Pitr controller
#[derive(Clone, Debug)]
pub struct PitrConfig {
    /// Wait while the initial backup is being created
    pub ensure_requeue: Duration,
    /// Interval between window refreshes once ready
    pub refresh: Duration,
}

impl Default for PitrConfig {
    fn default() -> Self {
        Self {
            ensure_requeue: Duration::from_secs(30),
            refresh: Duration::from_secs(REQUEUE_SUCCESS_SECS),
        }
    }
}

/// Kubernetes operations the Pitr controller needs besides Backups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PitrKubeClient: Send + Sync {
    /// Get an Instance, `None` if it does not exist
    async fn get_instance(&self, name: &str, namespace: &str) -> Result<Option<Instance>, Error>;

    /// Server-side apply a BackupSchedule
    async fn apply_backup_schedule(
        &self,
        namespace: &str,
        schedule: &BackupSchedule,
    ) -> Result<(), Error>;

    /// Patch the status of a Pitr
    async fn patch_pitr_status(
        &self,
        name: &str,
        namespace: &str,
        status: &PitrStatus,
    ) -> Result<(), Error>;
}

/// [`PitrKubeClient`] backed by the API server
pub struct KubePitrClient {
    client: Client,
}

impl KubePitrClient {
    /// Wrap a client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PitrKubeClient for KubePitrClient {
    async fn get_instance(&self, name: &str, namespace: &str) -> Result<Option<Instance>, Error> {
        let api: Api<Instance> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn apply_backup_schedule(
        &self,
        namespace: &str,
        schedule: &BackupSchedule,
    ) -> Result<(), Error> {
        apply_resource(&self.client, namespace, schedule).await
    }

    async fn patch_pitr_status(
        &self,
        name: &str,
        namespace: &str,
        status: &PitrStatus,
    ) -> Result<(), Error> {
        patch_resource_status::<Pitr>(&self.client, name, namespace, status).await?;
        Ok(())
    }
}

/// Shared state for Pitr reconciles
pub struct PitrContext {
    /// Instance, BackupSchedule and status access
    pub kube: Arc<dyn PitrKubeClient>,
    /// Backup access
    pub backups: Arc<dyn BackupStore>,
    /// Agent lookup
    pub agents: Arc<dyn AgentResolver>,
    /// Event publishing
    pub events: Arc<dyn EventPublisher>,
    /// Intervals
    pub config: PitrConfig,
}

/// Name of the BackupSchedule applied for a Pitr
pub fn schedule_name(pitr: &str) -> String {
    format!("{pitr}-schedule")
}

/// Build the BackupSchedule for a Pitr
pub fn build_backup_schedule(pitr: &Pitr, retention: i64) -> BackupSchedule {
    let name = pitr.name_any();
    BackupSchedule {
        metadata: ObjectMeta {
            name: Some(schedule_name(&name)),
            namespace: pitr.namespace(),
            owner_references: pitr.controller_owner_ref(&()).map(|o| vec![o]),
            ..Default::default()
        },
        spec: BackupScheduleSpec {
            schedule: pitr.spec.backup_schedule.clone(),
            backup_retention: retention,
            instance: pitr.spec.instance_ref.clone(),
            backup_labels: BTreeMap::from([(PITR_LABEL.to_string(), name)]),
            storage_uri: Some(pitr.spec.storage_uri.clone()),
        },
    }
}

/// Reconcile a Pitr
#[instrument(skip(pitr, ctx), fields(pitr = %pitr.name_any()))]
pub async fn reconcile(pitr: Arc<Pitr>, ctx: Arc<PitrContext>) -> Result<Action, Error> {
    let timer = ReconcileTimer::start("pitr");
    let action = reconcile_inner(&pitr, &ctx).await?;
    timer.success();
    Ok(action)
}

async fn reconcile_inner(pitr: &Pitr, ctx: &PitrContext) -> Result<Action, Error> {
    let name = pitr.name_any();
    let namespace = pitr
        .namespace()
        .ok_or_else(|| Error::validation_for(&name, "Pitr has no namespace"))?;
    debug!("reconciling pitr");

    let inputs = match validate_pitr_spec(&pitr.spec) {
        Ok(inputs) => inputs,
        Err(errors) => {
            warn!(%errors, "pitr spec is invalid");
            ctx.events
                .publish(
                    &pitr.object_ref(&()),
                    EventType::Warning,
                    reasons::VALIDATION_FAILED,
                    actions::RECONCILE,
                    Some(errors.to_string()),
                )
                .await;
            let status = not_ready(pitr, condition_reasons::CREATE_PENDING, errors.to_string());
            ctx.kube.patch_pitr_status(&name, &namespace, &status).await?;
            return Ok(Action::await_change());
        }
    };

    let Some(instance) = ctx
        .kube
        .get_instance(&pitr.spec.instance_ref, &namespace)
        .await?
    else {
        let message = format!("Instance {} not found", pitr.spec.instance_ref);
        let status = not_ready(pitr, condition_reasons::CREATE_PENDING, message);
        ctx.kube.patch_pitr_status(&name, &namespace, &status).await?;
        return Ok(Action::requeue(ctx.config.ensure_requeue));
    };
    let Some(incarnation) = instance
        .status
        .as_ref()
        .and_then(|s| s.current_database_incarnation.clone())
    else {
        debug!(instance = %instance.name_any(), "instance has no incarnation yet");
        let message = format!(
            "Waiting for Instance {} to report its incarnation",
            instance.name_any()
        );
        let status = not_ready(pitr, condition_reasons::CREATE_IN_PROGRESS, message);
        ctx.kube.patch_pitr_status(&name, &namespace, &status).await?;
        return Ok(Action::requeue(ctx.config.ensure_requeue));
    };

    let retention =
        i64::try_from(retention_count(&inputs.schedule, inputs.window)).unwrap_or(i64::MAX);
    ctx.kube
        .apply_backup_schedule(&namespace, &build_backup_schedule(pitr, retention))
        .await?;

    let backups = match ensure_initial_backup(
        ctx.backups.as_ref(),
        ctx.events.as_ref(),
        pitr,
        &namespace,
        &incarnation,
        ctx.config.ensure_requeue,
    )
    .await?
    {
        EnsureOutcome::Proceed(backups) => backups,
        EnsureOutcome::Requeue(after) => {
            let message = format!("Waiting for a successful backup of incarnation {incarnation}");
            let mut status = not_ready(pitr, condition_reasons::CREATE_IN_PROGRESS, message);
            status.backup_retention = Some(retention);
            if pitr.status.as_ref() != Some(&status) {
                ctx.kube.patch_pitr_status(&name, &namespace, &status).await?;
            }
            return Ok(Action::requeue(after));
        }
    };

    let total = ctx
        .backups
        .list_backups(&namespace, &backup_selector(&name, None))
        .await?
        .len();
    let total = i64::try_from(total).unwrap_or(i64::MAX);
    record_pitr_backups(&namespace, &name, total);

    let agent = ctx
        .agents
        .resolve(&instance)
        .map_err(|e| e.into_common(&instance.name_any()))?;
    let ranges = agent
        .available_recovery_windows()
        .await
        .map_err(|e| e.into_common(&instance.name_any()))?;
    let windows = compute_windows(&backups, &ranges, &incarnation);

    let anchored = backups.iter().any(|b| b.phase() == BackupPhase::Succeeded);
    let mut status = pitr.status.clone().unwrap_or_default();
    let ready = if anchored {
        Condition::ready(
            ConditionStatus::True,
            condition_reasons::CREATE_COMPLETE,
            format!("{} recovery window(s) available", windows.time.len()),
        )
    } else {
        Condition::ready(
            ConditionStatus::False,
            condition_reasons::CREATE_IN_PROGRESS,
            format!("No successful backup of incarnation {incarnation} yet"),
        )
    };
    upsert_condition(&mut status.conditions, ready);
    status.available_recovery_window_time = windows.time;
    status.available_recovery_window_scn = windows.scn;
    status.current_database_incarnation = Some(windows.current_incarnation);
    status.backup_total = Some(total);
    status.backup_retention = Some(retention);
    status.observed_generation = pitr.metadata.generation;

    if pitr.status.as_ref() != Some(&status) {
        ctx.kube.patch_pitr_status(&name, &namespace, &status).await?;
        info!(
            windows = status.available_recovery_window_time.len(),
            backups = total,
            retention,
            "pitr status updated"
        );
    }
    Ok(Action::requeue(ctx.config.refresh))
}

fn not_ready(pitr: &Pitr, reason: &str, message: String) -> PitrStatus {
    let mut status = pitr.status.clone().unwrap_or_default();
    upsert_condition(
        &mut status.conditions,
        Condition::ready(ConditionStatus::False, reason, message),
    );
    status.observed_generation = pitr.metadata.generation;
    status
}

/// Error policy for the Pitr controller
pub fn error_policy(pitr: Arc<Pitr>, error: &Error, ctx: Arc<PitrContext>) -> Action {
    oradb_common::default_error_policy(pitr, error, ctx)
}

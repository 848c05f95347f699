//! Physical restore state machine
//!
//! A restore is requested by setting `spec.restore`. The request time is the
//! deduplication key: it is written to `status.lastRestoreTime` as soon as
//! the agent accepts the work, and the agent operation ID is derived from it,
//! so resubmitting after a crash lands on the same operation.
//!
//! ```text
//! spec.restore set ──► RestoreInProgress ──► RestoreComplete (Ready=True)
//!                             │         └──► RestoreFailed   (Ready=False)
//!                             └── later requestTime: old operation dropped,
//!                                 new one submitted
//! ```
//!
//! Terminal transitions write status first, then delete the agent operation,
//! then clear `spec.restore`. A pass interrupted part way repeats the
//! remaining steps, since a request at or before `lastRestoreTime` is only
//! ever cleaned up, never resubmitted.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, warn};

use oradb_agent::{AgentError, DatabaseAgent, Operation, OperationState, PhysicalRestoreRequest};
use oradb_common::conditions::{find_condition, upsert_condition};
use oradb_common::crd::{
    reasons as condition_reasons, Condition, ConditionStatus, Instance, InstanceStatus,
    RestoreSpec, READY_CONDITION,
};
use oradb_common::events::{actions, reasons};
use oradb_common::metrics::{record_restore, RestoreResult};

use crate::controller::InstanceContext;
use crate::error::InstanceError;

/// Agent operation ID for the restore requested at `request_time`
pub fn operation_id(instance: &Instance, request_time: DateTime<Utc>) -> String {
    let owner = instance.uid().unwrap_or_else(|| {
        format!(
            "{}.{}",
            instance.namespace().unwrap_or_default(),
            instance.name_any()
        )
    });
    format!("PhysicalRestore_{owner}_{}", request_time.timestamp_millis())
}

/// Request time of the restore currently being tracked, if any
pub fn tracked_restore(status: &InstanceStatus) -> Option<DateTime<Utc>> {
    let in_progress = find_condition(&status.conditions, READY_CONDITION)
        .is_some_and(|c| c.reason == condition_reasons::RESTORE_IN_PROGRESS);
    if in_progress {
        status.last_restore_time
    } else {
        None
    }
}

/// One reconcile pass over an Instance's restore
pub(crate) struct RestoreRun<'a> {
    instance: &'a Instance,
    name: String,
    namespace: &'a str,
    agent: &'a dyn DatabaseAgent,
    ctx: &'a InstanceContext,
    status: InstanceStatus,
}

impl<'a> RestoreRun<'a> {
    pub(crate) fn new(
        instance: &'a Instance,
        namespace: &'a str,
        agent: &'a dyn DatabaseAgent,
        ctx: &'a InstanceContext,
    ) -> Self {
        Self {
            instance,
            name: instance.name_any(),
            namespace,
            agent,
            ctx,
            status: instance.status.clone().unwrap_or_default(),
        }
    }

    /// Drive the restore one step; `None` when no restore is requested or
    /// being tracked
    pub(crate) async fn reconcile(&mut self) -> Result<Option<Action>, InstanceError> {
        let instance = self.instance;
        let requested = instance.spec.restore.as_ref();
        let tracked = tracked_restore(&self.status);

        let action = match (requested, tracked) {
            (Some(request), Some(last)) if request.request_time > last => {
                // The running restore stays tracked unless the new one may start
                self.ctx.preflight.check(instance, request).await?;
                self.supersede(last, request).await?;
                self.submit(request).await?
            }
            (_, Some(last)) => self.poll(last).await?,
            (Some(request), None) => {
                let processed = self
                    .status
                    .last_restore_time
                    .is_some_and(|t| request.request_time <= t);
                if processed {
                    self.discard(request).await?
                } else {
                    self.ctx.preflight.check(instance, request).await?;
                    self.submit(request).await?
                }
            }
            (None, None) => return Ok(None),
        };
        Ok(Some(action))
    }

    /// Hand the request to the agent; callers run preflight first
    async fn submit(&mut self, request: &RestoreSpec) -> Result<Action, InstanceError> {
        let id = operation_id(self.instance, request.request_time);
        let time_limit = request
            .time_limit_minutes
            .and_then(|m| u64::try_from(m).ok())
            .map(|m| Duration::from_secs(m * 60));
        let op = self
            .agent
            .physical_restore_async(PhysicalRestoreRequest {
                operation_id: id.clone(),
                backup_id: request.backup_id.clone(),
                backup_type: request.backup_type,
                dop: request.dop,
                time_limit,
            })
            .await?;
        info!(operation = %id, backup = %request.backup_id, state = %op.state, "restore submitted");

        self.status.last_restore_time = Some(request.request_time);
        self.status.restore_backup_id = Some(request.backup_id.clone());
        self.status.description = Some(format!(
            "Restore from backup {} started on {}",
            request.backup_id,
            now()
        ));
        upsert_condition(
            &mut self.status.conditions,
            Condition::ready(
                ConditionStatus::False,
                condition_reasons::RESTORE_IN_PROGRESS,
                format!("Restoring from backup {}", request.backup_id),
            ),
        );
        self.patch_status().await?;
        self.publish(
            EventType::Normal,
            reasons::RESTORE_STARTED,
            format!("Restore from backup {} started", request.backup_id),
        )
        .await;

        if op.is_done() {
            return self.finish(&id, op).await;
        }
        Ok(Action::requeue(self.ctx.config.restore_poll))
    }

    async fn poll(&mut self, request_time: DateTime<Utc>) -> Result<Action, InstanceError> {
        let id = operation_id(self.instance, request_time);
        let op = self.agent.get_operation(&id).await?;
        match op.state {
            OperationState::Pending | OperationState::Running => {
                debug!(operation = %id, state = %op.state, "restore still running");
                Ok(Action::requeue(self.ctx.config.restore_poll))
            }
            OperationState::Done | OperationState::DoneWithError | OperationState::NotFound => {
                self.finish(&id, op).await
            }
        }
    }

    /// Record the outcome, forget the operation and clear the request
    ///
    /// `NotFound` counts as success: agents that restore synchronously may
    /// keep no record of the work once it has finished.
    async fn finish(&mut self, id: &str, op: Operation) -> Result<Action, InstanceError> {
        let backup_id = self.status.restore_backup_id.clone().unwrap_or_default();
        let (event_type, reason, message) = if op.state == OperationState::DoneWithError {
            let error = op.error.unwrap_or_else(|| "unknown error".to_string());
            let message = format!("Failed to restore on {} from backup {backup_id}: {error}", now());
            upsert_condition(
                &mut self.status.conditions,
                Condition::ready(ConditionStatus::False, condition_reasons::RESTORE_FAILED, &message),
            );
            record_restore(RestoreResult::Failure);
            warn!(operation = %id, backup = %backup_id, %error, "restore failed");
            (EventType::Warning, reasons::RESTORE_FAILED, message)
        } else {
            let message = format!("Restored on {} from backup {backup_id}", now());
            upsert_condition(
                &mut self.status.conditions,
                Condition::ready(ConditionStatus::True, condition_reasons::RESTORE_COMPLETE, &message),
            );
            match self.agent.database_incarnation().await {
                Ok(incarnation) => self.status.current_database_incarnation = Some(incarnation),
                Err(e) => warn!(error = %e, "could not refresh incarnation after restore"),
            }
            record_restore(RestoreResult::Success);
            info!(operation = %id, backup = %backup_id, "restore complete");
            (EventType::Normal, reasons::RESTORE_COMPLETE, message)
        };
        self.status.description = Some(message.clone());

        self.patch_status().await?;
        self.delete_operation(id).await?;
        self.clear_request().await?;
        self.publish(event_type, reason, message).await;
        Ok(Action::requeue(self.ctx.config.refresh))
    }

    async fn supersede(
        &mut self,
        previous: DateTime<Utc>,
        request: &RestoreSpec,
    ) -> Result<(), InstanceError> {
        let old = operation_id(self.instance, previous);
        self.delete_operation(&old).await?;
        info!(operation = %old, requested = %request.request_time, "restore superseded");
        self.publish(
            EventType::Normal,
            reasons::RESTORE_SUPERSEDED,
            format!(
                "Restore requested at {previous} superseded by request at {}",
                request.request_time
            ),
        )
        .await;
        Ok(())
    }

    /// Clean up after a request that was already handled
    async fn discard(&mut self, request: &RestoreSpec) -> Result<Action, InstanceError> {
        debug!(requested = %request.request_time, "restore request already processed");
        self.delete_operation(&operation_id(self.instance, request.request_time))
            .await?;
        self.clear_request().await?;
        Ok(Action::requeue(self.ctx.config.refresh))
    }

    async fn delete_operation(&self, id: &str) -> Result<(), InstanceError> {
        match self.agent.delete_operation(id).await {
            Ok(()) | Err(AgentError::NotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear_request(&self) -> Result<(), InstanceError> {
        if self.instance.spec.restore.is_some() {
            self.ctx
                .kube
                .clear_restore_request(&self.name, self.namespace)
                .await?;
        }
        Ok(())
    }

    async fn patch_status(&mut self) -> Result<(), InstanceError> {
        self.status.observed_generation = self.instance.metadata.generation;
        self.ctx
            .kube
            .patch_instance_status(&self.name, self.namespace, &self.status)
            .await?;
        Ok(())
    }

    async fn publish(&self, type_: EventType, reason: &str, note: String) {
        self.ctx
            .events
            .publish(
                &self.instance.object_ref(&()),
                type_,
                reason,
                actions::RESTORE,
                Some(note),
            )
            .await;
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

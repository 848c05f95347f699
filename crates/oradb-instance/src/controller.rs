//! Instance reconciliation
//!
//! A requested or in-flight restore takes precedence. Otherwise the pass
//! probes the agent for the database incarnation, which doubles as the
//! readiness check.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, error, instrument};

use oradb_agent::{AgentResolver, DatabaseAgent};
use oradb_common::conditions::upsert_condition;
use oradb_common::crd::{
    reasons as condition_reasons, Condition, ConditionStatus, Instance, READY_CONDITION,
};
use oradb_common::events::EventPublisher;
use oradb_common::metrics::ReconcileTimer;
use oradb_common::{HasConditions, REQUEUE_ERROR_SECS, REQUEUE_SUCCESS_SECS};

use crate::client::InstanceKubeClient;
use crate::error::InstanceError;
use crate::preflight::RestorePreflight;
use crate::restore::RestoreRun;

/// Intervals used by the instance controller
#[derive(Clone, Debug)]
pub struct InstanceConfig {
    /// Poll interval while a restore is running
    pub restore_poll: Duration,
    /// Retry interval while the database is unreachable
    pub probe_retry: Duration,
    /// Interval between passes once settled
    pub refresh: Duration,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            restore_poll: Duration::from_secs(15),
            probe_retry: Duration::from_secs(REQUEUE_ERROR_SECS),
            refresh: Duration::from_secs(REQUEUE_SUCCESS_SECS),
        }
    }
}

/// Shared state for Instance reconciles
pub struct InstanceContext {
    /// Status and spec access
    pub kube: Arc<dyn InstanceKubeClient>,
    /// Agent lookup
    pub agents: Arc<dyn AgentResolver>,
    /// Checks run before each restore submission
    pub preflight: Arc<dyn RestorePreflight>,
    /// Event publishing
    pub events: Arc<dyn EventPublisher>,
    /// Intervals
    pub config: InstanceConfig,
}

/// Reconcile an Instance
#[instrument(skip(instance, ctx), fields(instance = %instance.name_any()))]
pub async fn reconcile(
    instance: Arc<Instance>,
    ctx: Arc<InstanceContext>,
) -> Result<Action, InstanceError> {
    let timer = ReconcileTimer::start("instance");
    let namespace = instance.namespace().ok_or(InstanceError::MissingNamespace)?;
    let agent = ctx.agents.resolve(&instance)?;

    let mut restore = RestoreRun::new(&instance, &namespace, agent.as_ref(), &ctx);
    let action = match restore.reconcile().await? {
        Some(action) => action,
        None => probe(&instance, &namespace, agent.as_ref(), &ctx).await?,
    };
    timer.success();
    Ok(action)
}

/// Refresh readiness and incarnation from the agent
async fn probe(
    instance: &Instance,
    namespace: &str,
    agent: &dyn DatabaseAgent,
    ctx: &InstanceContext,
) -> Result<Action, InstanceError> {
    let mut status = instance.status.clone().unwrap_or_default();
    let action = match agent.database_incarnation().await {
        Ok(incarnation) => {
            status.current_database_incarnation = Some(incarnation);
            // A finished restore keeps its outcome visible
            let showing_restore_outcome = instance.condition(READY_CONDITION).is_some_and(|c| {
                c.reason == condition_reasons::RESTORE_COMPLETE
                    || c.reason == condition_reasons::RESTORE_FAILED
            });
            if !showing_restore_outcome {
                upsert_condition(
                    &mut status.conditions,
                    Condition::ready(
                        ConditionStatus::True,
                        condition_reasons::CREATE_COMPLETE,
                        "Database is open",
                    ),
                );
            }
            Action::requeue(ctx.config.refresh)
        }
        Err(e) if e.is_retryable() => {
            debug!(error = %e, "database not reachable yet");
            upsert_condition(
                &mut status.conditions,
                Condition::ready(
                    ConditionStatus::False,
                    condition_reasons::CREATE_IN_PROGRESS,
                    format!("Waiting for the database: {e}"),
                ),
            );
            Action::requeue(ctx.config.probe_retry)
        }
        Err(e) => return Err(e.into()),
    };
    status.observed_generation = instance.metadata.generation;

    if instance.status.as_ref() != Some(&status) {
        ctx.kube
            .patch_instance_status(&instance.name_any(), namespace, &status)
            .await?;
    }
    Ok(action)
}

/// Error policy for the instance controller
///
/// Retryable errors requeue after a fixed backoff; anything else only clears
/// once the Instance is edited, so it requeues on the slower refresh interval.
pub fn error_policy(
    instance: Arc<Instance>,
    error: &InstanceError,
    _ctx: Arc<InstanceContext>,
) -> Action {
    error!(
        ?error,
        instance = %instance.name_any(),
        retryable = error.is_retryable(),
        "reconciliation failed"
    );
    if error.is_retryable() {
        Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS))
    } else {
        Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};
    use kube::api::ObjectMeta;
    use oradb_agent::testing::{ScriptedRuntime, StaticAgentResolver};
    use oradb_agent::{AgentError, LocalAgent, OperationState};
    use oradb_common::crd::{BackupType, InstanceSpec, InstanceStatus, RestoreSpec};
    use oradb_common::events::{reasons, RecordingEventPublisher};
    use parking_lot::Mutex;
    use rstest::rstest;

    use crate::client::MockInstanceKubeClient;
    use crate::preflight::MockRestorePreflight;
    use crate::restore::operation_id;

    const WAIT: Duration = Duration::from_secs(5);
    const T1: i64 = 1_700_000_000;
    const T2: i64 = 1_700_003_600;

    fn at(ts: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(ts, 0).unwrap()
    }

    fn restore_at(ts: i64) -> RestoreSpec {
        RestoreSpec {
            backup_id: "bkp-42".into(),
            backup_type: BackupType::Physical,
            force: true,
            request_time: at(ts),
            dop: Some(4),
            time_limit_minutes: Some(120),
        }
    }

    fn instance(restore: Option<RestoreSpec>) -> Instance {
        Instance {
            metadata: ObjectMeta {
                name: Some("mydb".into()),
                namespace: Some("db".into()),
                uid: Some("inst-uid".into()),
                generation: Some(3),
                ..Default::default()
            },
            spec: InstanceSpec {
                cdb_name: "ORCL".into(),
                db_domain: None,
                agent_endpoint: None,
                restore,
            },
            status: None,
        }
    }

    fn with_ready(
        mut inst: Instance,
        status: ConditionStatus,
        reason: &str,
        last_restore: Option<i64>,
    ) -> Instance {
        let mut s = InstanceStatus {
            last_restore_time: last_restore.map(at),
            restore_backup_id: last_restore.map(|_| "bkp-42".to_string()),
            ..Default::default()
        };
        upsert_condition(&mut s.conditions, Condition::ready(status, reason, ""));
        inst.status = Some(s);
        inst
    }

    /// Kubernetes, agent and event fakes wired into one context
    struct World {
        runtime: Arc<ScriptedRuntime>,
        agent: Arc<LocalAgent<ScriptedRuntime>>,
        statuses: Arc<Mutex<Vec<InstanceStatus>>>,
        clears: Arc<AtomicUsize>,
        events: Arc<RecordingEventPublisher>,
        ctx: Arc<InstanceContext>,
    }

    /// World whose first `failed_patches` status writes are rejected
    fn world_with(
        runtime: ScriptedRuntime,
        preflight: MockRestorePreflight,
        failed_patches: usize,
    ) -> World {
        let runtime = Arc::new(runtime);
        let agent = Arc::new(LocalAgent::new(Arc::clone(&runtime)));
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let clears = Arc::new(AtomicUsize::new(0));
        let events = Arc::new(RecordingEventPublisher::default());

        let mut kube = MockInstanceKubeClient::new();
        let recorded = Arc::clone(&statuses);
        let rejections = AtomicUsize::new(failed_patches);
        kube.expect_patch_instance_status()
            .returning(move |_, _, s| {
                let rejected = rejections
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if rejected {
                    return Err(oradb_common::Error::internal("apiserver unavailable"));
                }
                recorded.lock().push(s.clone());
                Ok(())
            });
        let cleared = Arc::clone(&clears);
        kube.expect_clear_restore_request().returning(move |_, _| {
            cleared.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let ctx = Arc::new(InstanceContext {
            kube: Arc::new(kube),
            agents: Arc::new(StaticAgentResolver::new(agent.clone())),
            preflight: Arc::new(preflight),
            events: events.clone(),
            config: InstanceConfig::default(),
        });
        World {
            runtime,
            agent,
            statuses,
            clears,
            events,
            ctx,
        }
    }

    fn world(runtime: ScriptedRuntime) -> World {
        let mut preflight = MockRestorePreflight::new();
        preflight.expect_check().returning(|_, _| Ok(()));
        world_with(runtime, preflight, 0)
    }

    impl World {
        /// Reconcile and apply the resulting status and spec patches
        async fn reconcile(&self, inst: &mut Instance) -> Action {
            let patched_before = self.statuses.lock().len();
            let cleared_before = self.clears.load(Ordering::SeqCst);

            let action = reconcile(Arc::new(inst.clone()), Arc::clone(&self.ctx))
                .await
                .unwrap();

            if self.statuses.lock().len() > patched_before {
                inst.status = self.statuses.lock().last().cloned();
            }
            if self.clears.load(Ordering::SeqCst) > cleared_before {
                inst.spec.restore = None;
            }
            action
        }

        fn operation_state(&self, inst: &Instance, ts: i64) -> OperationState {
            self.agent
                .operations()
                .get(&operation_id(inst, at(ts)))
                .state
        }
    }

    fn ready(inst: &Instance) -> Condition {
        inst.condition(READY_CONDITION).cloned().unwrap()
    }

    fn description(inst: &Instance) -> String {
        inst.status
            .as_ref()
            .and_then(|s| s.description.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Restore stories
    // =========================================================================

    /// Story: a restore is submitted, polled while running, and cleaned up
    /// once done
    #[tokio::test]
    async fn story_restore_runs_to_completion() {
        let w = world(ScriptedRuntime::new().held());
        let mut inst = instance(Some(restore_at(T1)));

        let action = w.reconcile(&mut inst).await;
        assert_eq!(action, Action::requeue(Duration::from_secs(15)));
        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_IN_PROGRESS);
        assert_eq!(ready(&inst).status, ConditionStatus::False);
        let status = inst.status.clone().unwrap();
        assert_eq!(status.last_restore_time, Some(at(T1)));
        assert_eq!(status.restore_backup_id.as_deref(), Some("bkp-42"));
        assert_eq!(status.observed_generation, Some(3));
        assert!(inst.spec.restore.is_some());

        let action = w.reconcile(&mut inst).await;
        assert_eq!(action, Action::requeue(Duration::from_secs(15)));
        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_IN_PROGRESS);

        w.runtime.set_incarnation(Some("2"));
        w.runtime.release();
        let id = operation_id(&inst, at(T1));
        w.agent.operations().wait_terminal(&id, WAIT).await.unwrap();

        let action = w.reconcile(&mut inst).await;
        assert_eq!(action, Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS)));
        assert_eq!(ready(&inst).status, ConditionStatus::True);
        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_COMPLETE);
        assert!(description(&inst).contains("Restored on"));
        assert!(description(&inst).contains("bkp-42"));
        assert_eq!(
            inst.status.as_ref().unwrap().current_database_incarnation.as_deref(),
            Some("2")
        );
        assert!(inst.spec.restore.is_none());
        assert_eq!(w.operation_state(&inst, T1), OperationState::NotFound);
        assert_eq!(w.runtime.restore_count(), 1);
        assert_eq!(
            w.events.reasons(),
            vec![reasons::RESTORE_STARTED, reasons::RESTORE_COMPLETE]
        );
    }

    /// Story: an agent-side failure becomes a terminal RestoreFailed and the
    /// request is still cleared
    #[tokio::test]
    async fn story_failed_restore_is_terminal() {
        let w = world(ScriptedRuntime::new().failing_restores("RMAN-03002: failure of restore"));
        let mut inst = instance(Some(restore_at(T1)));

        w.reconcile(&mut inst).await;
        let id = operation_id(&inst, at(T1));
        let done = w.agent.operations().wait_terminal(&id, WAIT).await.unwrap();
        assert_eq!(done.state, OperationState::DoneWithError);

        w.reconcile(&mut inst).await;

        let cond = ready(&inst);
        assert_eq!(cond.status, ConditionStatus::False);
        assert_eq!(cond.reason, condition_reasons::RESTORE_FAILED);
        assert!(cond.message.contains("Failed to restore on"));
        assert!(description(&inst).contains("Failed to restore on"));
        assert!(description(&inst).contains("bkp-42"));
        assert!(description(&inst).contains("RMAN-03002"));
        assert!(inst.spec.restore.is_none());
        assert_eq!(w.operation_state(&inst, T1), OperationState::NotFound);
        let events = w.events.events();
        assert_eq!(events.last().map(|e| e.reason.as_str()), Some(reasons::RESTORE_FAILED));
        assert!(events.last().unwrap().warning);
    }

    /// Story: re-reconciling a request that was already handled never
    /// submits another restore, whatever its outcome was
    #[rstest]
    #[case(ConditionStatus::True, condition_reasons::RESTORE_COMPLETE)]
    #[case(ConditionStatus::False, condition_reasons::RESTORE_FAILED)]
    #[tokio::test]
    async fn story_processed_request_is_not_resubmitted(
        #[case] status: ConditionStatus,
        #[case] reason: &str,
    ) {
        let w = world(ScriptedRuntime::new());
        let mut inst = with_ready(instance(Some(restore_at(T1))), status, reason, Some(T1));

        w.reconcile(&mut inst).await;

        assert_eq!(w.runtime.restore_count(), 0);
        assert!(w.agent.operations().is_empty());
        assert!(inst.spec.restore.is_none());
        assert_eq!(w.clears.load(Ordering::SeqCst), 1);

        // The probe that follows keeps the outcome on display
        w.reconcile(&mut inst).await;
        assert_eq!(ready(&inst).reason, reason);
        assert_eq!(
            inst.status.as_ref().unwrap().current_database_incarnation.as_deref(),
            Some("1")
        );
        assert_eq!(w.runtime.restore_count(), 0);
    }

    /// Story: reconciling repeatedly while a restore runs polls the same
    /// operation instead of starting another
    #[tokio::test]
    async fn story_in_flight_restore_is_not_resubmitted() {
        let w = world(ScriptedRuntime::new().held());
        let mut inst = instance(Some(restore_at(T1)));

        for _ in 0..3 {
            w.reconcile(&mut inst).await;
        }
        assert_eq!(w.agent.operations().len(), 1);

        w.runtime.release();
        let id = operation_id(&inst, at(T1));
        w.agent.operations().wait_terminal(&id, WAIT).await.unwrap();
        assert_eq!(w.runtime.restore_count(), 1);
        assert_eq!(w.events.reasons(), vec![reasons::RESTORE_STARTED]);
    }

    /// Story: with a synchronous agent, each new request time restores once
    /// and stale repeats do nothing
    #[tokio::test]
    async fn story_later_request_restores_again() {
        let w = world(ScriptedRuntime::new().synchronous());
        let mut inst = instance(Some(restore_at(T1)));

        let action = w.reconcile(&mut inst).await;
        assert_eq!(action, Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS)));
        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_COMPLETE);
        assert!(inst.spec.restore.is_none());
        assert_eq!(w.runtime.restore_count(), 1);

        inst.spec.restore = Some(restore_at(T2));
        w.reconcile(&mut inst).await;
        assert_eq!(w.runtime.restore_count(), 2);
        assert_eq!(inst.status.as_ref().unwrap().last_restore_time, Some(at(T2)));
        assert!(inst.spec.restore.is_none());

        inst.spec.restore = Some(restore_at(T2));
        w.reconcile(&mut inst).await;
        assert_eq!(w.runtime.restore_count(), 2);
        assert!(inst.spec.restore.is_none());
    }

    /// Story: a newer request while a restore is running drops the old
    /// operation and tracks the new one
    #[tokio::test]
    async fn story_newer_request_supersedes_running_restore() {
        let w = world(ScriptedRuntime::new().held());
        let mut inst = instance(Some(restore_at(T1)));
        w.reconcile(&mut inst).await;
        assert_ne!(w.operation_state(&inst, T1), OperationState::NotFound);

        inst.spec.restore = Some(restore_at(T2));
        let action = w.reconcile(&mut inst).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(15)));
        assert_eq!(w.operation_state(&inst, T1), OperationState::NotFound);
        assert_ne!(w.operation_state(&inst, T2), OperationState::NotFound);
        assert_eq!(inst.status.as_ref().unwrap().last_restore_time, Some(at(T2)));
        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_IN_PROGRESS);
        assert!(w.events.reasons().contains(&reasons::RESTORE_SUPERSEDED.to_string()));
        w.runtime.release();
    }

    /// Story: a newer request that fails preflight leaves the running restore
    /// tracked, so its real outcome is still reported
    #[tokio::test]
    async fn story_rejected_newer_request_keeps_running_restore() {
        let calls = AtomicUsize::new(0);
        let mut preflight = MockRestorePreflight::new();
        preflight.expect_check().returning(move |_, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(())
            } else {
                Err(InstanceError::preflight("backup bkp-42 is InProgress"))
            }
        });
        let w = world_with(
            ScriptedRuntime::new()
                .held()
                .failing_restores("RMAN-03002: failure of restore"),
            preflight,
            0,
        );
        let mut inst = instance(Some(restore_at(T1)));
        w.reconcile(&mut inst).await;

        inst.spec.restore = Some(restore_at(T2));
        let err = reconcile(Arc::new(inst.clone()), Arc::clone(&w.ctx))
            .await
            .unwrap_err();
        assert!(matches!(err, InstanceError::Preflight { .. }));
        assert_ne!(w.operation_state(&inst, T1), OperationState::NotFound);
        assert_eq!(w.operation_state(&inst, T2), OperationState::NotFound);
        assert_eq!(inst.status.as_ref().unwrap().last_restore_time, Some(at(T1)));
        assert!(!w.events.reasons().contains(&reasons::RESTORE_SUPERSEDED.to_string()));

        // The newer request is withdrawn and the original restore fails
        inst.spec.restore = None;
        w.runtime.release();
        let id = operation_id(&inst, at(T1));
        w.agent.operations().wait_terminal(&id, WAIT).await.unwrap();
        w.reconcile(&mut inst).await;

        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_FAILED);
        assert!(description(&inst).contains("RMAN-03002"));
        assert!(!description(&inst).contains("Restored on"));
        assert_eq!(w.runtime.restore_count(), 1);
    }

    /// Story: the status write after a synchronous restore is lost; the
    /// next pass reports the finished restore without running it again
    #[tokio::test]
    async fn story_lost_status_write_does_not_restore_twice() {
        let mut preflight = MockRestorePreflight::new();
        preflight.expect_check().returning(|_, _| Ok(()));
        let w = world_with(ScriptedRuntime::new().synchronous(), preflight, 1);
        let mut inst = instance(Some(restore_at(T1)));

        let err = reconcile(Arc::new(inst.clone()), Arc::clone(&w.ctx))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(w.runtime.restore_count(), 1);
        assert!(inst.status.is_none());

        w.reconcile(&mut inst).await;

        assert_eq!(w.runtime.restore_count(), 1);
        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_COMPLETE);
        assert_eq!(inst.status.as_ref().unwrap().last_restore_time, Some(at(T1)));
        assert!(inst.spec.restore.is_none());
        assert_eq!(w.operation_state(&inst, T1), OperationState::NotFound);
    }

    /// Story: the agent restored synchronously and kept no record; polling
    /// finds nothing and treats the restore as done
    #[tokio::test]
    async fn story_missing_operation_counts_as_complete() {
        let w = world(ScriptedRuntime::new());
        let mut inst = with_ready(
            instance(Some(restore_at(T1))),
            ConditionStatus::False,
            condition_reasons::RESTORE_IN_PROGRESS,
            Some(T1),
        );

        w.reconcile(&mut inst).await;

        assert_eq!(ready(&inst).reason, condition_reasons::RESTORE_COMPLETE);
        assert!(description(&inst).contains("Restored on"));
        assert!(description(&inst).contains("bkp-42"));
        assert!(inst.spec.restore.is_none());
        assert_eq!(w.runtime.restore_count(), 0);
    }

    /// Story: a failed preflight leaves the agent and status untouched and
    /// surfaces as a retryable error
    #[tokio::test]
    async fn story_preflight_failure_submits_nothing() {
        let mut preflight = MockRestorePreflight::new();
        preflight
            .expect_check()
            .returning(|_, _| Err(InstanceError::preflight("backup bkp-42 is InProgress")));
        let w = world_with(ScriptedRuntime::new(), preflight, 0);
        let inst = instance(Some(restore_at(T1)));

        let err = reconcile(Arc::new(inst), Arc::clone(&w.ctx))
            .await
            .unwrap_err();

        assert!(matches!(err, InstanceError::Preflight { .. }));
        assert!(err.is_retryable());
        assert!(w.statuses.lock().is_empty());
        assert!(w.agent.operations().is_empty());
        assert_eq!(w.clears.load(Ordering::SeqCst), 0);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    #[tokio::test]
    async fn open_database_is_ready() {
        let w = world(ScriptedRuntime::new().with_incarnation("7"));
        let mut inst = instance(None);

        let action = w.reconcile(&mut inst).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS)));
        assert_eq!(ready(&inst).status, ConditionStatus::True);
        assert_eq!(ready(&inst).reason, condition_reasons::CREATE_COMPLETE);
        assert_eq!(
            inst.status.as_ref().unwrap().current_database_incarnation.as_deref(),
            Some("7")
        );
    }

    #[tokio::test]
    async fn unreachable_database_is_in_progress() {
        let w = world(ScriptedRuntime::new());
        w.runtime.set_incarnation(None);
        let mut inst = instance(None);

        let action = w.reconcile(&mut inst).await;

        assert_eq!(action, Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS)));
        assert_eq!(ready(&inst).status, ConditionStatus::False);
        assert_eq!(ready(&inst).reason, condition_reasons::CREATE_IN_PROGRESS);
    }

    #[tokio::test]
    async fn settled_instance_is_not_patched_again() {
        let w = world(ScriptedRuntime::new());
        let mut inst = instance(None);
        w.reconcile(&mut inst).await;
        assert_eq!(w.statuses.lock().len(), 1);

        w.reconcile(&mut inst).await;
        assert_eq!(w.statuses.lock().len(), 1);
    }

    #[rstest]
    #[case(InstanceError::from(AgentError::Unavailable("down".into())), Action::requeue(Duration::from_secs(REQUEUE_ERROR_SECS)))]
    #[case(InstanceError::MissingNamespace, Action::requeue(Duration::from_secs(REQUEUE_SUCCESS_SECS)))]
    fn error_policy_backs_off_by_retryability(
        #[case] error: InstanceError,
        #[case] expected: Action,
    ) {
        let w = world(ScriptedRuntime::new());
        let action = error_policy(Arc::new(instance(None)), &error, Arc::clone(&w.ctx));
        assert_eq!(action, expected);
    }
}

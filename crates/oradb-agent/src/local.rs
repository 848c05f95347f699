//! In-process agent hosted by the database sidecar
//!
//! Restore work goes to the operation registry and runs on its own task, so
//! the submitting RPC returns immediately. Runtimes that restore within the
//! request wait for the registered operation and hand back its terminal
//! state; the record stays until deleted, so a resubmission does not run the
//! restore again.

use std::sync::Arc;

use async_trait::async_trait;
use oradb_lro::{Operation, OperationKind, OperationRegistry, OperationState};
use tracing::{info, instrument, warn};

use crate::client::DatabaseAgent;
use crate::sid::SidHolder;
use crate::types::{PhysicalRestoreRequest, RecoverableRange};
use crate::AgentError;

/// What the agent needs from the database host
#[async_trait]
pub trait DatabaseRuntime: Send + Sync + 'static {
    /// True when restores finish within the submitting call
    fn synchronous_restore(&self) -> bool {
        false
    }

    /// Find the SID of the running database
    async fn discover_sid(&self) -> Result<String, AgentError>;

    /// Restore and recover the database identified by `sid`
    async fn restore(&self, sid: &str, request: &PhysicalRestoreRequest)
        -> Result<(), AgentError>;

    /// Ranges the database can be recovered into
    async fn recovery_ranges(&self, sid: &str) -> Result<Vec<RecoverableRange>, AgentError>;

    /// Current incarnation of the database
    async fn incarnation(&self, sid: &str) -> Result<String, AgentError>;
}

/// [`DatabaseAgent`] backed by a local [`DatabaseRuntime`]
pub struct LocalAgent<R: DatabaseRuntime> {
    runtime: Arc<R>,
    operations: OperationRegistry,
    sid: Arc<SidHolder>,
}

impl<R: DatabaseRuntime> LocalAgent<R> {
    /// Agent over `runtime` with an empty registry and undiscovered SID
    pub fn new(runtime: Arc<R>) -> Self {
        Self {
            runtime,
            operations: OperationRegistry::new(),
            sid: Arc::new(SidHolder::new()),
        }
    }

    /// Operation registry, for diagnostics
    pub fn operations(&self) -> &OperationRegistry {
        &self.operations
    }

    /// SID holder shared with other handlers on this host
    pub fn sid(&self) -> Arc<SidHolder> {
        Arc::clone(&self.sid)
    }

    async fn ensure_sid(&self) -> Result<(), AgentError> {
        let runtime = Arc::clone(&self.runtime);
        self.sid
            .get_or_init(|| async move { runtime.discover_sid().await })
            .await
            .map(|_| ())
    }
}

/// One restore from start to finish
///
/// The SID read lock covers only the runtime call; rediscovery afterwards
/// takes the write lock once the read lock has been released.
async fn restore_once<R: DatabaseRuntime>(
    runtime: Arc<R>,
    sid: Arc<SidHolder>,
    request: PhysicalRestoreRequest,
) -> Result<(), AgentError> {
    let rt = Arc::clone(&runtime);
    let req = request.clone();
    sid.with_sid(|s| async move { rt.restore(&s.value, &req).await })
        .await?;

    match runtime.discover_sid().await {
        Ok(current) => {
            sid.replace(current).await;
        }
        Err(e) => warn!(error = %e, "could not rediscover SID after restore"),
    }
    Ok(())
}

#[async_trait]
impl<R: DatabaseRuntime> DatabaseAgent for LocalAgent<R> {
    #[instrument(skip(self, request), fields(operation = %request.operation_id, backup = %request.backup_id))]
    async fn physical_restore_async(
        &self,
        request: PhysicalRestoreRequest,
    ) -> Result<Operation, AgentError> {
        self.ensure_sid().await?;

        let runtime = Arc::clone(&self.runtime);
        let sid = self.sid();
        let id = request.operation_id.clone();
        let work = move || async move {
            restore_once(runtime, sid, request)
                .await
                .map(|()| None)
                .map_err(|e| e.to_string())
        };

        if self.runtime.synchronous_restore() {
            info!("running restore synchronously");
            return Ok(self
                .operations
                .create_and_wait(id, OperationKind::PhysicalRestore, work)
                .await);
        }
        Ok(self
            .operations
            .create(id, OperationKind::PhysicalRestore, work))
    }

    async fn get_operation(&self, id: &str) -> Result<Operation, AgentError> {
        Ok(self.operations.get(id))
    }

    async fn delete_operation(&self, id: &str) -> Result<(), AgentError> {
        self.operations
            .delete(id)
            .map_err(|e| AgentError::NotFound(e.to_string()))
    }

    async fn available_recovery_windows(&self) -> Result<Vec<RecoverableRange>, AgentError> {
        self.ensure_sid().await?;
        let runtime = Arc::clone(&self.runtime);
        self.sid
            .with_sid(|s| async move { runtime.recovery_ranges(&s.value).await })
            .await
    }

    async fn database_incarnation(&self) -> Result<String, AgentError> {
        self.ensure_sid().await?;
        let runtime = Arc::clone(&self.runtime);
        self.sid
            .with_sid(|s| async move { runtime.incarnation(&s.value).await })
            .await
    }
}

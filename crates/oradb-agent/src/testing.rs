//! In-memory fakes for tests in this and dependent crates

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use oradb_common::crd::Instance;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::client::DatabaseAgent;
use crate::local::DatabaseRuntime;
use crate::resolver::AgentResolver;
use crate::types::{PhysicalRestoreRequest, RecoverableRange};
use crate::AgentError;

/// Scripted [`DatabaseRuntime`]
///
/// Counts restores, can hold them open until [`ScriptedRuntime::release`],
/// and answers queries from canned values.
pub struct ScriptedRuntime {
    synchronous: bool,
    held: AtomicBool,
    released: Notify,
    restore_error: Option<String>,
    restores: AtomicUsize,
    ranges: Mutex<Vec<RecoverableRange>>,
    incarnation: Mutex<Option<String>>,
    sid_discoveries: AtomicUsize,
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedRuntime {
    /// Runtime whose restores succeed asynchronously, incarnation "1"
    pub fn new() -> Self {
        Self {
            synchronous: false,
            held: AtomicBool::new(false),
            released: Notify::new(),
            restore_error: None,
            restores: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
            incarnation: Mutex::new(Some("1".to_string())),
            sid_discoveries: AtomicUsize::new(0),
        }
    }

    /// Restores finish within the submitting call
    pub fn synchronous(mut self) -> Self {
        self.synchronous = true;
        self
    }

    /// Restores block until [`ScriptedRuntime::release`]
    pub fn held(self) -> Self {
        self.held.store(true, Ordering::SeqCst);
        self
    }

    /// Restores fail with `message`
    pub fn failing_restores(mut self, message: impl Into<String>) -> Self {
        self.restore_error = Some(message.into());
        self
    }

    /// Ranges reported by `recovery_ranges`
    pub fn with_ranges(self, ranges: Vec<RecoverableRange>) -> Self {
        *self.ranges.lock() = ranges;
        self
    }

    /// Incarnation reported by `incarnation`
    pub fn with_incarnation(self, incarnation: impl Into<String>) -> Self {
        *self.incarnation.lock() = Some(incarnation.into());
        self
    }

    /// Let held restores finish
    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
    }

    /// Make the database unreachable (`None`) or report a new incarnation
    pub fn set_incarnation(&self, incarnation: Option<&str>) {
        *self.incarnation.lock() = incarnation.map(String::from);
    }

    /// Restores started so far
    pub fn restore_count(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    async fn wait_released(&self) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.held.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl DatabaseRuntime for ScriptedRuntime {
    fn synchronous_restore(&self) -> bool {
        self.synchronous
    }

    async fn discover_sid(&self) -> Result<String, AgentError> {
        let n = self.sid_discoveries.fetch_add(1, Ordering::SeqCst);
        Ok(format!("ORCL{n}"))
    }

    async fn restore(
        &self,
        _sid: &str,
        _request: &PhysicalRestoreRequest,
    ) -> Result<(), AgentError> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        self.wait_released().await;
        match &self.restore_error {
            Some(message) => Err(AgentError::Runtime(message.clone())),
            None => Ok(()),
        }
    }

    async fn recovery_ranges(&self, _sid: &str) -> Result<Vec<RecoverableRange>, AgentError> {
        Ok(self.ranges.lock().clone())
    }

    async fn incarnation(&self, _sid: &str) -> Result<String, AgentError> {
        self.incarnation
            .lock()
            .clone()
            .ok_or_else(|| AgentError::Unavailable("database is not open".into()))
    }
}

/// Resolver returning the same agent for every Instance
pub struct StaticAgentResolver {
    agent: Arc<dyn DatabaseAgent>,
}

impl StaticAgentResolver {
    /// Resolve every Instance to `agent`
    pub fn new(agent: Arc<dyn DatabaseAgent>) -> Self {
        Self { agent }
    }
}

impl AgentResolver for StaticAgentResolver {
    fn resolve(&self, _instance: &Instance) -> Result<Arc<dyn DatabaseAgent>, AgentError> {
        Ok(Arc::clone(&self.agent))
    }
}

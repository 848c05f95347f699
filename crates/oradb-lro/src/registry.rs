//! In-memory operation registry
//!
//! Records live in a `DashMap` keyed by operation ID. The map's entry API
//! decides which caller creates a record, so concurrent `create` calls with
//! one ID race on the shard lock and only the winner spawns work. Each
//! record's progress sits behind its own `parking_lot::RwLock`; the shard
//! lock is never held while that lock is taken for writing.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::{OperationError, OperationKind, OperationState};

/// Outcome of a unit of work: an optional result summary or an error message
pub type WorkResult = Result<Option<String>, String>;

/// Point-in-time view of an operation
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// Caller-chosen ID
    pub id: String,
    /// What the operation does; `None` when the ID is unknown
    pub kind: Option<OperationKind>,
    /// Current state
    pub state: OperationState,
    /// Result summary once done
    pub result: Option<String>,
    /// Error message once done with error
    pub error: Option<String>,
    /// When the operation was registered
    pub created_at: Option<DateTime<Utc>>,
    /// When the work finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl Operation {
    /// View of an ID with no record
    pub fn not_found(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: None,
            state: OperationState::NotFound,
            result: None,
            error: None,
            created_at: None,
            finished_at: None,
        }
    }

    /// True once the work can no longer change state
    pub fn is_done(&self) -> bool {
        self.state.is_terminal()
    }
}

struct Progress {
    state: OperationState,
    result: Option<String>,
    error: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

struct Record {
    kind: OperationKind,
    created_at: DateTime<Utc>,
    progress: RwLock<Progress>,
    finished: Notify,
}

impl Record {
    fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            created_at: Utc::now(),
            progress: RwLock::new(Progress {
                state: OperationState::Pending,
                result: None,
                error: None,
                finished_at: None,
            }),
            finished: Notify::new(),
        }
    }

    fn snapshot(&self, id: &str) -> Operation {
        let p = self.progress.read();
        Operation {
            id: id.to_string(),
            kind: Some(self.kind),
            state: p.state,
            result: p.result.clone(),
            error: p.error.clone(),
            created_at: Some(self.created_at),
            finished_at: p.finished_at,
        }
    }

    fn is_terminal(&self) -> bool {
        self.progress.read().state.is_terminal()
    }

    fn start(&self) {
        self.progress.write().state = OperationState::Running;
    }

    fn finish(&self, outcome: WorkResult) {
        {
            let mut p = self.progress.write();
            match outcome {
                Ok(result) => {
                    p.state = OperationState::Done;
                    p.result = result;
                }
                Err(error) => {
                    p.state = OperationState::DoneWithError;
                    p.error = Some(error);
                }
            }
            p.finished_at = Some(Utc::now());
        }
        self.finished.notify_waiters();
    }
}

/// Registry of long-running operations
///
/// Cheap to clone; clones share the same records.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    ops: Arc<DashMap<String, Arc<Record>>>,
}

impl OperationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` and start `work` on a background task
    ///
    /// If `id` is already registered, `work` is dropped without running and
    /// the existing operation is returned. Must be called from within a
    /// tokio runtime.
    pub fn create<F, Fut>(&self, id: impl Into<String>, kind: OperationKind, work: F) -> Operation
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        let id = id.into();
        let record = match self.ops.entry(id.clone()) {
            Entry::Occupied(existing) => {
                debug!(operation = %id, %kind, "operation already registered");
                return existing.get().snapshot(&id);
            }
            Entry::Vacant(slot) => {
                let record = Arc::new(Record::new(kind));
                slot.insert(Arc::clone(&record));
                record
            }
        };

        let snapshot = record.snapshot(&id);
        info!(operation = %id, %kind, "operation registered");
        tokio::spawn(run(id, record, work));
        snapshot
    }

    /// Register `id`, run `work` and return once it is terminal
    ///
    /// A repeated call with a registered ID waits on the existing operation
    /// instead of running `work` again.
    pub async fn create_and_wait<F, Fut>(
        &self,
        id: impl Into<String>,
        kind: OperationKind,
        work: F,
    ) -> Operation
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        let op = self.create(id, kind, work);
        let Some(record) = self.ops.get(&op.id).map(|r| Arc::clone(r.value())) else {
            return op;
        };
        settled(&record).await;
        record.snapshot(&op.id)
    }

    /// Current view of `id`; `NotFound` state for unknown IDs
    pub fn get(&self, id: &str) -> Operation {
        self.ops
            .get(id)
            .map(|r| r.value().snapshot(id))
            .unwrap_or_else(|| Operation::not_found(id))
    }

    /// Forget `id`
    ///
    /// Work still running is left to finish; its outcome is discarded.
    pub fn delete(&self, id: &str) -> Result<(), OperationError> {
        match self.ops.remove(id) {
            Some((_, record)) => {
                if !record.is_terminal() {
                    warn!(operation = %id, "deleting operation that has not finished");
                }
                Ok(())
            }
            None => Err(OperationError::NotFound { id: id.to_string() }),
        }
    }

    /// All registered operations, oldest first
    pub fn list(&self) -> Vec<Operation> {
        let mut ops: Vec<Operation> = self
            .ops
            .iter()
            .map(|r| r.value().snapshot(r.key()))
            .collect();
        ops.sort_by_key(|o| o.created_at);
        ops
    }

    /// Number of registered operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Wait until `id` reaches a terminal state
    pub async fn wait_terminal(
        &self,
        id: &str,
        timeout: Duration,
    ) -> Result<Operation, OperationError> {
        let record = self
            .ops
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| OperationError::NotFound { id: id.to_string() })?;

        tokio::time::timeout(timeout, settled(&record))
            .await
            .map_err(|_| OperationError::Timeout {
                id: id.to_string(),
                waited_secs: timeout.as_secs(),
            })?;
        Ok(record.snapshot(id))
    }
}

async fn settled(record: &Record) {
    loop {
        let notified = record.finished.notified();
        tokio::pin!(notified);
        // Register before checking so a finish in between is not missed
        notified.as_mut().enable();
        if record.is_terminal() {
            return;
        }
        notified.await;
    }
}

async fn run<F, Fut>(id: String, record: Arc<Record>, work: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = WorkResult> + Send + 'static,
{
    record.start();
    // Inner task so a panicking unit of work still ends in a terminal state
    let outcome = match tokio::spawn(async move { work().await }).await {
        Ok(outcome) => outcome,
        Err(e) => Err(format!("operation task failed: {e}")),
    };
    match &outcome {
        Ok(_) => info!(operation = %id, "operation done"),
        Err(error) => warn!(operation = %id, %error, "operation done with error"),
    }
    record.finish(outcome);
}

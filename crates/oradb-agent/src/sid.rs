//! Current database SID shared by agent request handlers
//!
//! Lock discipline:
//! - Mutators ([`SidHolder::replace`], the init path of
//!   [`SidHolder::get_or_init`]) take the write lock.
//! - Anything that uses the SID to issue a command does so inside
//!   [`SidHolder::with_sid`], which holds the read lock for the whole
//!   top-level operation.
//! - Nothing calls a mutator while inside `with_sid`, and the SID lock is
//!   never taken while an operation-registry record lock is held.

use std::future::Future;

use tokio::sync::RwLock;
use tracing::info;

use crate::AgentError;

/// A SID value together with how many times it has been replaced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sid {
    /// Oracle SID
    pub value: String,
    /// Incremented on every replacement, starting at 1
    pub version: u64,
}

/// Owner of the current SID
#[derive(Debug, Default)]
pub struct SidHolder {
    current: RwLock<Option<Sid>>,
}

impl SidHolder {
    /// Holder with no SID yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Holder seeded with `sid`
    pub fn with_value(sid: impl Into<String>) -> Self {
        Self {
            current: RwLock::new(Some(Sid {
                value: sid.into(),
                version: 1,
            })),
        }
    }

    /// Copy of the current SID
    pub async fn snapshot(&self) -> Option<Sid> {
        self.current.read().await.clone()
    }

    /// Install a new SID, returning its version
    pub async fn replace(&self, value: impl Into<String>) -> u64 {
        let mut guard = self.current.write().await;
        let version = guard.as_ref().map_or(1, |s| s.version + 1);
        let value = value.into();
        info!(sid = %value, version, "database SID replaced");
        *guard = Some(Sid { value, version });
        version
    }

    /// Current SID, discovering it with `init` if none is set
    ///
    /// Concurrent callers race for the write lock; only the first runs
    /// `init`, the rest see its result.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<Sid, AgentError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, AgentError>>,
    {
        if let Some(sid) = self.current.read().await.as_ref() {
            return Ok(sid.clone());
        }
        let mut guard = self.current.write().await;
        if let Some(sid) = guard.as_ref() {
            return Ok(sid.clone());
        }
        let sid = Sid {
            value: init().await?,
            version: 1,
        };
        *guard = Some(sid.clone());
        Ok(sid)
    }

    /// Run `f` with the SID while holding the read lock
    ///
    /// `f` must not call [`SidHolder::replace`] on this holder.
    pub async fn with_sid<F, Fut, T>(&self, f: F) -> Result<T, AgentError>
    where
        F: FnOnce(Sid) -> Fut,
        Fut: Future<Output = Result<T, AgentError>>,
    {
        let guard = self.current.read().await;
        let sid = guard
            .as_ref()
            .cloned()
            .ok_or_else(|| AgentError::Unavailable("database SID not known yet".into()))?;
        let out = f(sid).await;
        drop(guard);
        out
    }
}

//! Long-running operations for the oradb agent
//!
//! Work such as a physical restore outlives any single RPC. The agent
//! registers that work here under a caller-chosen ID and returns at once;
//! callers poll [`OperationRegistry::get`] and delete the record after
//! consuming the terminal state.
//!
//! Creating an ID that already exists never starts a second unit of work.
//! The instance controller's restore deduplication depends on that.

#![deny(missing_docs)]

mod registry;

pub use registry::{Operation, OperationRegistry, WorkResult};

use thiserror::Error;

/// Lifecycle of an operation as seen by a poller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationState {
    /// Registered, work not started yet
    Pending,
    /// Work is executing
    Running,
    /// Work finished without error
    Done,
    /// Work finished with an error
    DoneWithError,
    /// No record for this ID (never created, or deleted)
    NotFound,
}

impl OperationState {
    /// True once the work can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::DoneWithError)
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Done => write!(f, "DONE"),
            Self::DoneWithError => write!(f, "DONE_WITH_ERROR"),
            Self::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

/// What an operation does
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// RMAN restore and recover
    PhysicalRestore,
    /// RMAN backup
    Backup,
    /// Database creation from a seed image
    Bootstrap,
    /// Data Pump import
    DataPumpImport,
    /// Data Pump export
    DataPumpExport,
    /// Database software patching
    Patch,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhysicalRestore => write!(f, "PhysicalRestore"),
            Self::Backup => write!(f, "Backup"),
            Self::Bootstrap => write!(f, "Bootstrap"),
            Self::DataPumpImport => write!(f, "DataPumpImport"),
            Self::DataPumpExport => write!(f, "DataPumpExport"),
            Self::Patch => write!(f, "Patch"),
        }
    }
}

/// Registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    /// No operation with this ID is registered
    #[error("operation {id} not found")]
    NotFound {
        /// The missing ID
        id: String,
    },

    /// The operation did not finish in time
    #[error("operation {id} still running after {waited_secs}s")]
    Timeout {
        /// Operation ID
        id: String,
        /// How long the caller waited
        waited_secs: u64,
    },
}

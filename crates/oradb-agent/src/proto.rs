//! Wire messages for the `oradb.agent.v1.DatabaseAgent` service
//!
//! Field numbers are part of the wire contract; append, never renumber.

use chrono::{DateTime, Utc};
use oradb_common::crd::BackupType;
use oradb_lro::{Operation, OperationState};

use crate::types::{PhysicalRestoreRequest, RecoverableRange, RecoveryPoint};
use crate::AgentError;

/// Fully qualified service name
pub const SERVICE: &str = "oradb.agent.v1.DatabaseAgent";

/// Method paths
pub mod paths {
    /// Start a physical restore
    pub const PHYSICAL_RESTORE_ASYNC: &str = "/oradb.agent.v1.DatabaseAgent/PhysicalRestoreAsync";
    /// Poll an operation
    pub const GET_OPERATION: &str = "/oradb.agent.v1.DatabaseAgent/GetOperation";
    /// Delete an operation
    pub const DELETE_OPERATION: &str = "/oradb.agent.v1.DatabaseAgent/DeleteOperation";
    /// List recoverable ranges
    pub const AVAILABLE_RECOVERY_WINDOWS: &str =
        "/oradb.agent.v1.DatabaseAgent/AvailableRecoveryWindows";
    /// Read the database incarnation
    pub const DATABASE_INCARNATION: &str = "/oradb.agent.v1.DatabaseAgent/DatabaseIncarnation";
}

/// Restore submission
#[derive(Clone, PartialEq, prost::Message)]
pub struct PhysicalRestoreRequestProto {
    /// Operation ID
    #[prost(string, tag = "1")]
    pub lro_id: String,
    /// Backup ID
    #[prost(string, tag = "2")]
    pub backup_id: String,
    /// Backup type
    #[prost(enumeration = "BackupTypeProto", tag = "3")]
    pub backup_type: i32,
    /// RMAN parallelism, 0 for agent default
    #[prost(int32, tag = "4")]
    pub dop: i32,
    /// Time limit in minutes, 0 for none
    #[prost(int32, tag = "5")]
    pub time_limit_minutes: i32,
}

/// Backup type on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum BackupTypeProto {
    /// Not set
    Unspecified = 0,
    /// RMAN backup
    Physical = 1,
    /// Volume snapshot
    Snapshot = 2,
}

/// Operation state on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperationStateProto {
    /// Unknown ID
    NotFound = 0,
    /// Registered
    Pending = 1,
    /// Executing
    Running = 2,
    /// Finished
    Done = 3,
    /// Finished with error
    DoneWithError = 4,
}

/// Long-running operation
#[derive(Clone, PartialEq, prost::Message)]
pub struct OperationProto {
    /// Operation ID
    #[prost(string, tag = "1")]
    pub name: String,
    /// State
    #[prost(enumeration = "OperationStateProto", tag = "2")]
    pub state: i32,
    /// Error message when done with error
    #[prost(string, tag = "3")]
    pub error: String,
    /// Result summary when done
    #[prost(string, tag = "4")]
    pub result: String,
}

/// Request naming one operation
#[derive(Clone, PartialEq, prost::Message)]
pub struct OperationNameRequest {
    /// Operation ID
    #[prost(string, tag = "1")]
    pub name: String,
}

/// Empty message
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Empty {}

/// A recoverable point
#[derive(Clone, PartialEq, prost::Message)]
pub struct RecoveryPointProto {
    /// Seconds since the Unix epoch
    #[prost(int64, tag = "1")]
    pub timestamp_seconds: i64,
    /// SCN
    #[prost(string, tag = "2")]
    pub scn: String,
    /// Incarnation
    #[prost(string, tag = "3")]
    pub incarnation: String,
}

/// A recoverable range
#[derive(Clone, PartialEq, prost::Message)]
pub struct RecoveryWindowProto {
    /// Range start
    #[prost(message, optional, tag = "1")]
    pub start: Option<RecoveryPointProto>,
    /// Range end
    #[prost(message, optional, tag = "2")]
    pub end: Option<RecoveryPointProto>,
}

/// Recoverable ranges
#[derive(Clone, PartialEq, prost::Message)]
pub struct AvailableRecoveryWindowsResponse {
    /// Ranges in agent order
    #[prost(message, repeated, tag = "1")]
    pub windows: Vec<RecoveryWindowProto>,
}

/// Current incarnation
#[derive(Clone, PartialEq, prost::Message)]
pub struct DatabaseIncarnationResponse {
    /// Incarnation number
    #[prost(string, tag = "1")]
    pub incarnation: String,
}

impl From<&PhysicalRestoreRequest> for PhysicalRestoreRequestProto {
    fn from(req: &PhysicalRestoreRequest) -> Self {
        let backup_type = match req.backup_type {
            BackupType::Physical => BackupTypeProto::Physical,
            BackupType::Snapshot => BackupTypeProto::Snapshot,
        };
        Self {
            lro_id: req.operation_id.clone(),
            backup_id: req.backup_id.clone(),
            backup_type: backup_type as i32,
            dop: req.dop.unwrap_or_default(),
            time_limit_minutes: req
                .time_limit
                .map(|d| i32::try_from(d.as_secs() / 60).unwrap_or(i32::MAX))
                .unwrap_or_default(),
        }
    }
}

impl From<OperationProto> for Operation {
    fn from(op: OperationProto) -> Self {
        let state = match OperationStateProto::try_from(op.state) {
            Ok(OperationStateProto::Pending) => OperationState::Pending,
            Ok(OperationStateProto::Running) => OperationState::Running,
            Ok(OperationStateProto::Done) => OperationState::Done,
            Ok(OperationStateProto::DoneWithError) => OperationState::DoneWithError,
            Ok(OperationStateProto::NotFound) | Err(_) => OperationState::NotFound,
        };
        let mut out = Operation::not_found(op.name);
        out.state = state;
        out.error = (!op.error.is_empty()).then_some(op.error);
        out.result = (!op.result.is_empty()).then_some(op.result);
        out
    }
}

impl TryFrom<RecoveryPointProto> for RecoveryPoint {
    type Error = AgentError;

    fn try_from(p: RecoveryPointProto) -> Result<Self, Self::Error> {
        let time = DateTime::<Utc>::from_timestamp(p.timestamp_seconds, 0).ok_or_else(|| {
            AgentError::Rpc {
                code: tonic::Code::OutOfRange,
                message: format!("timestamp {} out of range", p.timestamp_seconds),
            }
        })?;
        Ok(Self {
            time,
            scn: p.scn,
            incarnation: p.incarnation,
        })
    }
}

impl TryFrom<RecoveryWindowProto> for RecoverableRange {
    type Error = AgentError;

    fn try_from(w: RecoveryWindowProto) -> Result<Self, Self::Error> {
        let missing = |side: &str| AgentError::Rpc {
            code: tonic::Code::InvalidArgument,
            message: format!("recovery window without {side}"),
        };
        Ok(Self {
            start: w.start.ok_or_else(|| missing("start"))?.try_into()?,
            end: w.end.ok_or_else(|| missing("end"))?.try_into()?,
        })
    }
}

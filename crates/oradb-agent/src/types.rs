//! Values exchanged with a database agent

use std::time::Duration;

use chrono::{DateTime, Utc};
use oradb_common::crd::BackupType;

/// A recoverable point reported by the database
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryPoint {
    /// Wall-clock time of the point
    pub time: DateTime<Utc>,
    /// System change number, decimal encoded
    pub scn: String,
    /// Database incarnation the point belongs to
    pub incarnation: String,
}

/// A range the database can currently be recovered into
///
/// Produced fresh on every query; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoverableRange {
    /// Earliest recoverable point
    pub start: RecoveryPoint,
    /// Latest recoverable point
    pub end: RecoveryPoint,
}

/// Submission of a physical restore
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhysicalRestoreRequest {
    /// Operation ID the agent registers the restore under
    pub operation_id: String,
    /// Backup to restore from
    pub backup_id: String,
    /// Type of the backup
    pub backup_type: BackupType,
    /// RMAN channel parallelism
    pub dop: Option<i32>,
    /// Bound on restore duration
    pub time_limit: Option<Duration>,
}

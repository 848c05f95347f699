//! Custom Resource Definitions for oradb
//!
//! All kinds live in the `oradb.dev/v1alpha1` API group.

mod backup;
mod backup_schedule;
mod instance;
mod pitr;
mod types;

pub use backup::{Backup, BackupPhase, BackupSpec, BackupStatus};
pub use backup_schedule::{BackupSchedule, BackupScheduleSpec};
pub use instance::{Instance, InstanceSpec, InstanceStatus, RestoreSpec};
pub use pitr::{
    Pitr, PitrSpec, PitrStatus, ScnWindow, TimeWindow, DEFAULT_BACKUP_SCHEDULE,
    DEFAULT_RECOVERY_WINDOW,
};
pub use types::{reasons, BackupType, Condition, ConditionStatus, READY_CONDITION};

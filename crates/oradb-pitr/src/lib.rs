//! Point-in-time recovery for oradb Instances
//!
//! - **retention**: how many scheduled backups cover a recovery window
//! - **validation**: Pitr spec checks, reporting every violation at once
//! - **window**: recovery windows from successful backups and agent ranges
//! - **ensurer**: makes sure each incarnation gets an initial backup
//! - **controller**: the Pitr reconcile loop tying the above together

pub mod controller;
pub mod ensurer;
pub mod retention;
pub mod validation;
pub mod window;

pub use controller::{error_policy, reconcile, KubePitrClient, PitrConfig, PitrContext};
pub use ensurer::{BackupStore, KubeBackupStore};
pub use retention::{parse_schedule, parse_window, retention_count};
pub use validation::{validate_pitr_spec, validate_retention_inputs, ValidationErrors};
pub use window::{compute_windows, RecoveryWindows};

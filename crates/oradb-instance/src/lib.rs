//! Instance controller for the oradb operator
//!
//! Keeps `Ready` in step with the database behind each Instance and runs
//! physical restores requested through `spec.restore`.

pub mod client;
pub mod controller;
pub mod error;
pub mod preflight;
mod restore;

pub use client::{InstanceKubeClient, KubeInstanceClient};
pub use controller::{error_policy, reconcile, InstanceConfig, InstanceContext};
pub use error::InstanceError;
pub use preflight::{BackupPreflight, RestorePreflight};
pub use restore::{operation_id, tracked_restore};

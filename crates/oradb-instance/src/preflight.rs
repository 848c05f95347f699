//! Checks run before a restore is submitted
//!
//! A failed preflight never touches agent state; the reconcile returns the
//! error and the controller retries.

use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
#[cfg(test)]
use mockall::automock;

use oradb_common::crd::{BackupPhase, BackupType, Instance, RestoreSpec};

use crate::client::InstanceKubeClient;
use crate::error::InstanceError;

/// A check that must pass before a restore request is submitted
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RestorePreflight: Send + Sync {
    /// Reject `restore` for `instance` with [`InstanceError::Preflight`]
    async fn check(&self, instance: &Instance, restore: &RestoreSpec) -> Result<(), InstanceError>;
}

/// Requires an explicit `force` and a successful physical backup with the
/// requested ID
pub struct BackupPreflight {
    kube: Arc<dyn InstanceKubeClient>,
}

impl BackupPreflight {
    /// Preflight that looks backups up through `kube`
    pub fn new(kube: Arc<dyn InstanceKubeClient>) -> Self {
        Self { kube }
    }
}

#[async_trait]
impl RestorePreflight for BackupPreflight {
    async fn check(&self, instance: &Instance, restore: &RestoreSpec) -> Result<(), InstanceError> {
        if !restore.force {
            return Err(InstanceError::preflight(
                "restore overwrites the database; set spec.restore.force to true",
            ));
        }
        if restore.backup_type != BackupType::Physical {
            return Err(InstanceError::preflight(format!(
                "{:?} restores are not supported, only Physical",
                restore.backup_type
            )));
        }

        let namespace = instance.namespace().ok_or(InstanceError::MissingNamespace)?;
        let name = instance.name_any();
        let backups = self.kube.list_backups(&namespace).await?;
        let backup = backups.iter().find(|b| {
            b.spec.instance == name
                && b.status
                    .as_ref()
                    .and_then(|s| s.backup_id.as_deref())
                    .is_some_and(|id| id == restore.backup_id)
        });
        match backup {
            None => Err(InstanceError::preflight(format!(
                "no backup of {name} has ID {}",
                restore.backup_id
            ))),
            Some(b) if b.phase() != BackupPhase::Succeeded => Err(InstanceError::preflight(format!(
                "backup {} is {}, not Succeeded",
                b.name_any(),
                b.phase()
            ))),
            Some(_) => Ok(()),
        }
    }
}

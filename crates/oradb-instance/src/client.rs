//! Kubernetes access for the instance controller

use async_trait::async_trait;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
#[cfg(test)]
use mockall::automock;

use oradb_common::crd::{Backup, Instance, InstanceStatus};
use oradb_common::kube_utils::{patch_resource_status, FIELD_MANAGER};
use oradb_common::Error;

/// Trait abstracting Kubernetes operations on Instances and their Backups
#[cfg_attr(test, automock)]
#[async_trait]
pub trait InstanceKubeClient: Send + Sync {
    /// Patch the status of an Instance
    async fn patch_instance_status(
        &self,
        name: &str,
        namespace: &str,
        status: &InstanceStatus,
    ) -> Result<(), Error>;

    /// Remove `spec.restore` from an Instance
    async fn clear_restore_request(&self, name: &str, namespace: &str) -> Result<(), Error>;

    /// List Backups in a namespace
    async fn list_backups(&self, namespace: &str) -> Result<Vec<Backup>, Error>;
}

/// [`InstanceKubeClient`] backed by the API server
pub struct KubeInstanceClient {
    client: Client,
}

impl KubeInstanceClient {
    /// Wrap a client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InstanceKubeClient for KubeInstanceClient {
    async fn patch_instance_status(
        &self,
        name: &str,
        namespace: &str,
        status: &InstanceStatus,
    ) -> Result<(), Error> {
        patch_resource_status::<Instance>(&self.client, name, namespace, status).await?;
        Ok(())
    }

    async fn clear_restore_request(&self, name: &str, namespace: &str) -> Result<(), Error> {
        let api: Api<Instance> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "spec": { "restore": null } });
        api.patch(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    async fn list_backups(&self, namespace: &str) -> Result<Vec<Backup>, Error> {
        let api: Api<Backup> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }
}

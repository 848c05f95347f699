//! Kubernetes helpers shared by the controllers and the CLI

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::conditions::condition_matches;
use crate::crd::ConditionStatus;
use crate::{Error, HasConditions};

/// Field manager used for every write the operator makes
pub const FIELD_MANAGER: &str = "oradb-operator";

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from the ambient configuration with default timeouts
pub async fn create_client() -> Result<Client, Error> {
    let mut config = Config::infer().await.map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to infer config: {e}"))
    })?;
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {e}"))
    })
}

/// Merge-patch the status sub-resource of a namespaced resource
pub async fn patch_resource_status<T>(
    client: &Client,
    name: &str,
    namespace: &str,
    status: &impl Serialize,
) -> Result<(), kube::Error>
where
    T: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
    <T as Resource>::DynamicType: Default,
{
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await?;
    Ok(())
}

/// Server-side apply a typed namespaced resource
pub async fn apply_resource<T>(client: &Client, namespace: &str, resource: &T) -> Result<(), Error>
where
    T: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
    <T as Resource>::DynamicType: Default,
{
    let name = resource
        .meta()
        .name
        .clone()
        .ok_or_else(|| Error::validation("resource to apply has no name"))?;
    let api: Api<T> = Api::namespaced(client.clone(), namespace);
    api.patch(
        &name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(resource),
    )
    .await?;
    Ok(())
}

/// Poll until a check returns `Ok(true)` or the timeout is reached
///
/// Check errors are treated as "not yet" and polling continues.
pub async fn poll_until<F, Fut>(
    timeout: Duration,
    poll_interval: Duration,
    timeout_msg: impl Into<String>,
    mut check_fn: F,
) -> Result<(), Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, Error>>,
{
    let start = std::time::Instant::now();
    let timeout_msg = timeout_msg.into();

    loop {
        if start.elapsed() > timeout {
            return Err(Error::internal_with_context("poll_until", timeout_msg));
        }

        match check_fn().await {
            Ok(true) => return Ok(()),
            Ok(false) => trace!("condition not yet met, retrying"),
            Err(e) => trace!(error = %e, "poll check failed, retrying"),
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// What [`wait_for_condition`] waits for
#[derive(Clone, Debug)]
pub struct ConditionWait {
    /// Condition type, usually `Ready`
    pub type_: String,
    /// Wanted status
    pub status: ConditionStatus,
    /// Wanted reason, any reason when `None`
    pub reason: Option<String>,
}

impl ConditionWait {
    /// True if the resource currently satisfies the wait
    pub fn satisfied_by<K: HasConditions>(&self, resource: &K) -> bool {
        condition_matches(
            resource.condition(&self.type_),
            self.status,
            self.reason.as_deref(),
        )
    }
}

/// Wait until a resource of any condition-bearing kind reaches a condition
pub async fn wait_for_condition<K>(
    api: &Api<K>,
    name: &str,
    wait: &ConditionWait,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), Error>
where
    K: Resource + HasConditions + Clone + DeserializeOwned + Debug,
{
    let msg = format!(
        "timed out waiting for {name} condition {}={} reason {}",
        wait.type_,
        wait.status,
        wait.reason.as_deref().unwrap_or("*")
    );
    poll_until(timeout, poll_interval, msg, move || async move {
        let obj = api.get(name).await?;
        Ok(wait.satisfied_by(&obj))
    })
    .await
}

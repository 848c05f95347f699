//! CRD rendering and installation
//!
//! The operator installs its own CRDs on startup using server-side apply, so
//! the installed schema always matches the running binary.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};
use tracing::info;

use oradb_common::crd::{Backup, BackupSchedule, Instance, Pitr};
use oradb_common::kube_utils::FIELD_MANAGER;
use oradb_common::retry::{retry_if, RetryConfig};
use oradb_common::Error;

/// CRD definition with name and resource
struct CrdDef {
    name: &'static str,
    crd: CustomResourceDefinition,
}

fn all_crds() -> Vec<CrdDef> {
    vec![
        CrdDef {
            name: "instances.oradb.dev",
            crd: Instance::crd(),
        },
        CrdDef {
            name: "backups.oradb.dev",
            crd: Backup::crd(),
        },
        CrdDef {
            name: "pitrs.oradb.dev",
            crd: Pitr::crd(),
        },
        CrdDef {
            name: "backupschedules.oradb.dev",
            crd: BackupSchedule::crd(),
        },
    ]
}

/// Every CRD as one multi-document YAML stream
pub fn render_crds() -> anyhow::Result<String> {
    let docs = all_crds()
        .iter()
        .map(|def| serde_yaml::to_string(&def.crd))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("failed to serialize CRD: {e}"))?;
    Ok(docs.join("---\n"))
}

/// Server-side apply every CRD, retrying transient API failures
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let retry = RetryConfig::with_max_attempts(5);

    for def in all_crds() {
        info!(crd = def.name, "installing CRD");
        let (crds, params, def) = (&crds, &params, &def);
        retry_if(
            &retry,
            def.name,
            move || async move {
                crds.patch(def.name, params, &Patch::Apply(&def.crd))
                    .await
                    .map_err(Error::from)
            },
            Error::is_retryable,
        )
        .await
        .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {e}", def.name))?;
    }

    info!("all oradb CRDs installed/updated");
    Ok(())
}

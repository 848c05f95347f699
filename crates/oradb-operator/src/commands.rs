//! One-shot admin commands

use std::time::Duration;

use kube::{Api, Client};
use tracing::info;

use oradb_common::crd::{Backup, Instance, Pitr, READY_CONDITION};
use oradb_common::kube_utils::{wait_for_condition, ConditionWait};
use oradb_pitr::{retention_count, validate_retention_inputs, ValidationErrors};

use crate::cli::{RetentionArgs, WaitArgs, WaitKind};

/// Poll interval for `wait`
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Retention count for a schedule and window, reporting every bad input
pub fn retention(args: &RetentionArgs) -> Result<u64, ValidationErrors> {
    let inputs = validate_retention_inputs(&args.schedule, &args.window)?;
    Ok(retention_count(&inputs.schedule, inputs.window))
}

/// Block until the named resource reports the requested Ready condition
pub async fn wait(client: Client, args: &WaitArgs) -> anyhow::Result<()> {
    let wait = ConditionWait {
        type_: READY_CONDITION.to_string(),
        status: args.status.into(),
        reason: args.reason.clone(),
    };
    let timeout = Duration::from_secs(args.timeout);
    info!(kind = ?args.kind, name = %args.name, namespace = %args.namespace, "waiting");

    let result = match args.kind {
        WaitKind::Instance => {
            let api: Api<Instance> = Api::namespaced(client, &args.namespace);
            wait_for_condition(&api, &args.name, &wait, timeout, WAIT_POLL_INTERVAL).await
        }
        WaitKind::Pitr => {
            let api: Api<Pitr> = Api::namespaced(client, &args.namespace);
            wait_for_condition(&api, &args.name, &wait, timeout, WAIT_POLL_INTERVAL).await
        }
        WaitKind::Backup => {
            let api: Api<Backup> = Api::namespaced(client, &args.namespace);
            wait_for_condition(&api, &args.name, &wait, timeout, WAIT_POLL_INTERVAL).await
        }
    };
    result.map_err(|e| anyhow::anyhow!("{e}"))
}

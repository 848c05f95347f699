//! Controller runner - builds controller futures for each vertical slice
//!
//! Each `build_*` function returns a boxed future the caller joins. Contexts
//! are assembled here from the real Kubernetes and agent clients.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use oradb_agent::{AgentResolver, GrpcAgentResolver};
use oradb_common::crd::{Backup, BackupSchedule, Instance, Pitr};
use oradb_common::events::KubeEventPublisher;
use oradb_instance::{BackupPreflight, InstanceContext, KubeInstanceClient};
use oradb_pitr::{KubeBackupStore, KubePitrClient, PitrConfig, PitrContext};

use crate::cli::ControllerArgs;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Name events are reported under
const CONTROLLER_NAME: &str = "oradb-operator";

type ControllerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

fn watcher() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Build the Instance controller
pub fn build_instance_controller(
    client: Client,
    agents: Arc<dyn AgentResolver>,
    args: &ControllerArgs,
) -> ControllerFuture {
    let kube = Arc::new(KubeInstanceClient::new(client.clone()));
    let ctx = Arc::new(InstanceContext {
        kube: kube.clone(),
        agents,
        preflight: Arc::new(BackupPreflight::new(kube)),
        events: Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME)),
        config: args.instance_config(),
    });
    let instances: Api<Instance> = Api::all(client);

    tracing::info!("- Instance controller");
    Box::pin(
        Controller::new(instances, watcher())
            .shutdown_on_signal()
            .run(oradb_instance::reconcile, oradb_instance::error_policy, ctx)
            .for_each(log_reconcile_result("Instance")),
    )
}

/// Build the Pitr controller
///
/// Pitrs own their Backups and BackupSchedule, so changes to either trigger
/// a reconcile of the owning Pitr.
pub fn build_pitr_controller(client: Client, agents: Arc<dyn AgentResolver>) -> ControllerFuture {
    let ctx = Arc::new(PitrContext {
        kube: Arc::new(KubePitrClient::new(client.clone())),
        backups: Arc::new(KubeBackupStore::new(client.clone())),
        agents,
        events: Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME)),
        config: PitrConfig::default(),
    });
    let pitrs: Api<Pitr> = Api::all(client.clone());
    let backups: Api<Backup> = Api::all(client.clone());
    let schedules: Api<BackupSchedule> = Api::all(client);

    tracing::info!("- Pitr controller");
    Box::pin(
        Controller::new(pitrs, watcher())
            .owns(backups, watcher())
            .owns(schedules, watcher())
            .shutdown_on_signal()
            .run(oradb_pitr::reconcile, oradb_pitr::error_policy, ctx)
            .for_each(log_reconcile_result("Pitr")),
    )
}

/// Build every controller sharing one agent resolver
pub fn build_controllers(client: Client, args: &ControllerArgs) -> Vec<ControllerFuture> {
    let agents: Arc<dyn AgentResolver> = Arc::new(GrpcAgentResolver::new(args.agent_config()));
    vec![
        build_instance_controller(client.clone(), Arc::clone(&agents), args),
        build_pitr_controller(client, agents),
    ]
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}

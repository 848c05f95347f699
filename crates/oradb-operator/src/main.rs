//! oradb operator - Oracle database lifecycle and point-in-time recovery

use clap::Parser;

use oradb_common::kube_utils::create_client;
use oradb_common::telemetry::{init_telemetry, TelemetryConfig};
use oradb_operator::cli::{Cli, Commands, ControllerArgs};
use oradb_operator::{commands, controller_runner, crds};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Output-only commands print to stdout and skip logging setup
    match cli.command {
        Some(Commands::Crd) => {
            print!("{}", crds::render_crds()?);
            Ok(())
        }
        Some(Commands::Retention(args)) => {
            let count = commands::retention(&args)
                .map_err(|e| anyhow::anyhow!("invalid retention inputs: {e}"))?;
            println!("{count}");
            Ok(())
        }
        Some(Commands::Wait(args)) => {
            let telemetry = init_telemetry(TelemetryConfig::default())?;
            let client = create_client().await?;
            let result = commands::wait(client, &args).await;
            telemetry.shutdown();
            result
        }
        Some(Commands::Controller) | None => run_controller(cli.controller).await,
    }
}

async fn run_controller(args: ControllerArgs) -> anyhow::Result<()> {
    let telemetry = init_telemetry(TelemetryConfig::default())?;
    tracing::info!(?args, "starting oradb operator");

    let client = create_client().await?;
    crds::ensure_crds_installed(&client).await?;

    tracing::info!("Starting controllers:");
    let controllers = controller_runner::build_controllers(client, &args);
    futures::future::join_all(controllers).await;

    tracing::info!("controllers stopped");
    telemetry.shutdown();
    Ok(())
}

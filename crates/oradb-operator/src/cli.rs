//! Command line surface

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use oradb_agent::{AgentClientConfig, DEFAULT_AGENT_PORT};
use oradb_common::crd::ConditionStatus;
use oradb_instance::InstanceConfig;

/// oradb - Kubernetes operator for Oracle databases with point-in-time recovery
#[derive(Parser, Debug)]
#[command(name = "oradb-operator", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub controller: ControllerArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Instance and Pitr controllers (default mode)
    Controller,

    /// Print CRD manifests and exit
    Crd,

    /// Print how many scheduled backups cover a recovery window
    Retention(RetentionArgs),

    /// Wait for a resource to report a Ready condition
    Wait(WaitArgs),
}

/// Controller settings
#[derive(Args, Debug, Clone)]
pub struct ControllerArgs {
    /// Port the database agents listen on
    #[arg(long, env = "ORADB_AGENT_PORT", default_value_t = DEFAULT_AGENT_PORT)]
    pub agent_port: u16,

    /// Timeout for each agent RPC
    #[arg(long, default_value_t = 30)]
    pub rpc_timeout_secs: u64,

    /// Timeout for connecting to an agent
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Interval between polls of a running restore
    #[arg(long, default_value_t = 15)]
    pub restore_poll_secs: u64,
}

impl ControllerArgs {
    /// Agent client settings
    pub fn agent_config(&self) -> AgentClientConfig {
        AgentClientConfig {
            port: self.agent_port,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rpc_timeout: Duration::from_secs(self.rpc_timeout_secs),
        }
    }

    /// Instance controller intervals
    pub fn instance_config(&self) -> InstanceConfig {
        InstanceConfig {
            restore_poll: Duration::from_secs(self.restore_poll_secs),
            ..InstanceConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct RetentionArgs {
    /// Backup schedule (5- or 6-field cron)
    #[arg(long)]
    pub schedule: String,

    /// Recovery window, e.g. 7d or 168h
    #[arg(long)]
    pub window: String,
}

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Kind of resource to wait on
    #[arg(long, value_enum)]
    pub kind: WaitKind,

    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "default")]
    pub namespace: String,

    /// Wanted Ready status
    #[arg(long, value_enum, default_value_t = WaitStatus::True)]
    pub status: WaitStatus,

    /// Wanted Ready reason; any reason when omitted
    #[arg(long)]
    pub reason: Option<String>,

    /// Seconds to wait before giving up
    #[arg(long, default_value_t = 600)]
    pub timeout: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitKind {
    Instance,
    Pitr,
    Backup,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    True,
    False,
}

impl From<WaitStatus> for ConditionStatus {
    fn from(status: WaitStatus) -> Self {
        match status {
            WaitStatus::True => ConditionStatus::True,
            WaitStatus::False => ConditionStatus::False,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("oradb-operator").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn no_subcommand_means_controller() {
        assert!(parse(&[]).command.is_none());
    }

    #[test]
    fn controller_defaults() {
        let cli = parse(&["controller"]);
        assert!(matches!(cli.command, Some(Commands::Controller)));
        let args = cli.controller;
        assert_eq!(args.rpc_timeout_secs, 30);
        assert_eq!(args.connect_timeout_secs, 10);
        assert_eq!(args.restore_poll_secs, 15);
        assert_eq!(
            args.instance_config().restore_poll,
            Duration::from_secs(15)
        );
        assert_eq!(args.agent_config().rpc_timeout, Duration::from_secs(30));
    }

    #[test]
    fn controller_flags_flow_into_configs() {
        let args = parse(&[
            "--agent-port",
            "4000",
            "--rpc-timeout-secs",
            "5",
            "--restore-poll-secs",
            "2",
            "controller",
        ])
        .controller;
        let agent = args.agent_config();
        assert_eq!(agent.port, 4000);
        assert_eq!(agent.rpc_timeout, Duration::from_secs(5));
        assert_eq!(args.instance_config().restore_poll, Duration::from_secs(2));
    }

    #[test]
    fn wait_parses_kind_and_reason() {
        let Some(Commands::Wait(args)) = parse(&[
            "wait",
            "--kind",
            "pitr",
            "--name",
            "mypitr",
            "--reason",
            "CreateComplete",
        ])
        .command
        else {
            panic!("expected wait");
        };
        assert_eq!(args.kind, WaitKind::Pitr);
        assert_eq!(args.namespace, "default");
        assert_eq!(args.status, WaitStatus::True);
        assert_eq!(args.reason.as_deref(), Some("CreateComplete"));
    }

    #[test]
    fn retention_requires_both_inputs() {
        assert!(
            Cli::try_parse_from(["oradb-operator", "retention", "--schedule", "0 * * * *"])
                .is_err()
        );
    }
}

use clap::Parser;
use mesh_common::settings::{OperatorSettings, Settings};
use mesh_operator::operator;

use crate::error::MeshCliResult;

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Only watch Meshes in this namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Address for the health and readiness probes
    #[arg(long)]
    pub probe_address: Option<String>,

    /// Only reconcile while holding the operator lease
    #[arg(long)]
    pub leader_elect: bool,
}

pub async fn run(args: RunArgs, config: &Settings) -> MeshCliResult<()> {
    let settings = operator_settings(args, config);
    operator(&settings).await?;
    Ok(())
}

fn operator_settings(args: RunArgs, config: &Settings) -> OperatorSettings {
    let mut settings = config.operator.clone();
    if let Some(namespace) = args.namespace {
        settings.watch_namespace = Some(namespace);
    }
    if let Some(probe_address) = args.probe_address {
        settings.probe_address = probe_address;
    }
    if args.leader_elect {
        settings.leader_elect = true;
    }
    settings
}

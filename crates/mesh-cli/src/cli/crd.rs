use std::path::PathBuf;

use clap::Parser;
use kube::CustomResourceExt;
use mesh_common::settings::Settings;
use mesh_operator::Mesh;

use crate::error::MeshCliResult;

#[derive(Parser, Debug, Clone)]
pub struct CrdArgs {
    /// Write the definition to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: CrdArgs, _config: &Settings) -> MeshCliResult<()> {
    let yaml = crd_yaml()?;
    match args.output {
        Some(path) => tokio::fs::write(&path, yaml).await?,
        None => print!("{yaml}"),
    }
    Ok(())
}

fn crd_yaml() -> MeshCliResult<String> {
    Ok(serde_yaml::to_string(&Mesh::crd())?)
}

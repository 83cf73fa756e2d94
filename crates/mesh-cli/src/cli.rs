use std::path::PathBuf;

use clap::Parser;
use mesh_common::{
    level_filters::LevelFilter,
    util::tracing::{level_from_log, setup_tracing},
};

use crate::{error::MeshCliResult, init::init_config};

mod crd;
mod info;
mod run;

#[derive(Debug, Parser)]
#[command(name = "mi", version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Overrides the level from the settings file
    #[clap(short('l'), long, value_name("LEVEL"))]
    pub log_level: Option<LevelFilter>,

    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Parser, Clone)]
pub enum Command {
    #[command(about = "Show information about meshinfra")]
    Info(info::InfoArgs),
    #[command(about = "Run the Mesh operator", alias = "r")]
    Run(run::RunArgs),
    #[command(about = "Print the Mesh CustomResourceDefinition")]
    Crd(crd::CrdArgs),
}

impl Cli {
    fn effective_log_level(&self, configured: log::LevelFilter) -> LevelFilter {
        let level = self
            .log_level
            .unwrap_or_else(|| level_from_log(configured));
        if self.verbose {
            level.max(LevelFilter::DEBUG)
        } else {
            level
        }
    }
}

pub async fn exec() -> MeshCliResult {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let cfg = init_config(&cli)?;
    setup_tracing(Some(cli.effective_log_level(cfg.log_level)))?;

    match cli.cmd {
        Command::Info(args) => info::run(args, cfg).await?,
        Command::Run(args) => run::run(args, cfg).await?,
        Command::Crd(args) => crd::run(args, cfg).await?,
    }
    Ok(())
}

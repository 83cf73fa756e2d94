use mesh_common::error::MeshError;
use mesh_operator::error::MeshOperatorError;
use thiserror::Error;

pub type MeshCliResult<T = (), E = MeshCliError> = Result<T, E>;

#[derive(Debug, Error)]
pub enum MeshCliError {
    #[error("Unable to initialize config: {0}")]
    InitConfig(String),
    #[error("Unable to run command: {0}")]
    Command(#[from] clap::error::Error),
    #[error("Operator error: {0}")]
    Operator(#[from] MeshOperatorError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid Yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<MeshCliError> for MeshError {
    fn from(error: MeshCliError) -> Self {
        MeshError::Cli(error.to_string())
    }
}

impl From<MeshError> for MeshCliError {
    fn from(error: MeshError) -> Self {
        match error {
            MeshError::Config(e) => MeshCliError::InitConfig(e.to_string()),
            e @ (MeshError::ConfigAlreadyInitialized | MeshError::ConfigNotInitialized) => {
                MeshCliError::InitConfig(e.to_string())
            }
            other => MeshCliError::Runtime(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for MeshCliError {
    fn from(error: anyhow::Error) -> Self {
        MeshCliError::Runtime(error.to_string())
    }
}

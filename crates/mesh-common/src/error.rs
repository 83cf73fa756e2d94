pub type MeshResult<T = (), E = MeshError> = Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("CLI error: {0}")]
    Cli(String),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Config not initialized")]
    ConfigNotInitialized,
    #[error("Config already initialized")]
    ConfigAlreadyInitialized,
    #[error("Runtime error: {0}")]
    Runtime(#[from] anyhow::Error),
}

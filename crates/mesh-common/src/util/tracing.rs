use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{MeshError, MeshResult};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `level`.
pub fn setup_tracing(level: Option<LevelFilter>) -> MeshResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(level.unwrap_or(LevelFilter::INFO).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|e| MeshError::Runtime(anyhow::anyhow!("unable to set up tracing: {e}")))
}

/// Maps a `log` level from the settings file onto the subscriber's filter.
pub fn level_from_log(level: log::LevelFilter) -> LevelFilter {
    match level {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    }
}

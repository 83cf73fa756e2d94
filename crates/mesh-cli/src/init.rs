use mesh_common::{
    error::{MeshError, MeshResult},
    settings::{get_config, Settings, CONFIG_INSTANCE},
};

use crate::Cli;

pub fn init_config(cli: &Cli) -> MeshResult<&'static Settings> {
    let settings = match &cli.settings {
        None => Settings::from_root(cli.root.clone())?,
        Some(settings) => Settings::from_root(Some(settings.clone()))?,
    };
    CONFIG_INSTANCE
        .set(settings)
        .map_err(|_| MeshError::ConfigAlreadyInitialized)?;
    get_config()
}

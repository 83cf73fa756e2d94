use clap::Parser;
use mesh_common::settings::Settings;

use crate::error::MeshCliResult;

#[derive(Parser, Debug, Clone)]
pub struct InfoArgs {}

pub async fn run(_args: InfoArgs, _config: &Settings) -> MeshCliResult<()> {
    println!("{}", version_line());
    Ok(())
}

fn version_line() -> String {
    let sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown");
    format!(
        "{} {} ({})",
        env!("CARGO_PKG_VERSION"),
        option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown"),
        sha.get(..8).unwrap_or(sha)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_line_starts_with_package_version() {
        assert!(version_line().starts_with(env!("CARGO_PKG_VERSION")));
    }
}

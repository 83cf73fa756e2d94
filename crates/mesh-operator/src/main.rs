use mesh_common::settings::Settings;
use mesh_common::util::tracing::{level_from_log, setup_tracing};
use mesh_operator::error::MeshOperatorResult;

#[tokio::main]
async fn main() -> MeshOperatorResult<()> {
    let settings = Settings::from_root(None)?;
    setup_tracing(Some(level_from_log(settings.log_level)))?;
    mesh_operator::operator(&settings.operator).await
}

use tracing::{debug, error, info};

use crate::error::MeshOperatorResult;
use crate::k8s::ChildObject;

use super::client::KubeClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    AlreadyPresent,
}

/// Get-or-create for a single child object.
///
/// An existing object is left exactly as found, whatever its contents. A
/// create rejected with `AlreadyExists` lost a race against another writer
/// and counts as already present.
pub async fn ensure(
    client: &dyn KubeClient,
    child: &ChildObject,
) -> MeshOperatorResult<SyncOutcome> {
    let kind = child.kind();
    let namespace = child.namespace();
    let name = child.name();

    let exists = client
        .child_exists(kind, namespace, name)
        .await
        .inspect_err(|e| error!(error = %e, %kind, namespace, name, "failed to get child"))?;
    if exists {
        debug!(%kind, namespace, name, "child already present");
        return Ok(SyncOutcome::AlreadyPresent);
    }

    info!(%kind, namespace, name, "creating child");
    match client.create_child(child).await {
        Ok(()) => Ok(SyncOutcome::Created),
        Err(e) if e.is_already_exists() => {
            info!(%kind, namespace, name, "child was created concurrently");
            Ok(SyncOutcome::AlreadyPresent)
        }
        Err(e) => {
            error!(error = %e, %kind, namespace, name, "failed to create child");
            Err(e)
        }
    }
}

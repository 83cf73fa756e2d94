use std::sync::Arc;
use std::time::Duration;

use kube::core::DynamicObject;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use kube::{Client, ResourceExt};
use mesh_common::settings::OperatorSettings;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{MeshOperatorError, MeshOperatorResult};
use crate::k8s::DesiredChildren;

use super::backoff::ErrorBackoff;
use super::client::{KubeClient, KubeClientImpl};
use super::crd::Mesh;
use super::sync::{ensure, SyncOutcome};

pub struct ContextData {
    pub kube: Arc<dyn KubeClient>,
    pub requeue_delay: Duration,
    pub backoff: ErrorBackoff,
}

impl ContextData {
    pub fn new(client: Client, settings: &OperatorSettings) -> Self {
        Self {
            kube: Arc::new(KubeClientImpl::new(client)),
            requeue_delay: settings.requeue_delay(),
            backoff: ErrorBackoff::from(&settings.backoff),
        }
    }

    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn KubeClient>) -> Self {
        let settings = OperatorSettings::default();
        Self {
            kube,
            requeue_delay: settings.requeue_delay(),
            backoff: ErrorBackoff::from(&settings.backoff),
        }
    }
}

/// Result of a single successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Every child exists; wait for the next change.
    Done,
    /// A deployment was just created; run again right away.
    Requeue,
}

/// Runs one pass for the mesh `namespace/name`.
///
/// Deployments are handled first, in tier order, and the first one that has
/// to be created ends the pass with [`ReconcileOutcome::Requeue`]. Once all
/// three exist, the config maps and then the secrets are ensured in the same
/// pass. Every child carries the mesh as its controller before any of them is
/// looked up.
#[instrument(skip(client))]
pub async fn reconcile_mesh(
    client: &dyn KubeClient,
    namespace: &str,
    name: &str,
) -> MeshOperatorResult<ReconcileOutcome> {
    let Some(mesh) = client
        .get_mesh(namespace, name)
        .await
        .inspect_err(|e| error!(error = %e, "failed to get Mesh"))?
    else {
        info!("Mesh not found, ignoring since it must have been deleted");
        return Ok(ReconcileOutcome::Done);
    };

    let children = DesiredChildren::for_mesh(&mesh)
        .inspect_err(|e| error!(error = %e, "failed to build children"))?;

    for deployment in &children.deployments {
        if ensure(client, deployment).await? == SyncOutcome::Created {
            info!(deployment = deployment.name(), "deployment created, requeueing");
            return Ok(ReconcileOutcome::Requeue);
        }
    }

    for child in children.config_maps.iter().chain(children.secrets.iter()) {
        ensure(client, child).await?;
    }

    debug!("all children present");
    Ok(ReconcileOutcome::Done)
}

pub async fn reconcile(
    mesh: Arc<Mesh>,
    context: Arc<ContextData>,
) -> MeshOperatorResult<Action> {
    let namespace = mesh
        .namespace()
        .ok_or(MeshOperatorError::MissingObjectKey(".metadata.namespace"))?;
    let name = mesh.name_any();

    let outcome = reconcile_mesh(context.kube.as_ref(), &namespace, &name).await?;
    context.backoff.reset(&object_key(&namespace, &name));

    match outcome {
        ReconcileOutcome::Done => Ok(Action::await_change()),
        ReconcileOutcome::Requeue => Ok(Action::requeue(context.requeue_delay)),
    }
}

pub fn on_error(mesh: Arc<Mesh>, error: &MeshOperatorError, context: Arc<ContextData>) -> Action {
    let namespace = mesh.namespace().unwrap_or_default();
    let name = mesh.name_any();
    let delay = context.backoff.next_delay(&object_key(&namespace, &name));
    warn!(
        %error,
        %namespace,
        %name,
        retry_in = ?delay,
        "reconciliation failed"
    );
    Action::requeue(delay)
}

/// A scheduled retry fired for a mesh that is no longer in the cache. It will
/// not be reconciled again, so its failure count is dropped.
pub fn forget_deleted(object: &ObjectRef<DynamicObject>, context: &ContextData) {
    let namespace = object.namespace.as_deref().unwrap_or_default();
    context.backoff.reset(&object_key(namespace, &object.name));
    debug!(%namespace, name = %object.name, "dropped backoff for deleted Mesh");
}

fn object_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

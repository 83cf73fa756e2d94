pub mod backoff;
pub mod client;
pub mod crd;
pub mod health;
pub mod leader;
pub mod reconcile;
pub mod sync;

#[cfg(test)]
mod fake;

use crd::Mesh;
use futures::StreamExt;

use health::Readiness;
use leader::{LeaderElector, LeaderGuard};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::runtime::controller;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client};
use mesh_common::settings::OperatorSettings;
use reconcile::ContextData;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{MeshOperatorError, MeshOperatorResult};

/// Runs the Mesh controller until a termination signal arrives.
pub async fn operator(settings: &OperatorSettings) -> MeshOperatorResult<()> {
    let kubernetes_client = Client::try_default().await?;

    let (meshes, deployments, config_maps, secrets) = match &settings.watch_namespace {
        Some(namespace) => {
            info!(%namespace, "watching a single namespace");
            (
                Api::<Mesh>::namespaced(kubernetes_client.clone(), namespace),
                Api::<Deployment>::namespaced(kubernetes_client.clone(), namespace),
                Api::<ConfigMap>::namespaced(kubernetes_client.clone(), namespace),
                Api::<Secret>::namespaced(kubernetes_client.clone(), namespace),
            )
        }
        None => (
            Api::<Mesh>::all(kubernetes_client.clone()),
            Api::<Deployment>::all(kubernetes_client.clone()),
            Api::<ConfigMap>::all(kubernetes_client.clone()),
            Api::<Secret>::all(kubernetes_client.clone()),
        ),
    };

    let readiness = Readiness::default();
    let probe_address = settings.probe_address.clone();
    let probes = {
        let readiness = readiness.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(&probe_address, readiness).await {
                error!(error = %e, "health probe server stopped");
            }
        })
    };

    let mut leadership = None;
    if settings.leader_elect {
        let namespace = lease_namespace(settings);
        let elector = Arc::new(LeaderElector::new(
            kubernetes_client.clone(),
            &namespace,
            &leader::identity_from_env(),
            &settings.leader_election,
        ));
        tokio::select! {
            guard = elector.acquire() => leadership = Some(guard),
            _ = termination_signal() => {
                info!("terminated before leadership was acquired");
                probes.abort();
                return Ok(());
            }
        }
    }

    let context: Arc<ContextData> =
        Arc::new(ContextData::new(kubernetes_client.clone(), settings));

    info!("starting Mesh controller");
    let mut controller = Controller::new(meshes, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .owns(config_maps, watcher::Config::default())
        .owns(secrets, watcher::Config::default())
        .shutdown_on_signal();
    if let Some(guard) = leadership.as_mut() {
        let lost = guard.lost();
        let readiness = readiness.clone();
        controller = controller.graceful_shutdown_on(async move {
            lost.await;
            readiness.set_not_ready();
        });
    }

    let store = controller.store();
    let ready = tokio::spawn(health::mark_ready_when(
        readiness.clone(),
        async move { store.wait_until_ready().await },
    ));

    let results_context = context.clone();
    controller
        .run(reconcile::reconcile, reconcile::on_error, context)
        .for_each(|recon_result| {
            let context = results_context.clone();
            async move {
                match recon_result {
                    Ok((mesh, action)) => {
                        debug!(mesh = %mesh, ?action, "reconciliation completed");
                    }
                    Err(controller::Error::ObjectNotFound(object)) => {
                        reconcile::forget_deleted(&object, &context);
                    }
                    Err(err) => {
                        error!(error = %err, "reconciliation error");
                    }
                }
            }
        })
        .await;

    ready.abort();
    probes.abort();
    readiness.set_not_ready();
    info!("Mesh controller stopped");

    match leadership {
        Some(guard) => step_down(guard).await,
        None => Ok(()),
    }
}

async fn step_down(guard: LeaderGuard) -> MeshOperatorResult<()> {
    match guard.release().await {
        Err(e @ MeshOperatorError::LeadershipLost(_)) => {
            error!(error = %e, "stopping after losing leadership");
            Err(e)
        }
        Err(e) => {
            warn!(error = %e, "failed to release lease");
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn lease_namespace(settings: &OperatorSettings) -> String {
    settings
        .leader_election
        .namespace
        .clone()
        .or_else(|| std::env::var("POD_NAMESPACE").ok())
        .or_else(|| settings.watch_namespace.clone())
        .unwrap_or_else(|| "default".to_string())
}

async fn termination_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_namespace_prefers_explicit_setting() {
        let mut settings = OperatorSettings::default();
        settings.watch_namespace = Some("watched".into());
        settings.leader_election.namespace = Some("leases".into());
        assert_eq!(lease_namespace(&settings), "leases");
    }
}

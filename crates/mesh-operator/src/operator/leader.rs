//! Leader election on a `coordination.k8s.io/v1` Lease.
//!
//! Every write carries the resourceVersion that was read, so two replicas
//! racing for the same lease see one succeed and the other get a 409.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{MicroTime, ObjectMeta};
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use mesh_common::settings::LeaderElectionSettings;
use serde_json::json;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{MeshOperatorError, MeshOperatorResult};

pub const LEASE_NAME: &str = "cdbd3f8f.mesh.com";

/// What to do with the lease as last read from the API server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseDecision {
    /// No lease exists yet.
    Create,
    /// We hold it.
    Renew,
    /// Released or expired; `transitions` is the count to bump.
    TakeOver { transitions: i32 },
    /// Someone else holds an unexpired lease.
    HeldElsewhere,
}

pub fn decide(existing: Option<&Lease>, identity: &str, now: DateTime<Utc>) -> LeaseDecision {
    let Some(lease) = existing else {
        return LeaseDecision::Create;
    };
    let spec = lease.spec.as_ref();
    let holder = spec.and_then(|s| s.holder_identity.as_deref());
    if holder == Some(identity) {
        return LeaseDecision::Renew;
    }

    let renew_time = spec.and_then(|s| s.renew_time.as_ref());
    let duration_secs = spec.and_then(|s| s.lease_duration_seconds);
    let expired = match (holder, renew_time, duration_secs) {
        (None, _, _) => true,
        (Some(_), Some(renewed), Some(duration)) => {
            now > renewed.0 + chrono::Duration::seconds(i64::from(duration))
        }
        _ => true,
    };

    if expired {
        LeaseDecision::TakeOver {
            transitions: spec.and_then(|s| s.lease_transitions).unwrap_or(0),
        }
    } else {
        LeaseDecision::HeldElsewhere
    }
}

/// Identity used as the lease holder: the pod name when available.
pub fn identity_from_env() -> String {
    std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("mesh-operator-{}", std::process::id()))
}

pub struct LeaderElector {
    api: Api<Lease>,
    namespace: String,
    identity: String,
    lease_duration: Duration,
    renew_interval: Duration,
    retry_interval: Duration,
}

impl LeaderElector {
    pub fn new(
        client: Client,
        namespace: &str,
        identity: &str,
        settings: &LeaderElectionSettings,
    ) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
            identity: identity.to_string(),
            lease_duration: settings.lease_duration(),
            renew_interval: settings.renew_interval(),
            retry_interval: settings.retry_interval(),
        }
    }

    /// Waits until the lease is ours. API errors are logged and retried.
    pub async fn acquire(self: Arc<Self>) -> LeaderGuard {
        info!(
            identity = %self.identity,
            namespace = %self.namespace,
            lease = LEASE_NAME,
            "waiting for leadership"
        );

        loop {
            match self.try_acquire_or_renew().await {
                Ok(true) => {
                    info!(identity = %self.identity, "leadership acquired");
                    return self.start_renewal();
                }
                Ok(false) => {
                    debug!(identity = %self.identity, "lease held by another replica");
                }
                Err(e) => {
                    warn!(identity = %self.identity, error = %e, "failed to acquire lease");
                }
            }
            tokio::time::sleep(self.retry_interval).await;
        }
    }

    fn start_renewal(self: Arc<Self>) -> LeaderGuard {
        let (lost_tx, lost_rx) = oneshot::channel();
        let holding = Arc::new(AtomicBool::new(true));
        let renewal = {
            let elector = Arc::clone(&self);
            let holding = Arc::clone(&holding);
            tokio::spawn(async move { elector.renewal_loop(holding, lost_tx).await })
        };

        LeaderGuard {
            elector: self,
            holding,
            renewal,
            lost: Some(lost_rx),
        }
    }

    async fn try_acquire_or_renew(&self) -> MeshOperatorResult<bool> {
        let existing = self.api.get_opt(LEASE_NAME).await?;
        let now = Utc::now();

        match decide(existing.as_ref(), &self.identity, now) {
            LeaseDecision::HeldElsewhere => Ok(false),
            LeaseDecision::Create => {
                let lease = self.lease(None, 0, now);
                self.write(self.api.create(&PostParams::default(), &lease).await)
            }
            LeaseDecision::Renew => {
                let Some(mut lease) = existing else {
                    return Ok(false);
                };
                if let Some(spec) = lease.spec.as_mut() {
                    spec.renew_time = Some(MicroTime(now));
                }
                self.write(
                    self.api
                        .replace(LEASE_NAME, &PostParams::default(), &lease)
                        .await,
                )
            }
            LeaseDecision::TakeOver { transitions } => {
                let resource_version = existing.and_then(|l| l.metadata.resource_version);
                let lease = self.lease(resource_version, transitions + 1, now);
                self.write(
                    self.api
                        .replace(LEASE_NAME, &PostParams::default(), &lease)
                        .await,
                )
            }
        }
    }

    /// A 409 means another replica wrote the lease first.
    fn write(&self, result: Result<Lease, kube::Error>) -> MeshOperatorResult<bool> {
        match result {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 409 => {
                debug!(identity = %self.identity, "lease write conflict");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn lease(
        &self,
        resource_version: Option<String>,
        transitions: i32,
        now: DateTime<Utc>,
    ) -> Lease {
        Lease {
            metadata: ObjectMeta {
                name: Some(LEASE_NAME.to_string()),
                namespace: Some(self.namespace.clone()),
                resource_version,
                ..Default::default()
            },
            spec: Some(LeaseSpec {
                holder_identity: Some(self.identity.clone()),
                lease_duration_seconds: Some(
                    i32::try_from(self.lease_duration.as_secs()).unwrap_or(i32::MAX),
                ),
                acquire_time: Some(MicroTime(now)),
                renew_time: Some(MicroTime(now)),
                lease_transitions: Some(transitions),
                ..Default::default()
            }),
        }
    }

    /// Renews until a conflict, or until renewals have failed for a whole
    /// lease duration.
    async fn renewal_loop(&self, holding: Arc<AtomicBool>, lost: oneshot::Sender<()>) {
        let mut last_renewed = tokio::time::Instant::now();
        loop {
            tokio::time::sleep(self.renew_interval).await;

            match self.try_acquire_or_renew().await {
                Ok(true) => last_renewed = tokio::time::Instant::now(),
                Ok(false) => break,
                Err(e) if last_renewed.elapsed() < self.lease_duration => {
                    warn!(identity = %self.identity, error = %e, "lease renewal failed");
                }
                Err(e) => {
                    warn!(identity = %self.identity, error = %e, "lease renewal deadline passed");
                    break;
                }
            }
        }

        warn!(identity = %self.identity, "leadership lost");
        holding.store(false, Ordering::SeqCst);
        let _ = lost.send(());
    }

    /// Clears the holder so a standby can take over without waiting for expiry.
    async fn release(&self) -> MeshOperatorResult<()> {
        let Some(lease) = self.api.get_opt(LEASE_NAME).await? else {
            return Ok(());
        };
        let holder = lease.spec.as_ref().and_then(|s| s.holder_identity.as_deref());
        if holder != Some(self.identity.as_str()) {
            return Ok(());
        }

        let past = Utc::now() - chrono::Duration::seconds(60);
        let patch = json!({
            "metadata": { "resourceVersion": lease.metadata.resource_version },
            "spec": { "holderIdentity": null, "renewTime": MicroTime(past) }
        });
        self.api
            .patch(LEASE_NAME, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!(identity = %self.identity, "lease released");
        Ok(())
    }
}

/// Held while this replica is the leader; the lease is renewed in the background.
pub struct LeaderGuard {
    elector: Arc<LeaderElector>,
    holding: Arc<AtomicBool>,
    renewal: JoinHandle<()>,
    lost: Option<oneshot::Receiver<()>>,
}

impl LeaderGuard {
    pub fn is_leader(&self) -> bool {
        self.holding.load(Ordering::SeqCst)
    }

    /// Resolves when leadership is lost. Only the first call waits.
    pub fn lost(&mut self) -> impl Future<Output = ()> + Send + Sync + 'static {
        let lost = self.lost.take();
        async move {
            if let Some(lost) = lost {
                let _ = lost.await;
            }
        }
    }

    pub async fn release(self) -> MeshOperatorResult<()> {
        self.renewal.abort();
        if !self.is_leader() {
            return Err(MeshOperatorError::LeadershipLost(LEASE_NAME.to_string()));
        }
        self.elector.release().await
    }
}

impl Drop for LeaderGuard {
    fn drop(&mut self) {
        self.renewal.abort();
    }
}

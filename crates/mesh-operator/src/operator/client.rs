use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, PostParams};
use kube::Client;
use serde::de::DeserializeOwned;

#[cfg(test)]
use mockall::automock;

use crate::error::MeshOperatorResult;
use crate::k8s::{ChildKind, ChildObject};

use super::crd::Mesh;

/// Cluster operations the reconciler needs: reads and creates, nothing else.
///
/// Production code uses [`KubeClientImpl`]; tests substitute a mock or an
/// in-memory cluster.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Get a Mesh, `None` if it does not exist
    async fn get_mesh(&self, namespace: &str, name: &str) -> MeshOperatorResult<Option<Mesh>>;

    /// Check whether a child object of `kind` exists
    async fn child_exists(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> MeshOperatorResult<bool>;

    /// Create a child object in its own namespace
    async fn create_child(&self, child: &ChildObject) -> MeshOperatorResult<()>;
}

pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn exists<K>(&self, namespace: &str, name: &str) -> MeshOperatorResult<bool>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?.is_some())
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_mesh(&self, namespace: &str, name: &str) -> MeshOperatorResult<Option<Mesh>> {
        let api: Api<Mesh> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn child_exists(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> MeshOperatorResult<bool> {
        match kind {
            ChildKind::Deployment => self.exists::<Deployment>(namespace, name).await,
            ChildKind::ConfigMap => self.exists::<ConfigMap>(namespace, name).await,
            ChildKind::Secret => self.exists::<Secret>(namespace, name).await,
        }
    }

    async fn create_child(&self, child: &ChildObject) -> MeshOperatorResult<()> {
        let pp = PostParams::default();
        let namespace = child.namespace();
        match child {
            ChildObject::Deployment(deployment) => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, deployment).await?;
            }
            ChildObject::ConfigMap(config_map) => {
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, config_map).await?;
            }
            ChildObject::Secret(secret) => {
                let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
                api.create(&pp, secret).await?;
            }
        }
        Ok(())
    }
}

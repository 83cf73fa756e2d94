use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use crate::error::{MeshOperatorError, MeshOperatorResult};
use crate::operator::crd::Mesh;

use super::config_map::tier_config_map;
use super::deployment::tier_deployment;
use super::secret::tier_secret;
use super::tier::TIERS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildKind {
    Deployment,
    ConfigMap,
    Secret,
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKind::Deployment => f.write_str("Deployment"),
            ChildKind::ConfigMap => f.write_str("ConfigMap"),
            ChildKind::Secret => f.write_str("Secret"),
        }
    }
}

/// A child object owned by a mesh.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildObject {
    Deployment(Deployment),
    ConfigMap(ConfigMap),
    Secret(Secret),
}

impl ChildObject {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildObject::Deployment(_) => ChildKind::Deployment,
            ChildObject::ConfigMap(_) => ChildKind::ConfigMap,
            ChildObject::Secret(_) => ChildKind::Secret,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ChildObject::Deployment(d) => d.meta(),
            ChildObject::ConfigMap(c) => c.meta(),
            ChildObject::Secret(s) => s.meta(),
        }
    }

    fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ChildObject::Deployment(d) => d.meta_mut(),
            ChildObject::ConfigMap(c) => c.meta_mut(),
            ChildObject::Secret(s) => s.meta_mut(),
        }
    }

    pub fn name(&self) -> &str {
        self.meta().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.meta().namespace.as_deref().unwrap_or_default()
    }

    pub fn owner_references(&self) -> &[OwnerReference] {
        self.meta().owner_references.as_deref().unwrap_or_default()
    }

    /// Sets `owner` as the controller of this object, replacing any previous controller.
    pub fn set_controller(&mut self, owner: OwnerReference) {
        let refs = self.meta_mut().owner_references.get_or_insert_with(Vec::new);
        refs.retain(|r| r.uid != owner.uid && r.controller != Some(true));
        refs.push(owner);
    }
}

impl From<Deployment> for ChildObject {
    fn from(value: Deployment) -> Self {
        ChildObject::Deployment(value)
    }
}

impl From<ConfigMap> for ChildObject {
    fn from(value: ConfigMap) -> Self {
        ChildObject::ConfigMap(value)
    }
}

impl From<Secret> for ChildObject {
    fn from(value: Secret) -> Self {
        ChildObject::Secret(value)
    }
}

/// Every child a mesh should own, grouped in the order they are reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredChildren {
    pub deployments: Vec<ChildObject>,
    pub config_maps: Vec<ChildObject>,
    pub secrets: Vec<ChildObject>,
}

impl DesiredChildren {
    /// Builds all nine descriptors and makes `mesh` their controller.
    ///
    /// Fails without building anything partial if the owner reference cannot
    /// be constructed, e.g. when the mesh has not been persisted yet and has
    /// no uid.
    pub fn for_mesh(mesh: &Mesh) -> MeshOperatorResult<Self> {
        let namespace = mesh
            .namespace()
            .ok_or(MeshOperatorError::MissingObjectKey(".metadata.namespace"))?;
        let owner = mesh
            .controller_owner_ref(&())
            .ok_or_else(|| MeshOperatorError::OwnerReference {
                namespace: namespace.clone(),
                name: mesh.name_any(),
            })?;

        let mut deployments: Vec<ChildObject> = Vec::with_capacity(TIERS.len());
        let mut config_maps: Vec<ChildObject> = Vec::with_capacity(TIERS.len());
        let mut secrets: Vec<ChildObject> = Vec::with_capacity(TIERS.len());
        for tier in TIERS {
            deployments.push(tier_deployment(tier, &namespace, &mesh.spec)?.into());
            config_maps.push(tier_config_map(tier, &namespace).into());
            secrets.push(tier_secret(tier, &namespace).into());
        }

        let mut children = Self {
            deployments,
            config_maps,
            secrets,
        };
        children.iter_mut().for_each(|c| c.set_controller(owner.clone()));
        Ok(children)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChildObject> {
        self.deployments
            .iter()
            .chain(self.config_maps.iter())
            .chain(self.secrets.iter())
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut ChildObject> {
        self.deployments
            .iter_mut()
            .chain(self.config_maps.iter_mut())
            .chain(self.secrets.iter_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::crd::MeshSpec;

    fn mesh(uid: Option<&str>) -> Mesh {
        let mut mesh = Mesh::new(
            "demo",
            MeshSpec {
                replicas: 2,
                frontend_image: "img:f1".into(),
                backend_image: "img:b1".into(),
                app_image: "img:a1".into(),
            },
        );
        mesh.metadata.namespace = Some("ns1".into());
        mesh.metadata.uid = uid.map(String::from);
        mesh
    }

    #[test]
    fn builds_nine_owned_children_in_order() {
        let children = DesiredChildren::for_mesh(&mesh(Some("uid-1"))).unwrap();

        let names: Vec<_> = children.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(
            names,
            vec![
                "frontend",
                "backend",
                "app",
                "frontend-config",
                "backend-config",
                "app-config",
                "frontend-secrets",
                "backend-secrets",
                "app-secrets",
            ]
        );

        for child in children.iter() {
            assert_eq!(child.namespace(), "ns1");
            let refs = child.owner_references();
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].uid, "uid-1");
            assert_eq!(refs[0].kind, "Mesh");
            assert_eq!(refs[0].name, "demo");
            assert_eq!(refs[0].api_version, "mesh.com/v1alpha1");
            assert_eq!(refs[0].controller, Some(true));
        }
    }

    #[test]
    fn kinds_follow_groups() {
        let children = DesiredChildren::for_mesh(&mesh(Some("uid-1"))).unwrap();
        assert!(children
            .deployments
            .iter()
            .all(|c| c.kind() == ChildKind::Deployment));
        assert!(children
            .config_maps
            .iter()
            .all(|c| c.kind() == ChildKind::ConfigMap));
        assert!(children.secrets.iter().all(|c| c.kind() == ChildKind::Secret));
    }

    #[test]
    fn missing_uid_fails_owner_reference() {
        let err = DesiredChildren::for_mesh(&mesh(None)).unwrap_err();
        assert!(matches!(err, MeshOperatorError::OwnerReference { .. }));
    }

    #[test]
    fn set_controller_replaces_previous_controller() {
        let mut child: ChildObject = tier_secret(crate::k8s::tier::Tier::App, "ns1").into();
        let first = OwnerReference {
            api_version: "mesh.com/v1alpha1".into(),
            kind: "Mesh".into(),
            name: "old".into(),
            uid: "uid-old".into(),
            controller: Some(true),
            ..Default::default()
        };
        let second = OwnerReference {
            name: "new".into(),
            uid: "uid-new".into(),
            ..first.clone()
        };

        child.set_controller(first);
        child.set_controller(second);

        let refs = child.owner_references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "uid-new");
    }
}

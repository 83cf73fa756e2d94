use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Desired state of a three-tier mesh.
#[derive(CustomResource, Serialize, Deserialize, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "mesh.com",
    version = "v1alpha1",
    kind = "Mesh",
    plural = "meshes",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct MeshSpec {
    #[schemars(range(min = 0))]
    pub replicas: i32,
    pub frontend_image: String,
    pub backend_image: String,
    pub app_image: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn crd_is_namespaced_under_mesh_group() {
        let crd = Mesh::crd();
        assert_eq!(crd.spec.group, "mesh.com");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.kind, "Mesh");
        assert_eq!(crd.spec.names.plural, "meshes");
        assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    }

    #[test]
    fn spec_uses_camel_case_fields() {
        let spec: MeshSpec = serde_json::from_value(serde_json::json!({
            "replicas": 2,
            "frontendImage": "img:f1",
            "backendImage": "img:b1",
            "appImage": "img:a1",
        }))
        .unwrap();

        assert_eq!(spec.replicas, 2);
        assert_eq!(spec.frontend_image, "img:f1");
        assert_eq!(spec.backend_image, "img:b1");
        assert_eq!(spec.app_image, "img:a1");
    }
}

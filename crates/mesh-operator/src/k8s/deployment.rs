use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, PodSpec, PodTemplateSpec, SecretVolumeSource, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use crate::error::{MeshOperatorError, MeshOperatorResult};
use crate::operator::crd::MeshSpec;

use super::tier::Tier;

/// Builds the deployment for `tier` in `namespace`.
///
/// The pod runs a single container with the tier's image and mounts the tier's
/// config map and secret. Replicas are copied from the mesh spec and must not
/// be negative.
pub fn tier_deployment(
    tier: Tier,
    namespace: &str,
    spec: &MeshSpec,
) -> MeshOperatorResult<Deployment> {
    if spec.replicas < 0 {
        return Err(MeshOperatorError::InvalidSpec(format!(
            "replicas must not be negative, got {}",
            spec.replicas
        )));
    }

    let config_volume = tier.config_name();
    let secrets_volume = tier.secrets_name();

    let deployment = Deployment {
        metadata: generate_metadata(tier, namespace),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(tier.labels()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(tier.labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    volumes: Some(vec![
                        Volume {
                            name: config_volume.clone(),
                            config_map: Some(ConfigMapVolumeSource {
                                name: config_volume.clone(),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                        Volume {
                            name: secrets_volume.clone(),
                            secret: Some(SecretVolumeSource {
                                secret_name: Some(secrets_volume.clone()),
                                ..Default::default()
                            }),
                            ..Default::default()
                        },
                    ]),
                    containers: vec![Container {
                        name: tier.as_str().to_string(),
                        image: Some(tier.image(spec).to_string()),
                        volume_mounts: Some(vec![
                            VolumeMount {
                                name: config_volume,
                                mount_path: tier.config_mount_path(),
                                ..Default::default()
                            },
                            VolumeMount {
                                name: secrets_volume,
                                mount_path: tier.secrets_mount_path(),
                                ..Default::default()
                            },
                        ]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };
    Ok(deployment)
}

fn generate_metadata(tier: Tier, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(tier.deployment_name()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::tier::Tier;

pub fn tier_config_map(tier: Tier, namespace: &str) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(tier.config_name()),
            namespace: Some(namespace.to_string()),
            labels: Some(tier.labels()),
            ..Default::default()
        },
        data: Some(tier.config_payload()),
        ..Default::default()
    }
}

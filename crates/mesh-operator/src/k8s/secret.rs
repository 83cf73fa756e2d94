use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use super::tier::Tier;

/// The payload goes through `stringData` so the API server does the encoding.
pub fn tier_secret(tier: Tier, namespace: &str) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(tier.secrets_name()),
            namespace: Some(namespace.to_string()),
            labels: Some(tier.labels()),
            ..Default::default()
        },
        string_data: Some(tier.secret_payload()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::tier::SECRET_KEY;

    #[test]
    fn secret_carries_string_data() {
        let secret = tier_secret(Tier::Frontend, "ns1");

        assert_eq!(secret.metadata.name.as_deref(), Some("frontend-secrets"));
        assert_eq!(secret.metadata.labels, Some(Tier::Frontend.labels()));
        assert!(secret.data.is_none());
        assert_eq!(
            secret.string_data.unwrap().get(SECRET_KEY).map(String::as_str),
            Some("frontend secret")
        );
    }
}

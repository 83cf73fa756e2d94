use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::operator::crd::MeshSpec;

pub const TIER_LABEL: &str = "app";
pub const CONFIG_KEY: &str = "config.yaml";
pub const SECRET_KEY: &str = "secret.yaml";

/// One of the three tiers every mesh is made of.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Frontend,
    Backend,
    App,
}

/// Reconciliation order.
pub const TIERS: [Tier; 3] = [Tier::Frontend, Tier::Backend, Tier::App];

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Frontend => "frontend",
            Tier::Backend => "backend",
            Tier::App => "app",
        }
    }

    pub fn deployment_name(&self) -> String {
        self.as_str().to_string()
    }

    pub fn config_name(&self) -> String {
        format!("{}-config", self.as_str())
    }

    pub fn secrets_name(&self) -> String {
        format!("{}-secrets", self.as_str())
    }

    pub fn config_mount_path(&self) -> String {
        format!("/etc/{}", self.as_str())
    }

    pub fn secrets_mount_path(&self) -> String {
        format!("/etc/{}/secrets", self.as_str())
    }

    pub fn image<'a>(&self, spec: &'a MeshSpec) -> &'a str {
        match self {
            Tier::Frontend => &spec.frontend_image,
            Tier::Backend => &spec.backend_image,
            Tier::App => &spec.app_image,
        }
    }

    // Placeholder payloads until the mesh spec carries real configuration.
    pub fn config_payload(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            CONFIG_KEY.to_string(),
            format!("{} configuration", self.as_str()),
        )])
    }

    pub fn secret_payload(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(SECRET_KEY.to_string(), format!("{} secret", self.as_str()))])
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(TIER_LABEL.to_string(), self.as_str().to_string())])
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Tier::Frontend, "frontend", "frontend-config", "frontend-secrets")]
    #[case(Tier::Backend, "backend", "backend-config", "backend-secrets")]
    #[case(Tier::App, "app", "app-config", "app-secrets")]
    fn names_are_derived_from_the_tier(
        #[case] tier: Tier,
        #[case] deployment: &str,
        #[case] config: &str,
        #[case] secrets: &str,
    ) {
        assert_eq!(tier.deployment_name(), deployment);
        assert_eq!(tier.config_name(), config);
        assert_eq!(tier.secrets_name(), secrets);
        assert_eq!(tier.labels().get(TIER_LABEL).map(String::as_str), Some(deployment));
    }

    #[test]
    fn tiers_are_ordered_frontend_backend_app() {
        assert_eq!(TIERS, [Tier::Frontend, Tier::Backend, Tier::App]);
    }

    #[test]
    fn image_is_picked_per_tier() {
        let spec = MeshSpec {
            replicas: 1,
            frontend_image: "img:f1".into(),
            backend_image: "img:b1".into(),
            app_image: "img:a1".into(),
        };
        assert_eq!(Tier::Frontend.image(&spec), "img:f1");
        assert_eq!(Tier::Backend.image(&spec), "img:b1");
        assert_eq!(Tier::App.image(&spec), "img:a1");
    }

    #[test]
    fn payloads_use_fixed_keys() {
        assert_eq!(
            Tier::Backend.config_payload().get(CONFIG_KEY).map(String::as_str),
            Some("backend configuration")
        );
        assert_eq!(
            Tier::App.secret_payload().get(SECRET_KEY).map(String::as_str),
            Some("app secret")
        );
    }
}

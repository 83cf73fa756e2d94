use std::{env, path::PathBuf, sync::OnceLock, time::Duration};

use anyhow::Context;
use config::{Environment, File};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs::canonicalize;

pub static CONFIG_INSTANCE: OnceLock<Settings> = OnceLock::new();

use crate::error::{MeshError, MeshResult};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct BackoffSettings {
    #[serde(default = "default_backoff_initial_secs")]
    pub initial_secs: u64,
    #[serde(default = "default_backoff_max_secs")]
    pub max_secs: u64,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            initial_secs: default_backoff_initial_secs(),
            max_secs: default_backoff_max_secs(),
        }
    }
}

impl BackoffSettings {
    pub fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_secs)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }
}

/// Lease timing for `leader_elect`. Namespace falls back to `POD_NAMESPACE`,
/// then the watched namespace, then `default`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LeaderElectionSettings {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default = "default_lease_duration_secs")]
    pub lease_duration_secs: u64,
    #[serde(default = "default_renew_interval_secs")]
    pub renew_interval_secs: u64,
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
}

impl Default for LeaderElectionSettings {
    fn default() -> Self {
        Self {
            namespace: None,
            lease_duration_secs: default_lease_duration_secs(),
            renew_interval_secs: default_renew_interval_secs(),
            retry_interval_secs: default_retry_interval_secs(),
        }
    }
}

impl LeaderElectionSettings {
    pub fn lease_duration(&self) -> Duration {
        Duration::from_secs(self.lease_duration_secs)
    }

    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.renew_interval_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OperatorSettings {
    /// Address the health and readiness probes listen on.
    #[serde(default = "default_probe_address")]
    pub probe_address: String,

    /// Restricts the operator to a single namespace. Watches all namespaces when unset.
    #[serde(default)]
    pub watch_namespace: Option<String>,

    /// Delay before the follow-up pass after a deployment was created.
    #[serde(default)]
    pub requeue_delay_ms: u64,

    #[serde(default)]
    pub backoff: BackoffSettings,

    /// Only reconcile while holding the operator lease.
    #[serde(default)]
    pub leader_elect: bool,

    #[serde(default)]
    pub leader_election: LeaderElectionSettings,
}

impl Default for OperatorSettings {
    fn default() -> Self {
        Self {
            probe_address: default_probe_address(),
            watch_namespace: None,
            requeue_delay_ms: 0,
            backoff: BackoffSettings::default(),
            leader_elect: false,
            leader_election: LeaderElectionSettings::default(),
        }
    }
}

impl OperatorSettings {
    pub fn requeue_delay(&self) -> Duration {
        Duration::from_millis(self.requeue_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: LevelFilter,

    #[serde(default)]
    pub operator: OperatorSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            operator: OperatorSettings::default(),
        }
    }
}

pub fn get_config() -> MeshResult<&'static Settings> {
    CONFIG_INSTANCE.get().ok_or(MeshError::ConfigNotInitialized)
}

impl Settings {
    pub fn from_root(root: Option<PathBuf>) -> MeshResult<Self> {
        let curr_dir = std::env::current_dir().context("unable to get working directory")?;
        let root = root.unwrap_or(curr_dir);
        let root = canonicalize(&root)
            .with_context(|| format!("unable to canonicalize root {}", root.display()))?;

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let mut s = config::Config::builder();
        if root.is_file() {
            s = s.add_source(File::from(root.as_path()));
        }
        let s = s
            .add_source(File::with_name("config").required(false))
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(
                File::with_name(&format!("{}/config", root.as_path().display())).required(false),
            )
            .add_source(Environment::with_prefix("MESH").separator("__"))
            .build()?;

        let cfg = s.try_deserialize()?;
        Ok(cfg)
    }
}

fn default_log_level() -> LevelFilter {
    LevelFilter::Info
}

fn default_probe_address() -> String {
    "0.0.0.0:8081".to_string()
}

fn default_backoff_initial_secs() -> u64 {
    5
}

fn default_backoff_max_secs() -> u64 {
    300
}

fn default_lease_duration_secs() -> u64 {
    15
}

fn default_renew_interval_secs() -> u64 {
    5
}

fn default_retry_interval_secs() -> u64 {
    2
}

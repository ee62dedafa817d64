//! Shared configuration for the blobench CLI.
//!
//! TOML file merged with `BLOBENCH_*` environment variables, plus the
//! direct `GRAFANA_API_TOKEN` / `GRAFANA_DATASOURCE_ID` overrides that skip
//! the provisioning bootstrap entirely.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use blobench_core::EpochTiming;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub grafana: GrafanaConfig,

    #[serde(default)]
    pub timing: TimingConfig,
}

/// The enclave, service, and client identities under test.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Kurtosis enclave hosting the network.
    #[serde(default = "default_enclave")]
    pub enclave: String,

    /// Service whose interface gets shaped.
    #[serde(default = "default_service")]
    pub service: String,

    /// Network label probes match on.
    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default = "default_consensus_client")]
    pub consensus_client: String,

    #[serde(default = "default_execution_client")]
    pub execution_client: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            enclave: default_enclave(),
            service: default_service(),
            network: default_network(),
            consensus_client: default_consensus_client(),
            execution_client: default_execution_client(),
        }
    }
}

/// Metrics-backend access. Token and datasource stay optional here; absent
/// values are provisioned at startup through the admin account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GrafanaConfig {
    /// Explicit base URL; resolved from the enclave when unset.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Service-account token (plaintext here; prefer GRAFANA_API_TOKEN).
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default)]
    pub datasource_id: Option<String>,

    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for GrafanaConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            datasource_id: None,
            admin_user: default_admin_user(),
            admin_password: default_admin_password(),
        }
    }
}

/// Slot/epoch parameters of the target chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimingConfig {
    #[serde(default = "default_slot_duration_secs")]
    pub slot_duration_secs: u64,

    #[serde(default = "default_slots_per_epoch")]
    pub slots_per_epoch: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            slot_duration_secs: default_slot_duration_secs(),
            slots_per_epoch: default_slots_per_epoch(),
        }
    }
}

fn default_enclave() -> String {
    "ethereum".into()
}
fn default_service() -> String {
    "cl-1-prysm-geth".into()
}
fn default_network() -> String {
    "kurtosis".into()
}
fn default_consensus_client() -> String {
    "prysm".into()
}
fn default_execution_client() -> String {
    "geth".into()
}
fn default_admin_user() -> String {
    "admin".into()
}
fn default_admin_password() -> String {
    "admin".into()
}
fn default_slot_duration_secs() -> u64 {
    12
}
fn default_slots_per_epoch() -> u64 {
    32
}

// ── Loading ─────────────────────────────────────────────────────────

impl Config {
    /// Load configuration: defaults, then the TOML file (explicit path or
    /// the project config dir), then `BLOBENCH_*` environment variables
    /// (`BLOBENCH_TARGET__ENCLAVE`-style nesting).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(config_path, Path::to_path_buf);

        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("BLOBENCH_").split("__"));

        figment.extract().map_err(ConfigError::from)
    }

    /// Grafana token: `GRAFANA_API_TOKEN` wins over the config file.
    pub fn grafana_token(&self) -> Option<SecretString> {
        std::env::var("GRAFANA_API_TOKEN")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.grafana.api_token.clone())
            .map(SecretString::from)
    }

    /// Datasource UID: `GRAFANA_DATASOURCE_ID` wins over the config file.
    pub fn grafana_datasource_id(&self) -> Option<String> {
        std::env::var("GRAFANA_DATASOURCE_ID")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.grafana.datasource_id.clone())
    }

    /// Validated epoch timing for the degradation controller.
    pub fn epoch_timing(&self) -> Result<EpochTiming, ConfigError> {
        if self.timing.slot_duration_secs == 0 {
            return Err(ConfigError::Validation {
                field: "timing.slot_duration_secs".into(),
                reason: "must be positive".into(),
            });
        }
        if self.timing.slots_per_epoch == 0 {
            return Err(ConfigError::Validation {
                field: "timing.slots_per_epoch".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(EpochTiming {
            slot_duration: Duration::from_secs(self.timing.slot_duration_secs),
            slots_per_epoch: self.timing.slots_per_epoch,
        })
    }
}

/// Default config file location (`<project config dir>/config.toml`).
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "blobench")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("blobench.toml"))
}

//! OpsGenie notifier configuration.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, NotifyResult};

/// Environment variable that enables the OpsGenie notifier.
const ENV_ENABLED: &str = "OPSGENIE_ENABLED";
/// Environment variable for the cluster name shown in every alert.
const ENV_CLUSTER_NAME: &str = "OPSGENIE_CLUSTER_NAME";
/// Environment variable for the OpsGenie API key.
const ENV_API_KEY: &str = "OPSGENIE_API_KEY";
/// Environment variable for the OpsGenie API base URL.
const ENV_API_URL: &str = "OPSGENIE_API_URL";

/// Keys shorter than this are masked completely in logs.
const REDACT_TAIL_MIN_LEN: usize = 16;

/// Configuration for the OpsGenie notifier.
///
/// Immutable for the duration of a notification cycle; callers swap in a
/// new value between cycles to rotate keys or endpoints.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OpsGenieConfig {
    pub enabled: bool,
    pub cluster_name: String,
    pub api_key: String,
    /// Base URL of the alert API. Empty means the public endpoint.
    pub api_url: String,
}

impl OpsGenieConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let enabled = std::env::var(ENV_ENABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Self {
            enabled,
            cluster_name: std::env::var(ENV_CLUSTER_NAME).unwrap_or_default(),
            api_key: std::env::var(ENV_API_KEY).unwrap_or_default(),
            api_url: std::env::var(ENV_API_URL).unwrap_or_default(),
        }
    }

    /// Load configuration from a JSON or TOML file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> NotifyResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| NotifyError::Config(format!("{}: {e}", path.display())))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml(&raw)
        } else {
            Self::from_json(&raw)
        }
    }

    /// Parse configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] on malformed input.
    pub fn from_json(raw: &str) -> NotifyResult<Self> {
        serde_json::from_str(raw).map_err(|e| NotifyError::Config(e.to_string()))
    }

    /// Parse configuration from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Config`] on malformed input.
    pub fn from_toml(raw: &str) -> NotifyResult<Self> {
        toml::from_str(raw).map_err(|e| NotifyError::Config(e.to_string()))
    }

    /// API key reduced to its last four characters, safe for logs.
    ///
    /// Short keys are masked completely.
    #[must_use]
    pub fn redacted_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() < REDACT_TAIL_MIN_LEN {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for OpsGenieConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpsGenieConfig")
            .field("enabled", &self.enabled)
            .field("cluster_name", &self.cluster_name)
            .field("api_key", &self.redacted_key())
            .field("api_url", &self.api_url)
            .finish()
    }
}

//! Federation configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for resolution and remote fetching.
///
/// Every key is optional in TOML; missing keys take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    /// Domain of this instance. Identifiers on it are never fetched.
    pub local_domain: String,
    /// `User-Agent` sent with every remote request.
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Attachments above this size are rejected.
    pub max_attachment_bytes: u64,
    /// Longest chain of nested remote resolutions.
    pub max_depth: usize,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            local_domain: "localhost".to_string(),
            user_agent: concat!("quire/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 15,
            max_attachment_bytes: 10 * 1024 * 1024, // 10 MiB
            max_depth: 8,
        }
    }
}

impl FederationConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

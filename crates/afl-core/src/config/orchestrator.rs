//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_millis;
use super::server::{ServerEntry, ServerRegistry};
use crate::error::ConfigError;

/// Configuration for the remote session orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Path to the private key used for every SSH connection
    pub private_key_path: PathBuf,

    /// Time budget for a session-listing query
    #[serde(with = "duration_millis")]
    pub status_timeout: Duration,

    /// How long a host's session listing stays fresh
    #[serde(with = "duration_millis")]
    pub cache_ttl: Duration,

    /// Time budget for remote document reads and writes
    #[serde(with = "duration_millis")]
    pub document_timeout: Duration,

    /// Default number of log lines returned by `log`
    pub log_lines: usize,

    /// Server entries keyed by server name
    pub servers: BTreeMap<String, ServerEntry>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            private_key_path: dirs::home_dir()
                .unwrap_or_default()
                .join(".ssh")
                .join("id_rsa"),
            status_timeout: Duration::from_millis(500),
            cache_ttl: Duration::from_millis(5000),
            document_timeout: Duration::from_secs(10),
            log_lines: 200,
            servers: BTreeMap::new(),
        }
    }
}

impl OrchestratorConfig {
    /// Normalize the configured server entries into a registry
    pub fn registry(&self) -> Result<ServerRegistry, ConfigError> {
        ServerRegistry::normalize(&self.servers)
    }
}

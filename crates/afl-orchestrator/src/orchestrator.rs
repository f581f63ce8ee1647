//! The orchestrator facade
//!
//! `Orchestrator` owns the transport, the current server registry and the
//! per-host session cache. Operations are spread over the `lifecycle`,
//! `status` and `document` modules as further `impl` blocks.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use afl_core::config::OrchestratorConfig;
use afl_core::traits::RemoteTransport;
use afl_core::{ActionResult, ServerDefinition, ServerRegistry};

use crate::error::OrchestratorError;
use crate::status::ScreenSessionCache;

/// Tunables taken from the configuration file
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Time budget for session-listing queries
    pub status_timeout: Duration,
    /// Freshness window of the session cache
    pub cache_ttl: Duration,
    /// Default line count for log tails
    pub log_lines: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for OrchestratorSettings {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            status_timeout: config.status_timeout,
            cache_ttl: config.cache_ttl,
            log_lines: config.log_lines,
        }
    }
}

/// Remote session orchestrator
pub struct Orchestrator<T> {
    pub(crate) transport: Arc<T>,
    registry: RwLock<Arc<ServerRegistry>>,
    pub(crate) cache: ScreenSessionCache,
    pub(crate) settings: OrchestratorSettings,
}

impl<T: RemoteTransport> Orchestrator<T> {
    /// Create an orchestrator with default settings
    pub fn new(transport: T, registry: ServerRegistry) -> Self {
        Self::with_settings(transport, registry, OrchestratorSettings::default())
    }

    /// Create an orchestrator with explicit settings
    pub fn with_settings(
        transport: T,
        registry: ServerRegistry,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            registry: RwLock::new(Arc::new(registry)),
            cache: ScreenSessionCache::new(settings.cache_ttl),
            settings,
        }
    }

    /// The underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The per-host session cache
    pub fn cache(&self) -> &ScreenSessionCache {
        &self.cache
    }

    /// Snapshot of the current registry
    pub fn registry(&self) -> Arc<ServerRegistry> {
        Arc::clone(&self.registry.read())
    }

    /// Swap in a registry edited by an external collaborator.
    ///
    /// Calls already running keep the definitions they resolved.
    pub fn replace_registry(&self, registry: ServerRegistry) {
        tracing::info!("Registry replaced ({} servers)", registry.len());
        *self.registry.write() = Arc::new(registry);
    }

    /// Definition of a server by name
    pub fn server(&self, name: &str) -> Option<ServerDefinition> {
        self.registry.read().get(name).cloned()
    }

    /// All configured server names
    pub fn server_names(&self) -> Vec<String> {
        self.registry.read().names()
    }

    /// Active server names grouped by host
    pub fn get_servers_by_host(&self) -> BTreeMap<String, Vec<String>> {
        self.registry.read().servers_by_host()
    }

    /// Run an arbitrary command on a server's host.
    ///
    /// A `timeout_ms` of 0 means no time budget.
    pub async fn execute_command(
        &self,
        name: &str,
        command: &str,
        timeout_ms: u64,
    ) -> ActionResult {
        let server = match self.resolve_server(name) {
            Ok(server) => server,
            Err(e) => return ActionResult::failed(e),
        };

        let timeout = (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms));
        self.transport
            .execute(&server, command, timeout)
            .await
            .into()
    }

    pub(crate) fn resolve_server(&self, name: &str) -> Result<ServerDefinition, OrchestratorError> {
        self.server(name)
            .ok_or_else(|| OrchestratorError::ServerNotFound(name.to_string()))
    }

    pub(crate) fn resolve_host(&self, host: &str) -> Result<ServerDefinition, OrchestratorError> {
        self.registry
            .read()
            .representative_for_host(host)
            .cloned()
            .ok_or_else(|| OrchestratorError::NoServerForHost(host.to_string()))
    }
}

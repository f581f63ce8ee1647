//! Loaded CLI context: configuration, registry and output mode

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use afl_core::config::{self, OrchestratorConfig};
use afl_core::{AflError, ServerRegistry};
use afl_orchestrator::{Orchestrator, OrchestratorSettings, SshTransport};

/// Everything a subcommand needs before touching the network
pub struct App {
    /// Path the configuration was loaded from
    pub config_path: PathBuf,
    /// Parsed configuration file
    pub config: OrchestratorConfig,
    /// Normalized server registry
    pub registry: ServerRegistry,
    /// Print structured results as JSON
    pub json: bool,
}

impl App {
    /// Load and normalize the configuration at `path` (or the default path)
    pub fn load(path: Option<&Path>, json: bool) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(config::default_config_path);

        let config: OrchestratorConfig = config::load_config(&config_path)
            .with_context(|| format!("Failed to load {}", config_path.display()))?;
        let registry = config
            .registry()
            .with_context(|| format!("Invalid server registry in {}", config_path.display()))?;

        tracing::debug!(
            "Loaded {} servers from {}",
            registry.len(),
            config_path.display()
        );

        Ok(Self {
            config_path,
            config,
            registry,
            json,
        })
    }

    /// Build an orchestrator over SSH with the configured key and budgets
    pub fn orchestrator(&self) -> Result<Orchestrator<SshTransport>> {
        let key_path = &self.config.private_key_path;
        let transport = match load_transport(key_path, &self.config) {
            Ok(transport) => transport,
            Err(AflError::Io(e)) => {
                return Err(e).with_context(|| {
                    format!("Failed to read private key {}", key_path.display())
                })
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Unusable private key {}", key_path.display()))
            }
        };

        Ok(Orchestrator::with_settings(
            transport,
            self.registry.clone(),
            OrchestratorSettings::from(&self.config),
        ))
    }
}

/// Read the key file and build the SSH transport with the configured budgets
fn load_transport(key_path: &Path, config: &OrchestratorConfig) -> Result<SshTransport, AflError> {
    let key_material = std::fs::read(key_path)?;
    let transport = SshTransport::new(&key_material)?;
    Ok(transport.with_document_timeout(config.document_timeout))
}

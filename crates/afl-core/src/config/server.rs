//! Server registry: raw entries, validated definitions and host grouping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ConfigError;

/// Default shell used to run launch commands
pub const DEFAULT_SHELL: &str = "bash";

/// Default HTTP port a server exposes
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// A server entry as written in the configuration file.
///
/// Everything except `host` is optional here. [`ServerRegistry::normalize`]
/// turns a set of entries into validated [`ServerDefinition`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEntry {
    /// Remote host name or address
    pub host: String,

    /// SSH user (defaults to the current OS user)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Shell used to run the launch command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    /// Screen session name (defaults to the server name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Python module to run with `-m`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    /// Virtualenv directory activated before running `module`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    /// Script path to run instead of a module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Whether the server takes part in polling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// HTTP port exposed by the server process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_port: Option<u16>,
}

/// How a server process is launched inside its screen session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaunchSpec {
    /// `python3 -m <module>`, optionally inside an activated virtualenv
    Module { module: String, env: Option<String> },
    /// A script executed by the server's shell
    Script { path: String },
}

/// A validated server definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDefinition {
    /// Unique server name
    pub name: String,
    /// Remote host
    pub host: String,
    /// SSH user
    pub username: String,
    /// Shell used to run the launch command
    pub shell: String,
    /// Screen session name
    pub session_name: String,
    /// Launch form; `None` is a configuration error reported at start time
    pub launch: Option<LaunchSpec>,
    /// Whether the server takes part in polling
    pub active: bool,
    /// HTTP port exposed by the server process
    pub http_port: u16,
}

impl ServerDefinition {
    /// Create a definition with defaults for everything but the essentials
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            session_name: name.clone(),
            name,
            host: host.into(),
            username: username.into(),
            shell: DEFAULT_SHELL.to_string(),
            launch: None,
            active: true,
            http_port: DEFAULT_HTTP_PORT,
        }
    }

    /// Set the launch form
    pub fn with_launch(mut self, launch: LaunchSpec) -> Self {
        self.launch = Some(launch);
        self
    }

    /// Set the screen session name
    pub fn with_session_name(mut self, session_name: impl Into<String>) -> Self {
        self.session_name = session_name.into();
        self
    }

    /// Mark the server inactive
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Remote home directory of the SSH user
    pub fn remote_home(&self) -> String {
        format!("/home/{}", self.username)
    }

    fn from_entry(name: &str, entry: &ServerEntry) -> Result<Self, ConfigError> {
        if entry.host.trim().is_empty() {
            return Err(ConfigError::MissingField {
                server: name.to_string(),
                field: "host".to_string(),
            });
        }

        let launch = match (&entry.module, &entry.script) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingLaunch(name.to_string())),
            (Some(module), None) => Some(LaunchSpec::Module {
                module: module.clone(),
                env: entry.env.clone(),
            }),
            (None, Some(path)) => Some(LaunchSpec::Script { path: path.clone() }),
            (None, None) => {
                tracing::debug!("Server '{}' has no module or script; start will fail", name);
                None
            }
        };

        Ok(Self {
            name: name.to_string(),
            host: entry.host.trim().to_string(),
            username: entry
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(whoami::username),
            shell: entry
                .shell
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SHELL.to_string()),
            session_name: entry
                .session_name
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| name.to_string()),
            launch,
            active: entry.active.unwrap_or(true),
            http_port: entry.http_port.unwrap_or(DEFAULT_HTTP_PORT),
        })
    }
}

/// Read-only mapping of server name to definition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerRegistry {
    servers: BTreeMap<String, ServerDefinition>,
}

impl ServerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate raw entries and apply defaults, producing a new registry.
    ///
    /// The input is left untouched.
    pub fn normalize<'a, I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a String, &'a ServerEntry)>,
    {
        let mut servers = BTreeMap::new();
        for (name, entry) in entries {
            let definition = ServerDefinition::from_entry(name, entry)?;
            servers.insert(name.clone(), definition);
        }
        Ok(Self { servers })
    }

    /// Build a registry from already-validated definitions
    pub fn from_definitions(definitions: impl IntoIterator<Item = ServerDefinition>) -> Self {
        Self {
            servers: definitions
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// Look up a server by name
    pub fn get(&self, name: &str) -> Option<&ServerDefinition> {
        self.servers.get(name)
    }

    /// First server (by name) configured on `host`
    pub fn representative_for_host(&self, host: &str) -> Option<&ServerDefinition> {
        self.servers.values().find(|d| d.host == host)
    }

    /// Active server names grouped by host. Inactive servers are left out.
    pub fn servers_by_host(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for definition in self.servers.values().filter(|d| d.active) {
            grouped
                .entry(definition.host.clone())
                .or_default()
                .push(definition.name.clone());
        }
        grouped
    }

    /// Iterate definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = &ServerDefinition> {
        self.servers.values()
    }

    /// All server names in order
    pub fn names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    /// Number of servers
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

//! Orchestrator error types
//!
//! These never cross the public operation surface; each operation converts
//! them into a result value.

use thiserror::Error;

use afl_core::{DocumentError, TransportError};

/// Internal failure of an orchestrator operation
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// No server with this name in the registry
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// No server in the registry uses this host
    #[error("No server configured for host: {0}")]
    NoServerForHost(String),

    /// The server has neither a module nor a script to launch
    #[error("Server '{0}' has no module or script to launch")]
    MissingLaunchSpec(String),

    /// A value cannot be passed safely to the remote shell
    #[error("Cannot quote {0:?} for the remote shell")]
    Unquotable(String),

    /// The document already holds a snapshot under this timestamp
    #[error("Snapshot {0} already exists")]
    DuplicateSnapshot(String),

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Remote document failure
    #[error(transparent)]
    Document(#[from] DocumentError),
}

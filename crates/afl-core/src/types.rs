//! Result types returned by the orchestrator
//!
//! Every public operation hands back one of these values instead of an error,
//! so batch callers can keep going when one host fails.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Outcome of one remote command execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandResult {
    /// The remote process ran to completion
    Success {
        /// Combined stdout and stderr in arrival order
        output: String,
        exit_code: Option<u32>,
        exit_signal: Option<String>,
    },
    /// Connection, authentication or timeout failure
    SshDown,
}

impl CommandResult {
    /// Whether the command completed
    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success { .. })
    }

    /// Whether the transport failed
    pub fn is_ssh_down(&self) -> bool {
        matches!(self, CommandResult::SshDown)
    }

    /// Combined output if the command completed
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandResult::Success { output, .. } => Some(output),
            CommandResult::SshDown => None,
        }
    }
}

/// Outcome of a lifecycle action (start, stop, restart, log, exec)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionResult {
    /// The remote command ran
    Completed {
        output: String,
        exit_code: Option<u32>,
        exit_signal: Option<String>,
    },
    /// The host could not be reached
    SshDown,
    /// A configuration problem; no remote call was made
    Failed { error: String },
}

impl ActionResult {
    /// Build a configuration failure
    pub fn failed(error: impl fmt::Display) -> Self {
        ActionResult::Failed {
            error: error.to_string(),
        }
    }

    /// Whether the remote command ran
    pub fn is_success(&self) -> bool {
        matches!(self, ActionResult::Completed { .. })
    }

    /// Whether the host could not be reached
    pub fn is_ssh_down(&self) -> bool {
        matches!(self, ActionResult::SshDown)
    }
}

impl From<CommandResult> for ActionResult {
    fn from(result: CommandResult) -> Self {
        match result {
            CommandResult::Success {
                output,
                exit_code,
                exit_signal,
            } => ActionResult::Completed {
                output,
                exit_code,
                exit_signal,
            },
            CommandResult::SshDown => ActionResult::SshDown,
        }
    }
}

/// Outcome of a single-server status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatusResult {
    /// Whether the server's screen session is live
    Known { running: bool },
    SshDown,
    Failed { error: String },
}

/// Outcome of a whole-host status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchStatusResult {
    /// Live screen session names on the host
    Sessions { sessions: BTreeSet<String> },
    SshDown,
    Failed { error: String },
}

/// Per-server state derived from a status query, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    Running,
    Stopped,
    SshDown,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Running => write!(f, "RUNNING"),
            ServerState::Stopped => write!(f, "STOPPED"),
            ServerState::SshDown => write!(f, "SSH DOWN"),
        }
    }
}

impl From<&StatusResult> for ServerState {
    fn from(result: &StatusResult) -> Self {
        match result {
            StatusResult::Known { running: true } => ServerState::Running,
            StatusResult::Known { running: false } => ServerState::Stopped,
            StatusResult::SshDown | StatusResult::Failed { .. } => ServerState::SshDown,
        }
    }
}

/// Outcome of reading a remote text file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DocumentReadResult {
    Loaded { data: String },
    Failed { error: String },
}

/// Outcome of writing a remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteResult {
    Written,
    Failed { error: String },
}

impl WriteResult {
    /// Whether the write went through
    pub fn is_success(&self) -> bool {
        matches!(self, WriteResult::Written)
    }
}

/// Outcome of fetching the most recent configuration snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SnapshotResult {
    /// The newest entry of the remote document
    Latest {
        timestamp: String,
        snapshot: serde_json::Value,
    },
    /// The document is missing, unreadable or has no timestamped entries
    Empty,
    Failed { error: String },
}

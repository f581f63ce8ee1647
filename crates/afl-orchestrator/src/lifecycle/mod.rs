//! Lifecycle operations: start, stop, restart, log and join
//!
//! No local state is kept; a server's lifecycle is only observable through
//! its screen session on the remote host.

pub mod commands;

use afl_core::traits::{InteractiveSession, RemoteTransport};
use afl_core::ActionResult;

use crate::orchestrator::Orchestrator;

/// Outcome of attaching to a server's screen session
pub enum JoinOutcome {
    /// Attached; bytes flow both ways through the session
    Attached(InteractiveSession),
    /// The host could not be reached
    SshDown,
    /// A configuration problem; no remote call was made
    Failed { error: String },
}

impl<T: RemoteTransport> Orchestrator<T> {
    /// Launch a server in a detached, logged screen session
    pub async fn start_server(&self, name: &str) -> ActionResult {
        let (server, command) = match self
            .resolve_server(name)
            .and_then(|server| commands::start_command(&server).map(|c| (server, c)))
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Not starting {}: {}", name, e);
                return ActionResult::failed(e);
            }
        };

        tracing::info!("Starting {} on {}", name, server.host);
        self.transport.execute(&server, &command, None).await.into()
    }

    /// Ask a server's screen session to quit
    pub async fn stop_server(&self, name: &str) -> ActionResult {
        let (server, command) = match self
            .resolve_server(name)
            .and_then(|server| commands::stop_command(&server).map(|c| (server, c)))
        {
            Ok(found) => found,
            Err(e) => return ActionResult::failed(e),
        };

        tracing::info!("Stopping {} on {}", name, server.host);
        self.transport.execute(&server, &command, None).await.into()
    }

    /// Stop then start a server.
    ///
    /// A configuration failure of the stop aborts the restart. An unreachable
    /// host does not: the start is attempted anyway.
    pub async fn restart_server(&self, name: &str) -> ActionResult {
        match self.stop_server(name).await {
            failed @ ActionResult::Failed { .. } => failed,
            ActionResult::SshDown => {
                tracing::warn!("Stop of {} could not reach the host; starting anyway", name);
                self.start_server(name).await
            }
            ActionResult::Completed { .. } => self.start_server(name).await,
        }
    }

    /// Last `lines` lines of a server's log (the configured default if `None`)
    pub async fn get_server_log(&self, name: &str, lines: Option<usize>) -> ActionResult {
        let lines = lines.unwrap_or(self.settings.log_lines);
        let (server, command) = match self
            .resolve_server(name)
            .and_then(|server| commands::log_command(&server, lines).map(|c| (server, c)))
        {
            Ok(found) => found,
            Err(e) => return ActionResult::failed(e),
        };

        self.transport.execute(&server, &command, None).await.into()
    }

    /// Attach to a server's screen session for interactive use
    pub async fn join_server(&self, name: &str) -> JoinOutcome {
        let (server, command) = match self
            .resolve_server(name)
            .and_then(|server| commands::join_command(&server).map(|c| (server, c)))
        {
            Ok(found) => found,
            Err(e) => {
                return JoinOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };

        match self.transport.open_interactive(&server, &command).await {
            Ok(session) => JoinOutcome::Attached(session),
            Err(e) => {
                tracing::debug!(error = %e, "Join {} failed", name);
                JoinOutcome::SshDown
            }
        }
    }
}

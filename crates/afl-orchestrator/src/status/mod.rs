//! Status queries backed by a per-host session cache
//!
//! A single-server query and a whole-host query for the same host share one
//! cache entry, so within the freshness window both see the same session set,
//! whichever of them refreshed it.

mod cache;
mod parser;

pub use cache::{CacheEntry, ScreenSessionCache, DEFAULT_CACHE_TTL};
pub use parser::{parse_session_list, SESSION_LIST_COMMAND};

use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use afl_core::traits::RemoteTransport;
use afl_core::{BatchStatusResult, CommandResult, ServerDefinition, ServerState, StatusResult};

use crate::orchestrator::Orchestrator;

impl<T: RemoteTransport> Orchestrator<T> {
    /// Whether a server's screen session is live
    pub async fn get_server_status(&self, name: &str) -> StatusResult {
        let server = match self.resolve_server(name) {
            Ok(server) => server,
            Err(e) => {
                return StatusResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        let sessions = match self.cache.fresh(&server.host) {
            Some(sessions) => {
                tracing::trace!("Status of {} served from cache", name);
                sessions
            }
            None => match self.refresh_sessions(&server).await {
                Some(sessions) => sessions,
                None => return StatusResult::SshDown,
            },
        };

        StatusResult::Known {
            running: sessions.contains(&server.session_name),
        }
    }

    /// Every live session on a host, refreshing the shared cache entry
    pub async fn get_batch_server_status(&self, host: &str) -> BatchStatusResult {
        let server = match self.resolve_host(host) {
            Ok(server) => server,
            Err(e) => {
                return BatchStatusResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        match self.refresh_sessions(&server).await {
            Some(sessions) => BatchStatusResult::Sessions {
                sessions: (*sessions).clone(),
            },
            None => BatchStatusResult::SshDown,
        }
    }

    /// State of every active server, one isolated batch query per host.
    ///
    /// Hosts are queried concurrently; an unreachable host marks its own
    /// servers `SshDown` and does not hold up the others.
    pub async fn poll_all(&self) -> BTreeMap<String, ServerState> {
        let registry = self.registry();
        let by_host = registry.servers_by_host();

        let polls = by_host.iter().map(|(host, names)| async move {
            let result = self.get_batch_server_status(host).await;
            (names, result)
        });

        let mut states = BTreeMap::new();
        for (names, result) in join_all(polls).await {
            for name in names {
                let Some(server) = registry.get(name) else {
                    continue;
                };
                let state = match &result {
                    BatchStatusResult::Sessions { sessions } => {
                        if sessions.contains(&server.session_name) {
                            ServerState::Running
                        } else {
                            ServerState::Stopped
                        }
                    }
                    BatchStatusResult::SshDown | BatchStatusResult::Failed { .. } => {
                        ServerState::SshDown
                    }
                };
                states.insert(name.clone(), state);
            }
        }
        states
    }

    /// List sessions on the server's host and store them in the cache.
    /// `None` when the host cannot be reached.
    async fn refresh_sessions(&self, server: &ServerDefinition) -> Option<Arc<BTreeSet<String>>> {
        let result = self
            .transport
            .execute(
                server,
                SESSION_LIST_COMMAND,
                Some(self.settings.status_timeout),
            )
            .await;

        match result {
            CommandResult::Success { output, .. } => {
                let sessions = parse_session_list(&output);
                tracing::debug!("{} live sessions on {}", sessions.len(), server.host);
                Some(self.cache.store(&server.host, sessions))
            }
            CommandResult::SshDown => {
                tracing::debug!("Session listing on {} failed", server.host);
                None
            }
        }
    }
}

//! Remote document store
//!
//! Reads and writes small text files over a file-transfer sub-session and
//! keeps the per-host configuration snapshot document.
//!
//! `save_snapshot` is a read-modify-write with no remote locking: two saves
//! racing against the same host can lose one snapshot. Callers are expected
//! to save one snapshot per host at a time.

mod snapshot;

pub use snapshot::RemoteConfigDocument;

use serde_json::Value;

use afl_core::time::snapshot_timestamp_now;
use afl_core::traits::RemoteTransport;
use afl_core::{DocumentReadResult, ServerDefinition, SnapshotResult, WriteResult};

use crate::error::OrchestratorError;
use crate::lifecycle::commands::REMOTE_DIR;
use crate::orchestrator::Orchestrator;

/// File name of the snapshot document inside the remote afl directory
pub const SNAPSHOT_FILE: &str = "config.json";

/// Absolute path of the snapshot document for a server's user
pub fn snapshot_path(server: &ServerDefinition) -> String {
    format!("{}/{}/{}", server.remote_home(), REMOTE_DIR, SNAPSHOT_FILE)
}

impl<T: RemoteTransport> Orchestrator<T> {
    /// Read a remote file as text through a server on `host`
    pub async fn read_remote_document(&self, host: &str, path: &str) -> DocumentReadResult {
        match self.read_text(host, path).await {
            Ok(data) => DocumentReadResult::Loaded { data },
            Err(e) => DocumentReadResult::Failed {
                error: e.to_string(),
            },
        }
    }

    /// Write a remote file through a server on `host`
    pub async fn write_remote_document(
        &self,
        host: &str,
        path: &str,
        content: &str,
    ) -> WriteResult {
        let result = match self.resolve_host(host) {
            Ok(server) => self
                .transport
                .write_file(&server, path, content)
                .await
                .map_err(OrchestratorError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => WriteResult::Written,
            Err(e) => {
                tracing::warn!("Writing {} on {} failed: {}", path, host, e);
                WriteResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// The newest snapshot in the host's document
    pub async fn get_remote_snapshot(&self, host: &str) -> SnapshotResult {
        let server = match self.resolve_host(host) {
            Ok(server) => server,
            Err(e) => {
                return SnapshotResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        let document = self.load_snapshot_document(&server).await;
        match document.latest() {
            Some((timestamp, snapshot)) => SnapshotResult::Latest {
                timestamp: timestamp.to_string(),
                snapshot: snapshot.clone(),
            },
            None => SnapshotResult::Empty,
        }
    }

    /// Append `snapshot` to the host's document under a timestamp for now
    pub async fn save_snapshot(&self, host: &str, snapshot: Value) -> WriteResult {
        match self.save_snapshot_inner(host, snapshot).await {
            Ok(key) => {
                tracing::info!("Saved snapshot {} on {}", key, host);
                WriteResult::Written
            }
            Err(e) => {
                tracing::warn!("Saving snapshot on {} failed: {}", host, e);
                WriteResult::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn save_snapshot_inner(
        &self,
        host: &str,
        snapshot: Value,
    ) -> Result<String, OrchestratorError> {
        let server = self.resolve_host(host)?;
        let mut document = self.load_snapshot_document(&server).await;

        let key = snapshot_timestamp_now();
        if !document.insert_snapshot(key.clone(), snapshot) {
            return Err(OrchestratorError::DuplicateSnapshot(key));
        }

        let content = document.to_json()?;
        self.transport
            .write_file(&server, &snapshot_path(&server), &content)
            .await?;
        Ok(key)
    }

    async fn read_text(&self, host: &str, path: &str) -> Result<String, OrchestratorError> {
        let server = self.resolve_host(host)?;
        Ok(self.transport.read_file(&server, path).await?)
    }

    /// The host's snapshot document; unreadable or malformed counts as empty
    async fn load_snapshot_document(&self, server: &ServerDefinition) -> RemoteConfigDocument {
        let path = snapshot_path(server);
        let text = match self.transport.read_file(server, &path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("No snapshot document at {} on {}: {}", path, server.host, e);
                return RemoteConfigDocument::new();
            }
        };

        RemoteConfigDocument::parse(&text).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed {} on {}: {}", path, server.host, e);
            RemoteConfigDocument::new()
        })
    }
}

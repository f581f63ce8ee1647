//! afl-orchestrator: Remote screen session orchestration over SSH
//!
//! The orchestrator starts, stops and inspects long-running server
//! processes that live in named `screen` sessions on remote hosts. Every
//! remote call opens its own authenticated SSH connection and closes it
//! before returning. Session listings are cached per host for a short
//! window, and a small JSON document on each host keeps timestamped
//! configuration snapshots.

pub mod auth;
pub mod document;
pub mod error;
pub mod lifecycle;
pub mod orchestrator;
pub mod status;
pub mod transport;

pub use document::RemoteConfigDocument;
pub use error::OrchestratorError;
pub use lifecycle::JoinOutcome;
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use status::ScreenSessionCache;
pub use transport::SshTransport;

//! afl-core: Core abstractions and configuration for afl
//!
//! This crate provides the server registry, configuration file model,
//! result types and the transport trait shared by the orchestrator and CLI.

pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use config::{LaunchSpec, ServerDefinition, ServerRegistry};
pub use error::{AflError, ConfigError, DocumentError, TransportError};
pub use types::{
    ActionResult, BatchStatusResult, CommandResult, DocumentReadResult, ServerState,
    SnapshotResult, StatusResult, WriteResult,
};

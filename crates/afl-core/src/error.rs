//! Core error types for afl

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the afl ecosystem
#[derive(Error, Debug)]
pub enum AflError {
    /// Transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Remote document error
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-level failures.
///
/// Callers of the public orchestrator surface never see these directly; they
/// collapse into a single "SSH down" signal. The variants exist for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Private key material could not be decoded
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// TCP connect or SSH handshake failed
    #[error("Connection to {host} failed: {reason}")]
    Connect { host: String, reason: String },

    /// Public key authentication was rejected
    #[error("Authentication rejected for {user}@{host}")]
    AuthRejected { host: String, user: String },

    /// Opening or driving a channel failed
    #[error("Channel error: {0}")]
    Channel(String),

    /// File transfer sub-protocol error
    #[error("SFTP error: {0}")]
    Sftp(String),

    /// The time budget elapsed before a terminal outcome
    #[error("Timed out after {0} ms")]
    TimedOut(u64),
}

/// Errors reading or writing the remote JSON document
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The document is not a JSON object
    #[error("Malformed document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document root is valid JSON but not an object
    #[error("Document root must be an object")]
    NotAnObject,
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Missing required field
    #[error("Missing required field '{field}' for server '{server}'")]
    MissingField { server: String, field: String },

    /// Both launch forms configured for one server
    #[error("Server '{0}' sets both 'module' and 'script'; exactly one is allowed")]
    ConflictingLaunch(String),
}

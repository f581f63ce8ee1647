//! Transport traits

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::ServerDefinition;
use crate::error::TransportError;
use crate::types::CommandResult;

/// One-connection-per-call access to a remote host.
///
/// Implementations open a fresh authenticated connection for every call and
/// tear it down before returning; nothing is pooled.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Run `command` on the server's host and collect its combined output.
    ///
    /// Resolves exactly once. `None` means no time budget. Every transport
    /// level failure, including the budget elapsing, is `SshDown`.
    async fn execute(
        &self,
        server: &ServerDefinition,
        command: &str,
        timeout: Option<Duration>,
    ) -> CommandResult;

    /// Run `command` on a pseudo-terminal and stream bytes both ways
    async fn open_interactive(
        &self,
        server: &ServerDefinition,
        command: &str,
    ) -> Result<InteractiveSession, TransportError>;

    /// Read a remote file as text over a file-transfer sub-session
    async fn read_file(&self, server: &ServerDefinition, path: &str)
        -> Result<String, TransportError>;

    /// Write a remote file, creating its parent directory if needed
    async fn write_file(
        &self,
        server: &ServerDefinition,
        path: &str,
        contents: &str,
    ) -> Result<(), TransportError>;
}

/// Input sent to an interactive remote process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InteractiveInput {
    /// Bytes for the remote stdin
    Data(Bytes),
    /// New terminal size
    Resize { cols: u32, rows: u32 },
}

/// A live interactive session.
///
/// Output chunks are delivered as they arrive. The output channel closes when
/// the remote side exits; dropping every input handle closes the connection.
pub struct InteractiveSession {
    input: mpsc::Sender<InteractiveInput>,
    output: mpsc::Receiver<Bytes>,
}

/// Cloneable write side of an [`InteractiveSession`]
#[derive(Debug, Clone)]
pub struct InteractiveWriter {
    input: mpsc::Sender<InteractiveInput>,
}

impl InteractiveSession {
    /// Wrap the channel pair driven by a transport
    pub fn new(input: mpsc::Sender<InteractiveInput>, output: mpsc::Receiver<Bytes>) -> Self {
        Self { input, output }
    }

    /// Next chunk of remote output, or `None` once the remote side is gone
    pub async fn read(&mut self) -> Option<Bytes> {
        self.output.recv().await
    }

    /// Send bytes to the remote process
    pub async fn write(&self, data: impl Into<Bytes>) -> Result<(), TransportError> {
        send_input(&self.input, InteractiveInput::Data(data.into())).await
    }

    /// Resize the remote pseudo-terminal
    pub async fn resize(&self, cols: u32, rows: u32) -> Result<(), TransportError> {
        send_input(&self.input, InteractiveInput::Resize { cols, rows }).await
    }

    /// Detach; the transport closes the connection once input is gone
    pub fn close(self) {
        drop(self);
    }

    /// Split into a writer and the output receiver
    pub fn split(self) -> (InteractiveWriter, mpsc::Receiver<Bytes>) {
        (InteractiveWriter { input: self.input }, self.output)
    }
}

impl InteractiveWriter {
    /// Send bytes to the remote process
    pub async fn write(&self, data: impl Into<Bytes>) -> Result<(), TransportError> {
        send_input(&self.input, InteractiveInput::Data(data.into())).await
    }

    /// Resize the remote pseudo-terminal
    pub async fn resize(&self, cols: u32, rows: u32) -> Result<(), TransportError> {
        send_input(&self.input, InteractiveInput::Resize { cols, rows }).await
    }
}

async fn send_input(
    input: &mpsc::Sender<InteractiveInput>,
    message: InteractiveInput,
) -> Result<(), TransportError> {
    input
        .send(message)
        .await
        .map_err(|_| TransportError::Channel("interactive session closed".to_string()))
}

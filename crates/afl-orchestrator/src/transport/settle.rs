//! Exactly-once resolution of a remote command
//!
//! A command execution races three ways to an outcome: the remote process
//! closing its channel, a transport error, and the time budget elapsing.
//! Connection drivers report everything they observe as [`TransportEvent`]s;
//! [`resolve`] folds them through a [`CommandSettle`] and returns the first
//! terminal outcome. Anything arriving afterwards is ignored.

use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use afl_core::{CommandResult, TransportError};

/// Something a connection driver observed while running a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Authenticated and the command was sent
    Ready,
    /// A chunk from stdout or stderr
    Data(Bytes),
    /// Remote exit code
    ExitStatus(u32),
    /// Remote process was killed by a signal
    ExitSignal(String),
    /// The channel closed after the process exited
    Closed,
    /// Connection, authentication or channel failure
    Error(TransportError),
    /// The time budget elapsed
    TimedOut(Duration),
}

/// Accumulates output and resolves a command exactly once
#[derive(Debug, Default)]
pub struct CommandSettle {
    output: BytesMut,
    exit_code: Option<u32>,
    exit_signal: Option<String>,
    settled: bool,
}

impl CommandSettle {
    /// Create an unsettled accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal outcome has been produced
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Apply one event. Returns the result the first time a terminal event
    /// arrives and `None` for every other call.
    pub fn apply(&mut self, event: TransportEvent) -> Option<CommandResult> {
        if self.settled {
            tracing::trace!(?event, "Ignoring event after settle");
            return None;
        }

        match event {
            TransportEvent::Ready => {
                tracing::trace!("Command started");
                None
            }
            TransportEvent::Data(chunk) => {
                self.output.extend_from_slice(&chunk);
                None
            }
            TransportEvent::ExitStatus(code) => {
                self.exit_code = Some(code);
                None
            }
            TransportEvent::ExitSignal(signal) => {
                self.exit_signal = Some(signal);
                None
            }
            TransportEvent::Closed => {
                let output = String::from_utf8_lossy(&self.output).into_owned();
                self.settle(CommandResult::Success {
                    output,
                    exit_code: self.exit_code,
                    exit_signal: self.exit_signal.clone(),
                })
            }
            TransportEvent::Error(error) => {
                tracing::debug!(%error, "Transport failure");
                self.settle(CommandResult::SshDown)
            }
            TransportEvent::TimedOut(limit) => {
                tracing::warn!("Command timed out after {:?}", limit);
                self.settle(CommandResult::SshDown)
            }
        }
    }

    fn settle(&mut self, result: CommandResult) -> Option<CommandResult> {
        self.settled = true;
        self.output.clear();
        Some(result)
    }
}

/// Drive `events` to a single outcome, bounded by `timeout` when set.
///
/// The timer lives inside this future, so it is gone once the call returns.
/// The receiver is dropped on return as well; a driver still sending learns
/// that nobody is listening and stops.
pub async fn resolve(
    mut events: mpsc::Receiver<TransportEvent>,
    timeout: Option<Duration>,
) -> CommandResult {
    let mut settle = CommandSettle::new();
    let deadline = timeout.map(|limit| (Instant::now() + limit, limit));

    let timer = async move {
        match deadline {
            Some((at, limit)) => {
                tokio::time::sleep_until(at).await;
                limit
            }
            None => std::future::pending().await,
        }
    };
    tokio::pin!(timer);

    loop {
        // A deadline that has passed wins over queued output
        let event = tokio::select! {
            biased;
            limit = &mut timer => TransportEvent::TimedOut(limit),
            event = events.recv() => event.unwrap_or_else(|| {
                TransportEvent::Error(TransportError::Channel(
                    "connection driver stopped without an outcome".to_string(),
                ))
            }),
        };

        if let Some(result) = settle.apply(event) {
            return result;
        }
    }
}

//! SSH transport
//!
//! Opens one authenticated connection per call and tears it down before the
//! call returns. Command output is reported to [`resolve`] as events so the
//! timeout, error and completion paths settle exactly once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use russh::client::{self, Config, Handle, Msg};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::{KeyPair, PublicKey};
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::{Status, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use afl_core::traits::{InteractiveInput, InteractiveSession, RemoteTransport};
use afl_core::{CommandResult, ServerDefinition, TransportError};

use super::settle::{resolve, TransportEvent};
use crate::auth::SharedKey;

/// Port every host is reached on
pub const SSH_PORT: u16 = 22;

/// Buffered events between a connection driver and its resolver
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Buffered chunks in each direction of an interactive session
const INTERACTIVE_CHANNEL_CAPACITY: usize = 256;

/// Terminal type requested for interactive sessions
const INTERACTIVE_TERM: &str = "xterm-256color";

/// [`RemoteTransport`] over russh
pub struct SshTransport {
    key: Arc<SharedKey>,
    config: Arc<Config>,
    port: u16,
    document_timeout: Duration,
}

impl SshTransport {
    /// Create a transport from raw private key material
    pub fn new(key_material: &[u8]) -> Result<Self, TransportError> {
        Ok(Self {
            key: Arc::new(SharedKey::from_material(key_material)?),
            config: Arc::new(Config::default()),
            port: SSH_PORT,
            document_timeout: Duration::from_secs(10),
        })
    }

    /// Reach hosts on another port than 22
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the time budget for file transfer calls
    pub fn with_document_timeout(mut self, timeout: Duration) -> Self {
        self.document_timeout = timeout;
        self
    }

    /// Swap the private key used by later calls
    pub fn reload_key(&self, key_material: &[u8]) -> Result<(), TransportError> {
        self.key.reload(key_material)
    }

    async fn read_file_inner(
        &self,
        server: &ServerDefinition,
        path: &str,
    ) -> Result<String, TransportError> {
        let (session, sftp) = open_sftp(&self.config, self.port, &self.key, server).await?;

        let mut file = sftp.open(path).await.map_err(sftp_error)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .await
            .map_err(|e| TransportError::Sftp(format!("reading {}: {}", path, e)))?;

        let _ = sftp.close().await;
        disconnect(&session).await;
        Ok(contents)
    }

    async fn write_file_inner(
        &self,
        server: &ServerDefinition,
        path: &str,
        contents: &str,
    ) -> Result<(), TransportError> {
        let (session, sftp) = open_sftp(&self.config, self.port, &self.key, server).await?;

        if let Some((parent, _)) = path.rsplit_once('/') {
            if !parent.is_empty() {
                ensure_dir(&sftp, parent, &server.host).await;
            }
        }

        let mut file = sftp.create(path).await.map_err(sftp_error)?;
        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| TransportError::Sftp(format!("writing {}: {}", path, e)))?;
        file.shutdown()
            .await
            .map_err(|e| TransportError::Sftp(format!("closing {}: {}", path, e)))?;

        let _ = sftp.close().await;
        disconnect(&session).await;
        Ok(())
    }

    async fn bounded<T, F>(&self, work: F) -> Result<T, TransportError>
    where
        F: std::future::Future<Output = Result<T, TransportError>>,
    {
        tokio::time::timeout(self.document_timeout, work)
            .await
            .map_err(|_| TransportError::TimedOut(self.document_timeout.as_millis() as u64))?
    }
}

#[async_trait]
impl RemoteTransport for SshTransport {
    async fn execute(
        &self,
        server: &ServerDefinition,
        command: &str,
        timeout: Option<Duration>,
    ) -> CommandResult {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        // Whichever way this call ends, the driver is told to drop its connection
        let _teardown = cancel.clone().drop_guard();

        tracing::debug!(host = %server.host, "Executing: {}", command);
        tokio::spawn(drive_command(
            Arc::clone(&self.config),
            self.port,
            self.key.get(),
            server.clone(),
            command.to_string(),
            event_tx,
            cancel,
        ));

        resolve(event_rx, timeout).await
    }

    async fn open_interactive(
        &self,
        server: &ServerDefinition,
        command: &str,
    ) -> Result<InteractiveSession, TransportError> {
        let session = connect(&self.config, self.port, self.key.get(), server).await?;
        let channel = session
            .channel_open_session()
            .await
            .map_err(channel_error)?;

        channel
            .request_pty(false, INTERACTIVE_TERM, 80, 24, 0, 0, &[])
            .await
            .map_err(channel_error)?;
        channel.exec(true, command).await.map_err(channel_error)?;

        let (input_tx, input_rx) = mpsc::channel(INTERACTIVE_CHANNEL_CAPACITY);
        let (output_tx, output_rx) = mpsc::channel(INTERACTIVE_CHANNEL_CAPACITY);

        tracing::info!(host = %server.host, "Interactive session opened: {}", command);
        tokio::spawn(pump_interactive(session, channel, input_rx, output_tx));

        Ok(InteractiveSession::new(input_tx, output_rx))
    }

    async fn read_file(
        &self,
        server: &ServerDefinition,
        path: &str,
    ) -> Result<String, TransportError> {
        self.bounded(self.read_file_inner(server, path)).await
    }

    async fn write_file(
        &self,
        server: &ServerDefinition,
        path: &str,
        contents: &str,
    ) -> Result<(), TransportError> {
        self.bounded(self.write_file_inner(server, path, contents))
            .await
    }
}

/// Connect, run one command and report what happens as events.
///
/// Cancellation disconnects whatever stage the call reached.
async fn drive_command(
    config: Arc<Config>,
    port: u16,
    key: Arc<KeyPair>,
    server: ServerDefinition,
    command: String,
    events: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    let connected = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!(host = %server.host, "Abandoned while connecting");
            return;
        }
        connected = connect(&config, port, key, &server) => connected,
    };
    let session = match connected {
        Ok(session) => session,
        Err(e) => {
            let _ = events.send(TransportEvent::Error(e)).await;
            return;
        }
    };

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            tracing::debug!(host = %server.host, "Connection destroyed before completion");
            disconnect(&session).await;
            return;
        }
        outcome = run_command(&session, &command, &events) => outcome,
    };

    let event = match outcome {
        Ok(()) => TransportEvent::Closed,
        Err(e) => TransportEvent::Error(e),
    };
    let _ = events.send(event).await;
    disconnect(&session).await;
}

/// Run `command` on a fresh channel. Succeeds only once the channel closes;
/// a connection that drops first is an error.
async fn run_command(
    session: &Handle<ClientHandler>,
    command: &str,
    events: &mpsc::Sender<TransportEvent>,
) -> Result<(), TransportError> {
    let mut channel = session
        .channel_open_session()
        .await
        .map_err(channel_error)?;
    channel.exec(true, command).await.map_err(channel_error)?;

    if events.send(TransportEvent::Ready).await.is_err() {
        return Ok(());
    }

    loop {
        let Some(msg) = channel.wait().await else {
            return Err(TransportError::Channel(
                "connection lost before the channel closed".to_string(),
            ));
        };

        let event = match msg {
            ChannelMsg::Data { data } => TransportEvent::Data(Bytes::copy_from_slice(&data)),
            ChannelMsg::ExtendedData { data, .. } => {
                TransportEvent::Data(Bytes::copy_from_slice(&data))
            }
            ChannelMsg::ExitStatus { exit_status } => TransportEvent::ExitStatus(exit_status),
            ChannelMsg::ExitSignal { signal_name, .. } => {
                TransportEvent::ExitSignal(format!("{:?}", signal_name))
            }
            ChannelMsg::Close => return Ok(()),
            _ => continue,
        };

        if events.send(event).await.is_err() {
            // Resolver already settled
            return Ok(());
        }
    }
}

/// Forward bytes between an interactive channel and its session handles
async fn pump_interactive(
    session: Handle<ClientHandler>,
    mut channel: Channel<Msg>,
    mut input: mpsc::Receiver<InteractiveInput>,
    output: mpsc::Sender<Bytes>,
) {
    loop {
        tokio::select! {
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { data }) | Some(ChannelMsg::ExtendedData { data, .. }) => {
                    if output.send(Bytes::copy_from_slice(&data)).await.is_err() {
                        break;
                    }
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            },
            next = input.recv() => match next {
                Some(InteractiveInput::Data(bytes)) => {
                    if let Err(e) = channel.data(&bytes[..]).await {
                        tracing::warn!("Interactive write failed: {}", e);
                        break;
                    }
                }
                Some(InteractiveInput::Resize { cols, rows }) => {
                    if let Err(e) = channel.window_change(cols, rows, 0, 0).await {
                        tracing::debug!("Window change rejected: {}", e);
                    }
                }
                None => break,
            },
        }
    }

    tracing::info!("Interactive session closed");
    disconnect(&session).await;
}

async fn connect(
    config: &Arc<Config>,
    port: u16,
    key: Arc<KeyPair>,
    server: &ServerDefinition,
) -> Result<Handle<ClientHandler>, TransportError> {
    tracing::debug!("Connecting to {}@{}:{}", server.username, server.host, port);

    let handler = ClientHandler {
        host: server.host.clone(),
    };
    let mut session = client::connect(
        Arc::clone(config),
        (server.host.as_str(), port),
        handler,
    )
    .await
    .map_err(|e| TransportError::Connect {
        host: server.host.clone(),
        reason: e.to_string(),
    })?;

    let authenticated = session
        .authenticate_publickey(&server.username, key)
        .await
        .map_err(|e| TransportError::Connect {
            host: server.host.clone(),
            reason: format!("authentication error: {}", e),
        })?;

    if !authenticated {
        return Err(TransportError::AuthRejected {
            host: server.host.clone(),
            user: server.username.clone(),
        });
    }

    Ok(session)
}

async fn open_sftp(
    config: &Arc<Config>,
    port: u16,
    key: &SharedKey,
    server: &ServerDefinition,
) -> Result<(Handle<ClientHandler>, SftpSession), TransportError> {
    let session = connect(config, port, key.get(), server).await?;
    let channel = session
        .channel_open_session()
        .await
        .map_err(channel_error)?;
    channel
        .request_subsystem(true, "sftp")
        .await
        .map_err(channel_error)?;

    let sftp = SftpSession::new(channel.into_stream())
        .await
        .map_err(sftp_error)?;
    Ok((session, sftp))
}

async fn disconnect(session: &Handle<ClientHandler>) {
    if let Err(e) = session
        .disconnect(Disconnect::ByApplication, "", "en")
        .await
    {
        tracing::trace!("Disconnect: {}", e);
    }
}

fn channel_error(e: russh::Error) -> TransportError {
    TransportError::Channel(e.to_string())
}

fn sftp_error(e: SftpError) -> TransportError {
    TransportError::Sftp(e.to_string())
}

/// Create `dir`, tolerating one that is already there
async fn ensure_dir(sftp: &SftpSession, dir: &str, host: &str) {
    match sftp.create_dir(dir).await {
        Ok(()) => tracing::debug!("Created {} on {}", dir, host),
        Err(e) if is_generic_failure(&e) => {
            tracing::trace!("{} on {} not created, assuming it exists: {}", dir, host, e)
        }
        Err(e) => tracing::warn!("Cannot create {} on {}: {}", dir, host, e),
    }
}

/// SFTP v3 has no "already exists" status; servers answer a mkdir of an
/// existing directory with the generic failure code
fn is_generic_failure(e: &SftpError) -> bool {
    matches!(
        e,
        SftpError::Status(Status {
            status_code: StatusCode::Failure,
            ..
        })
    )
}

/// SSH client handler
struct ClientHandler {
    host: String,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    /// Hosts are addressed by name from the operator's own registry, so any
    /// host key is accepted; the fingerprint is logged for auditing.
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        tracing::debug!(
            "Host key for {}: {}",
            self.host,
            server_public_key.fingerprint()
        );
        Ok(true)
    }
}

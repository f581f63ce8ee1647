//! Remote command transport

mod settle;
mod ssh;

pub use settle::{resolve, CommandSettle, TransportEvent};
pub use ssh::{SshTransport, SSH_PORT};

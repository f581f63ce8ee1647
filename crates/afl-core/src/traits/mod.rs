//! Core trait definitions

mod transport;

pub use transport::{InteractiveInput, InteractiveSession, InteractiveWriter, RemoteTransport};

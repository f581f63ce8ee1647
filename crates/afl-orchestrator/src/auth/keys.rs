//! Private key material shared by every connection

use std::sync::Arc;

use parking_lot::RwLock;
use russh_keys::key::KeyPair;

use afl_core::TransportError;

/// Decoded private key, shared read-only across concurrent calls.
///
/// Each call takes a cheap `Arc` clone of the current key; a reload swaps the
/// key for later calls without touching connections already in flight.
pub struct SharedKey {
    current: RwLock<Arc<KeyPair>>,
}

impl SharedKey {
    /// Decode raw key material (an OpenSSH or PEM private key)
    pub fn from_material(material: &[u8]) -> Result<Self, TransportError> {
        let key = decode_key(material)?;
        Ok(Self {
            current: RwLock::new(Arc::new(key)),
        })
    }

    /// The key to authenticate the next connection with
    pub fn get(&self) -> Arc<KeyPair> {
        Arc::clone(&self.current.read())
    }

    /// Replace the key after the collaborator's key file changed
    pub fn reload(&self, material: &[u8]) -> Result<(), TransportError> {
        let key = decode_key(material)?;
        *self.current.write() = Arc::new(key);
        tracing::info!("Private key reloaded");
        Ok(())
    }
}

fn decode_key(material: &[u8]) -> Result<KeyPair, TransportError> {
    let text = std::str::from_utf8(material)
        .map_err(|_| TransportError::InvalidKey("key material is not UTF-8".to_string()))?;

    let key = russh_keys::decode_secret_key(text, None)
        .map_err(|e| TransportError::InvalidKey(e.to_string()))?;

    if let Ok(public) = key.clone_public_key() {
        tracing::debug!("Loaded private key {}", public.fingerprint());
    }

    Ok(key)
}

//! Encrypted on-device key-value persistence.
//!
//! This module provides:
//! - `SessionVault`: the storage seam the coordinator persists through
//! - `EncryptedVault`: file-backed store sealed with XChaCha20-Poly1305
//! - `VaultKey`: 32-byte device key, held hex-encoded in the OS keychain
//! - `MemoryVault`: ephemeral store for tests and previews

mod encrypted;

use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::Error;

pub use encrypted::{EncryptedVault, VaultKey};

/// Keychain service the device key is registered under.
pub const KEYCHAIN_SERVICE: &str = "session-kit";
/// Keychain entry name for the vault encryption key.
pub const KEYCHAIN_KEY_ENTRY: &str = "auth_store_enc_key";
/// Namespace the encrypted session file lives under.
pub const VAULT_NAMESPACE: &str = "auth-store";

/// Durable string storage keyed by a fixed namespace.
pub trait SessionVault: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// In-memory vault; contents vanish with the process.
#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionVault for MemoryVault {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("vault mutex poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("vault mutex poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Storage("vault mutex poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

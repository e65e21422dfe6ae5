use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use keyring::Entry;
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::debug;

use crate::errors::Error;

use super::{KEYCHAIN_KEY_ENTRY, KEYCHAIN_SERVICE, SessionVault};

/// XChaCha20 nonce width; each write gets a fresh one.
const NONCE_LEN: usize = 24;
const KEY_LEN: usize = 32;

/// 32-byte vault encryption key.
///
/// The production path keeps the key hex-encoded in the OS keychain and
/// generates it on first use, so the vault file is unreadable without the
/// device's keychain entry.
#[derive(Clone)]
pub struct VaultKey([u8; KEY_LEN]);

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        VaultKey(bytes)
    }

    /// Load the key from the keychain, generating and registering one if absent.
    pub fn load_or_create(service: &str, entry_name: &str) -> Result<Self, Error> {
        let entry = Entry::new(service, entry_name)
            .map_err(|err| Error::Storage(format!("keychain entry unavailable: {}", err)))?;
        match entry.get_password() {
            Ok(encoded) => {
                let bytes = hex::decode(&encoded)
                    .map_err(|_| Error::Storage("keychain entry is not hex".to_string()))?;
                let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
                    Error::Storage("keychain entry is not a 32-byte key".to_string())
                })?;
                Ok(VaultKey(bytes))
            }
            Err(keyring::Error::NoEntry) => {
                let mut bytes = [0u8; KEY_LEN];
                OsRng.fill_bytes(&mut bytes);
                entry
                    .set_password(&hex::encode(bytes))
                    .map_err(|err| Error::Storage(format!("keychain write failed: {}", err)))?;
                debug!("vault key generated and registered in keychain");
                Ok(VaultKey(bytes))
            }
            Err(err) => Err(Error::Storage(format!("keychain read failed: {}", err))),
        }
    }

    /// Load or create the key under the crate's default keychain names.
    pub fn from_keychain() -> Result<Self, Error> {
        Self::load_or_create(KEYCHAIN_SERVICE, KEYCHAIN_KEY_ENTRY)
    }
}

/// File-backed vault sealed with XChaCha20-Poly1305.
///
/// The whole key-value map is one sealed blob per namespace:
/// `[24-byte nonce || ciphertext]`, where the plaintext is the JSON map.
pub struct EncryptedVault {
    path: PathBuf,
    key: VaultKey,
    // Serializes read-modify-write cycles on the vault file.
    io: Mutex<()>,
}

impl EncryptedVault {
    pub fn open(dir: &Path, namespace: &str, key: VaultKey) -> Result<Self, Error> {
        std::fs::create_dir_all(dir)?;
        Ok(EncryptedVault {
            path: dir.join(format!("{}.vault", namespace)),
            key,
            io: Mutex::new(()),
        })
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.key.0))
    }

    fn load_map(&self) -> Result<HashMap<String, String>, Error> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let sealed = std::fs::read(&self.path)?;
        if sealed.len() < NONCE_LEN {
            return Err(Error::Storage("vault file truncated".to_string()));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Storage("vault decrypt failed (wrong key or tamper)".to_string()))?;
        let entries = serde_json::from_slice(&plaintext)?;
        Ok(entries)
    }

    fn store_map(&self, entries: &HashMap<String, String>) -> Result<(), Error> {
        let plaintext = serde_json::to_vec(entries)?;
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher()
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| Error::Storage("vault encrypt failed".to_string()))?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        std::fs::write(&self.path, sealed)?;
        Ok(())
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, ()>, Error> {
        self.io
            .lock()
            .map_err(|_| Error::Storage("vault mutex poisoned".to_string()))
    }
}

impl SessionVault for EncryptedVault {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        let _guard = self.locked()?;
        let entries = self.load_map()?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let _guard = self.locked()?;
        let mut entries = self.load_map()?;
        entries.insert(key.to_string(), value.to_string());
        self.store_map(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let _guard = self.locked()?;
        let mut entries = self.load_map()?;
        if entries.remove(key).is_some() {
            self.store_map(&entries)?;
        }
        Ok(())
    }
}

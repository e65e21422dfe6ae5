//! read configuration from a file or the environment

use std::path::PathBuf;
use std::time::Duration;

use crate::errors::Error;

pub(crate) const DEFAULT_STORAGE_KEY: &str = "auth-storage";
pub(crate) const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    /// Base URL of the auth backend (login + refresh endpoints).
    pub auth_base_url: String,
    /// Vault key the persisted session envelope is stored under.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Directory holding the vault file; platform data dir when unset.
    #[serde(default)]
    pub vault_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Config {
    pub fn from_values(
        auth_base_url: &str,
        storage_key: Option<String>,
        vault_dir: Option<PathBuf>,
        request_timeout_secs: Option<u64>,
    ) -> Self {
        Config {
            auth_base_url: auth_base_url.to_string(),
            storage_key: storage_key.unwrap_or_else(default_storage_key),
            vault_dir,
            request_timeout_secs: request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_file(path: &str) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// # ENV Vars
    /// * `SESSION_AUTH_URL` - Base URL of the auth backend
    /// * `SESSION_STORAGE_KEY` - Optional vault key override
    /// * `SESSION_VAULT_DIR` - Optional vault directory override
    /// * `SESSION_REQUEST_TIMEOUT_SECS` - Optional request timeout override
    pub fn from_env() -> Result<Self, Error> {
        let auth_base_url = std::env::var("SESSION_AUTH_URL")
            .map_err(|_| Error::Config("Missing SESSION_AUTH_URL env var".to_string()))?;
        let storage_key = std::env::var("SESSION_STORAGE_KEY").ok();
        let vault_dir = std::env::var("SESSION_VAULT_DIR").ok().map(PathBuf::from);
        let request_timeout_secs = match std::env::var("SESSION_REQUEST_TIMEOUT_SECS").ok() {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "Invalid SESSION_REQUEST_TIMEOUT_SECS value '{}'",
                    raw
                ))
            })?),
            None => None,
        };
        Ok(Self::from_values(
            &auth_base_url,
            storage_key,
            vault_dir,
            request_timeout_secs,
        ))
    }

    /// Resolved vault directory: explicit override or the platform data dir.
    pub fn vault_dir(&self) -> PathBuf {
        if let Some(dir) = &self.vault_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|base| base.join("session-kit"))
            .unwrap_or_else(|| PathBuf::from(".session-kit"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_values_applies_defaults() {
        let config = Config::from_values("https://api.example.com", None, None, None);
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(config.vault_dir.is_none());
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: Config =
            serde_json::from_str(r#"{"auth_base_url": "https://api.example.com"}"#)
                .expect("minimal config should parse");
        assert_eq!(config.auth_base_url, "https://api.example.com");
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn explicit_vault_dir_wins() {
        let config = Config::from_values(
            "https://api.example.com",
            None,
            Some(PathBuf::from("/tmp/vault")),
            None,
        );
        assert_eq!(config.vault_dir(), PathBuf::from("/tmp/vault"));
    }
}

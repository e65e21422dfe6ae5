//! Device-scoped UI preferences, persisted as plain JSON.
//!
//! Preferences carry no credentials and survive logout; only the session
//! envelope lives in the encrypted vault.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::Error;

/// Preference envelope schema version; bump when the shape changes.
const SCHEMA_VERSION: u32 = 0;
const PREFS_FILE: &str = "app-storage.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Id,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Light,
    Dark,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub theme: ColorScheme,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            language: Language::En,
            theme: ColorScheme::System,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PrefsEnvelope {
    state: Preferences,
    version: u32,
    persisted_at: Timestamp,
}

/// File-backed preference store. Unreadable or unknown-version contents
/// fall back to defaults instead of failing the host.
pub struct PreferencesStore {
    path: PathBuf,
    state: Mutex<Preferences>,
}

impl PreferencesStore {
    pub fn open(dir: &Path) -> Result<Self, Error> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(PREFS_FILE);
        let state = load_or_default(&path);
        Ok(PreferencesStore {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn language(&self) -> Language {
        self.lock().language
    }

    pub fn theme(&self) -> ColorScheme {
        self.lock().theme
    }

    pub fn preferences(&self) -> Preferences {
        *self.lock()
    }

    pub fn set_language(&self, language: Language) -> Result<(), Error> {
        let snapshot = {
            let mut state = self.lock();
            state.language = language;
            *state
        };
        self.persist(snapshot)
    }

    pub fn set_theme(&self, theme: ColorScheme) -> Result<(), Error> {
        let snapshot = {
            let mut state = self.lock();
            state.theme = theme;
            *state
        };
        self.persist(snapshot)
    }

    fn persist(&self, state: Preferences) -> Result<(), Error> {
        let envelope = PrefsEnvelope {
            state,
            version: SCHEMA_VERSION,
            persisted_at: Timestamp::now(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Preferences> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn load_or_default(path: &Path) -> Preferences {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Preferences::default(),
        Err(err) => {
            warn!(error = %err, "preferences unreadable; using defaults");
            return Preferences::default();
        }
    };
    match serde_json::from_str::<PrefsEnvelope>(&raw) {
        Ok(envelope) if envelope.version == SCHEMA_VERSION => envelope.state,
        Ok(envelope) => {
            warn!(
                version = envelope.version,
                "unknown preferences version; using defaults"
            );
            Preferences::default()
        }
        Err(err) => {
            warn!(error = %err, "preferences corrupt; using defaults");
            Preferences::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = PathBuf::from("target")
            .join("prefs-tests")
            .join(uuid::Uuid::new_v4().to_string());
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    #[test]
    fn defaults_when_nothing_persisted() {
        let dir = scratch_dir();
        let store = PreferencesStore::open(&dir).expect("open");
        assert_eq!(store.language(), Language::En);
        assert_eq!(store.theme(), ColorScheme::System);
    }

    #[test]
    fn settings_survive_reopen() {
        let dir = scratch_dir();
        {
            let store = PreferencesStore::open(&dir).expect("open");
            store.set_language(Language::Id).expect("set language");
            store.set_theme(ColorScheme::Dark).expect("set theme");
        }

        let reopened = PreferencesStore::open(&dir).expect("reopen");
        assert_eq!(
            reopened.preferences(),
            Preferences {
                language: Language::Id,
                theme: ColorScheme::Dark,
            }
        );
    }

    #[test]
    fn persisted_form_is_lowercase() {
        let dir = scratch_dir();
        let store = PreferencesStore::open(&dir).expect("open");
        store.set_theme(ColorScheme::Light).expect("set theme");

        let raw = std::fs::read_to_string(dir.join(PREFS_FILE)).expect("read persisted file");
        assert!(raw.contains("\"light\""), "unexpected payload: {}", raw);
        assert!(raw.contains("\"en\""), "unexpected payload: {}", raw);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = scratch_dir();
        std::fs::write(dir.join(PREFS_FILE), "not json").expect("write corrupt file");

        let store = PreferencesStore::open(&dir).expect("open");
        assert_eq!(store.preferences(), Preferences::default());
    }

    #[test]
    fn unknown_version_falls_back_to_defaults() {
        let dir = scratch_dir();
        {
            let store = PreferencesStore::open(&dir).expect("open");
            store.set_language(Language::Id).expect("set language");
        }
        let path = dir.join(PREFS_FILE);
        let raw = std::fs::read_to_string(&path)
            .expect("read persisted file")
            .replace("\"version\": 0", "\"version\": 9");
        std::fs::write(&path, raw).expect("rewrite with bumped version");

        let store = PreferencesStore::open(&dir).expect("reopen");
        assert_eq!(store.preferences(), Preferences::default());
    }
}

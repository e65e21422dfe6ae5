use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Persisted envelope schema version; bump when the snapshot shape changes.
const SCHEMA_VERSION: u32 = 0;

/// Authentication lifecycle of the device session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthStatus {
    FirstLogin,
    LoggedIn,
    LoggedOut,
}

/// Access/refresh credential pair as issued by the auth backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: &str, refresh_token: &str) -> Self {
        TokenPair {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
        }
    }
}

/// Profile data carried with the session; persisted and cleared with it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// Serializable snapshot of the session; doubles as the persisted form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: AuthStatus,
    pub token: Option<TokenPair>,
    pub user: Option<UserInfo>,
    pub push_token: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEnvelope {
    state: SessionSnapshot,
    version: u32,
    persisted_at: Timestamp,
}

/// In-memory session owned by the coordinator and mutated only through it.
///
/// The epoch counts session generations: `establish` and `reset` bump it, a
/// token refresh does not. A refresh completion that started under an older
/// epoch must not commit.
#[derive(Clone, Debug)]
pub struct SessionState {
    status: AuthStatus,
    token: Option<TokenPair>,
    user: Option<UserInfo>,
    push_token: Option<String>,
    epoch: u64,
}

impl SessionState {
    pub fn initial() -> Self {
        SessionState {
            status: AuthStatus::LoggedOut,
            token: None,
            user: None,
            push_token: None,
            epoch: 0,
        }
    }

    /// True when nothing of a previous session remains.
    pub fn is_initial(&self) -> bool {
        self.status == AuthStatus::LoggedOut
            && self.token.is_none()
            && self.user.is_none()
            && self.push_token.is_none()
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token.as_ref().map(|pair| pair.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.token.as_ref().map(|pair| pair.refresh_token.as_str())
    }

    pub fn push_token(&self) -> Option<&str> {
        self.push_token.as_deref()
    }

    pub fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    /// `loggedOut → firstLogin | loggedIn`; starts a new epoch. A repeated
    /// login replaces the session the same way.
    pub fn establish(&mut self, token: TokenPair, user: UserInfo, first_login: bool) {
        self.status = if first_login {
            AuthStatus::FirstLogin
        } else {
            AuthStatus::LoggedIn
        };
        self.token = Some(token);
        self.user = Some(user);
        self.epoch += 1;
    }

    /// Replaces the credential pair after a successful refresh; same epoch.
    pub fn set_token(&mut self, token: TokenPair) {
        self.token = Some(token);
    }

    pub fn set_user(&mut self, user: UserInfo) {
        self.user = Some(user);
    }

    pub fn set_push_token(&mut self, token: Option<String>) {
        self.push_token = token;
    }

    /// Back to the initial state; starts a new epoch. Logout and terminal
    /// refresh failure both land here.
    pub fn reset(&mut self) {
        self.status = AuthStatus::LoggedOut;
        self.token = None;
        self.user = None;
        self.push_token = None;
        self.epoch += 1;
    }

    pub fn to_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status,
            token: self.token.clone(),
            user: self.user.clone(),
            push_token: self.push_token.clone(),
        }
    }

    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        SessionState {
            status: snapshot.status,
            token: snapshot.token,
            user: snapshot.user,
            push_token: snapshot.push_token,
            epoch: 0,
        }
    }

    /// Serialize to the versioned vault envelope.
    pub(crate) fn to_envelope_json(&self) -> Result<String, Error> {
        let envelope = PersistedEnvelope {
            state: self.to_snapshot(),
            version: SCHEMA_VERSION,
            persisted_at: Timestamp::now(),
        };
        let json = serde_json::to_string(&envelope)?;
        Ok(json)
    }

    /// Parse a persisted envelope. `None` means "restore as logged out":
    /// malformed payload, unknown version, or an authenticated status with
    /// no credential to act on.
    pub(crate) fn from_envelope_json(raw: &str) -> Option<Self> {
        let envelope: PersistedEnvelope = serde_json::from_str(raw).ok()?;
        if envelope.version != SCHEMA_VERSION {
            return None;
        }
        let snapshot = envelope.state;
        if snapshot.status != AuthStatus::LoggedOut && snapshot.token.is_none() {
            return None;
        }
        Some(SessionState::from_snapshot(snapshot))
    }
}

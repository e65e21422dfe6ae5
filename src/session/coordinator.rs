use std::future::Future;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::FutureExt;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Client, Request, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::AuthApi;
use crate::config::Config;
use crate::errors::Error;
use crate::notify::{NoopNotifications, NotificationHooks};
use crate::telemetry::refresh::{RefreshOutcome, RefreshTelemetry};
use crate::vault::{EncryptedVault, SessionVault, VAULT_NAMESPACE, VaultKey};

use super::gate::{RefreshFailure, RefreshGate};
use super::state::{AuthStatus, SessionSnapshot, SessionState, TokenPair, UserInfo};

/// Exchanges a refresh token for a fresh credential pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error>;
}

struct Inner {
    state: RwLock<SessionState>,
    gate: RefreshGate,
    http: Client,
    refresher: Arc<dyn TokenRefresher>,
    vault: Arc<dyn SessionVault>,
    notifications: Arc<dyn NotificationHooks>,
    storage_key: String,
}

/// Owns the device session: lifecycle transitions, encrypted persistence,
/// and the single-flight refresh that services unauthorized responses.
///
/// Cloning is cheap; every clone drives the same session.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

impl SessionCoordinator {
    /// Build a coordinator over explicit collaborators. The persisted
    /// session, if any, is restored before the first caller sees the state.
    pub fn new(
        http: Client,
        refresher: Arc<dyn TokenRefresher>,
        vault: Arc<dyn SessionVault>,
        notifications: Arc<dyn NotificationHooks>,
        storage_key: &str,
    ) -> Self {
        let state = restore_session(vault.as_ref(), storage_key);
        SessionCoordinator {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                gate: RefreshGate::new(),
                http,
                refresher,
                vault,
                notifications,
                storage_key: storage_key.to_string(),
            }),
        }
    }

    /// Wire the full on-device stack from configuration: HTTP client with
    /// timeout, auth backend, keychain-keyed encrypted vault.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let api = AuthApi::with_client(http.clone(), &config.auth_base_url);
        let key = VaultKey::from_keychain()?;
        let vault = EncryptedVault::open(&config.vault_dir(), VAULT_NAMESPACE, key)?;
        Ok(Self::new(
            http,
            Arc::new(api),
            Arc::new(vault),
            Arc::new(NoopNotifications),
            &config.storage_key,
        ))
    }

    pub fn http_client(&self) -> Client {
        self.inner.http.clone()
    }

    pub async fn status(&self) -> AuthStatus {
        self.inner.state.read().await.status()
    }

    /// True for both first-login and returning sessions.
    pub async fn is_authenticated(&self) -> bool {
        self.status().await != AuthStatus::LoggedOut
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().await.to_snapshot()
    }

    pub async fn access_token(&self) -> Option<String> {
        let state = self.inner.state.read().await;
        state.access_token().map(str::to_string)
    }

    pub async fn user(&self) -> Option<UserInfo> {
        self.inner.state.read().await.user().cloned()
    }

    pub async fn push_token(&self) -> Option<String> {
        let state = self.inner.state.read().await;
        state.push_token().map(str::to_string)
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.inner.gate.in_flight()
    }

    /// Attach the current access token as a bearer header. Requests go out
    /// unmodified when no session exists; a refresh already in flight does
    /// not hold the request back.
    pub async fn attach(&self, request: Request) -> Result<Request, Error> {
        match self.access_token().await {
            Some(token) => attach_bearer(request, &token),
            None => Ok(request),
        }
    }

    /// Execute a request with bearer auth and a single coordinated retry on
    /// 401. The retry clone is taken before dispatch; a non-replayable body
    /// surfaces the original 401 instead of a half-sent retry.
    pub async fn dispatch(&self, request: Request) -> Result<Response, Error> {
        let replay = request.try_clone();
        let request = self.attach(request).await?;
        let response = self.inner.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!(status = %response.status(), "request unauthorized; coordinating refresh");
        let pair = self.on_unauthorized().await?;

        let Some(retry) = replay else {
            warn!("401 retry skipped: request body cannot be replayed");
            return Ok(response);
        };
        let retry = attach_bearer(retry, &pair.access_token)?;
        let retried = self.inner.http.execute(retry).await?;
        if retried.status() == StatusCode::UNAUTHORIZED {
            warn!(status = %retried.status(), "retry still unauthorized; surfacing response unchanged");
        }
        Ok(retried)
    }

    /// Coordinate one refresh for any number of concurrent 401s. The first
    /// caller starts the exchange; everyone else awaits the same outcome.
    pub async fn on_unauthorized(&self) -> Result<TokenPair, Error> {
        let (handle, started) = {
            let inner = Arc::clone(&self.inner);
            self.inner.gate.join_or_start(move || {
                drive_refresh(inner, RefreshTelemetry::new("session.refresh")).boxed()
            })
        };
        if !started {
            debug!("refresh already in flight; awaiting shared outcome");
        }
        let outcome = handle.clone().await;
        self.inner.gate.settle(&handle);
        outcome.map_err(Error::from)
    }

    /// Install a freshly issued session. Re-login over an existing session
    /// replaces it and invalidates any refresh still in flight.
    pub async fn login(
        &self,
        token: TokenPair,
        user: UserInfo,
        first_login: bool,
    ) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.establish(token, user, first_login);
        persist(&self.inner, &state)?;
        info!(status = ?state.status(), "session established");
        Ok(())
    }

    pub async fn set_user(&self, user: UserInfo) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.set_user(user);
        persist(&self.inner, &state)
    }

    pub async fn set_push_token(&self, token: Option<String>) -> Result<(), Error> {
        let mut state = self.inner.state.write().await;
        state.set_push_token(token);
        persist(&self.inner, &state)
    }

    /// Clear the session. Infallible: state flips to logged out first, then
    /// vault removal and notification cleanup run best-effort. An in-flight
    /// refresh is detached, not cancelled; its waiters see it superseded.
    pub async fn logout(&self) {
        let had_push = {
            let mut state = self.inner.state.write().await;
            let had_push = state.push_token().is_some();
            state.reset();
            had_push
        };
        self.inner.gate.clear();
        info!("session cleared: status='loggedOut'");
        if let Err(err) = self.inner.vault.remove(&self.inner.storage_key) {
            warn!(error = %err, "persisted session not removed; vault entry may linger");
        }
        run_logout_cleanup(self.inner.notifications.as_ref(), had_push).await;
    }
}

/// Run one refresh exchange against the collaborator and commit the result.
/// The epoch read up front pins the session generation: logout or re-login
/// in the meantime wins, and the stale outcome is dropped.
async fn drive_refresh(
    inner: Arc<Inner>,
    telemetry: RefreshTelemetry,
) -> Result<TokenPair, RefreshFailure> {
    let (refresh_token, epoch) = {
        let state = inner.state.read().await;
        (state.refresh_token().map(str::to_string), state.epoch())
    };
    let Some(refresh_token) = refresh_token else {
        warn!("refresh requested without a refresh token; clearing session");
        clear_session(&inner, epoch).await;
        return Err(RefreshFailure::Unauthenticated);
    };

    telemetry.emit_start(SystemTime::now());
    match inner.refresher.refresh(&refresh_token).await {
        Ok(pair) => {
            let mut state = inner.state.write().await;
            if state.epoch() != epoch {
                telemetry.emit_superseded(SystemTime::now());
                return Err(RefreshFailure::Superseded);
            }
            state.set_token(pair.clone());
            if let Err(err) = persist(&inner, &state) {
                warn!(error = %err, "refreshed token not persisted; in-memory state stays canonical");
            }
            telemetry.emit_success(RefreshOutcome::Success, SystemTime::now());
            Ok(pair)
        }
        Err(err) => {
            telemetry.emit_failure(&err, SystemTime::now());
            clear_session(&inner, epoch).await;
            let reason = match err {
                Error::RefreshFailed(reason) => reason,
                other => other.to_string(),
            };
            Err(RefreshFailure::Rejected(reason))
        }
    }
}

/// Terminal-failure cleanup, gated on the epoch so a refresh that lost a
/// race with logout or re-login cannot tear down the replacement session.
async fn clear_session(inner: &Arc<Inner>, expected_epoch: u64) {
    let had_push = {
        let mut state = inner.state.write().await;
        if state.epoch() != expected_epoch || state.is_initial() {
            return;
        }
        let had_push = state.push_token().is_some();
        state.reset();
        had_push
    };
    info!("session cleared after refresh failure: status='loggedOut'");
    if let Err(err) = inner.vault.remove(&inner.storage_key) {
        warn!(error = %err, "persisted session not removed; vault entry may linger");
    }
    run_logout_cleanup(inner.notifications.as_ref(), had_push).await;
}

async fn run_logout_cleanup(hooks: &dyn NotificationHooks, had_push: bool) {
    best_effort("clear_badge", hooks.clear_badge()).await;
    if had_push {
        best_effort("cancel_scheduled", hooks.cancel_scheduled()).await;
        best_effort("unregister_push", hooks.unregister_push()).await;
    }
}

async fn best_effort<F>(step: &str, cleanup: F)
where
    F: Future<Output = Result<(), Error>>,
{
    match cleanup.await {
        Ok(()) => debug!(step, "logout.cleanup"),
        Err(err) => warn!(step, error = %err, "logout.cleanup failed; ignored"),
    }
}

fn restore_session(vault: &dyn SessionVault, storage_key: &str) -> SessionState {
    match vault.get(storage_key) {
        Ok(Some(raw)) => match SessionState::from_envelope_json(&raw) {
            Some(state) => state,
            None => {
                warn!("persisted session unreadable; starting logged out");
                SessionState::initial()
            }
        },
        Ok(None) => SessionState::initial(),
        Err(err) => {
            warn!(error = %err, "vault read failed; starting logged out");
            SessionState::initial()
        }
    }
}

fn persist(inner: &Inner, state: &SessionState) -> Result<(), Error> {
    let envelope = state.to_envelope_json()?;
    inner.vault.set(&inner.storage_key, &envelope)
}

fn attach_bearer(mut request: Request, access_token: &str) -> Result<Request, Error> {
    let value = HeaderValue::from_str(&format!("Bearer {}", access_token))
        .map_err(|_| Error::Config("access token is not a valid header value".to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, value);
    Ok(request)
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::errors::Error;
use crate::session::{TokenPair, TokenRefresher};

/// Credential payload returned by the login and token-grant endpoints.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<LoginResponse> for TokenPair {
    fn from(response: LoginResponse) -> Self {
        TokenPair {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
        }
    }
}

/// HTTP surface of the auth backend: credential login plus the
/// refresh-token grant.
#[derive(Clone)]
pub struct AuthApi {
    http: Client,
    base_url: String,
}

impl AuthApi {
    pub fn new(config: &Config) -> Self {
        Self::with_client(Client::new(), &config.auth_base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Self {
        AuthApi {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Exchange credentials for a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, Error> {
        let url = format!("{}/auth/login", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!(
                "username={}&password={}",
                urlencoding::encode(username),
                urlencoding::encode(password)
            ))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("login failed: status={} body='{}'", status, body);
            return Err(Error::Api(status, body));
        }
        let payload: LoginResponse = resp.json().await?;
        info!("login ok: user='{}'", username);
        Ok(payload)
    }

    /// Run the refresh-token grant against the token endpoint.
    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<LoginResponse, Error> {
        let url = format!("{}/oauth/token", self.base_url);
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(format!(
                "grant_type=refresh_token&refresh_token={}",
                urlencoding::encode(refresh_token)
            ))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("refresh grant failed: status={} body='{}'", status, body);
            return Err(Error::Api(status, body));
        }
        let payload: LoginResponse = resp.json().await?;
        debug!(
            "refresh grant ok (access len={})",
            payload.access_token.len()
        );
        Ok(payload)
    }
}

#[async_trait]
impl TokenRefresher for AuthApi {
    /// Any rejection from the token endpoint is terminal for the session.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, Error> {
        match self.refresh_grant(refresh_token).await {
            Ok(payload) => Ok(payload.into()),
            Err(Error::Api(status, body)) => Err(Error::RefreshFailed(format!(
                "status={} body='{}'",
                status, body
            ))),
            Err(err) => Err(err),
        }
    }
}

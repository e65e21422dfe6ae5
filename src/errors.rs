use std::fmt;

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    /// No credential is present for an operation that requires one.
    Unauthenticated,
    /// The refresh collaborator rejected or errored; terminal for the session.
    RefreshFailed(String),
    /// Network-level failure, surfaced unchanged.
    Transport(reqwest::Error),
    /// Structured non-auth HTTP failure: status plus response body.
    Api(StatusCode, String),
    /// Vault or keychain failure.
    Storage(String),
    Json(serde_json::Error),
    Io(std::io::Error),
    Config(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unauthenticated => write!(f, "no credential available"),
            Error::RefreshFailed(reason) => write!(f, "token refresh failed: {}", reason),
            Error::Transport(err) => write!(f, "transport error: {}", err),
            Error::Api(status, body) => write!(f, "api error: status={} body='{}'", status, body),
            Error::Storage(reason) => write!(f, "storage error: {}", reason),
            Error::Json(err) => write!(f, "json error: {}", err),
            Error::Io(err) => write!(f, "io error: {}", err),
            Error::Config(reason) => write!(f, "config error: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err)
    }
}

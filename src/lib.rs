pub mod api;
pub mod config;
pub mod errors;
pub mod notify;
pub mod prefs;
pub mod session;
pub mod telemetry;
pub mod vault;

pub use config::Config;
pub use errors::Error;
pub use session::{
    AuthStatus, SessionCoordinator, SessionSnapshot, TokenPair, TokenRefresher, UserInfo,
};

#[cfg(test)]
mod tests;

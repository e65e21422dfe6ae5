mod auth;

pub use auth::{AuthApi, LoginResponse};

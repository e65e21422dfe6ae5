pub(crate) mod refresh_401_failure;
pub(crate) mod token_grant;

use crate::api::AuthApi;
use crate::config::Config;

use super::*;

#[ignore]
#[tokio::test]
async fn it_works() {
    let config = Config::from_env().expect("Failed to read config");
    let coordinator =
        SessionCoordinator::from_config(&config).expect("Failed to build coordinator");

    let api = AuthApi::new(&config);
    let issued = api
        .login(
            &std::env::var("SESSION_USERNAME").expect("SESSION_USERNAME not set"),
            &std::env::var("SESSION_PASSWORD").expect("SESSION_PASSWORD not set"),
        )
        .await
        .expect("Failed to log in");
    coordinator
        .login(issued.into(), test_support::sample_user(), true)
        .await
        .expect("Failed to establish session");

    let request = coordinator
        .http_client()
        .get(format!("{}/auth/me", config.auth_base_url))
        .build()
        .expect("Failed to build request");
    let response = coordinator
        .dispatch(request)
        .await
        .expect("Failed to dispatch request");
    assert!(response.status().is_success());

    coordinator.logout().await;
    assert_eq!(coordinator.status().await, AuthStatus::LoggedOut);
}

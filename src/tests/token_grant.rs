use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::api::AuthApi;
use crate::errors::Error;
use crate::session::TokenRefresher;

#[tokio::test]
async fn grant_posts_a_url_encoded_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("Content-Type", "application/x-www-form-urlencoded"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "A2",
            "refresh_token": "R2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = AuthApi::with_client(reqwest::Client::new(), &server.uri());
    let issued = api.refresh_grant("R 1/è").await.expect("grant");
    assert_eq!(issued.access_token, "A2");

    let requests = server
        .received_requests()
        .await
        .expect("request recording enabled");
    let body = String::from_utf8_lossy(&requests[0].body).into_owned();
    assert_eq!(body, "grant_type=refresh_token&refresh_token=R%201%2F%C3%A8");
}

#[tokio::test]
async fn rejected_grant_maps_to_refresh_failed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;

    let api = AuthApi::with_client(reqwest::Client::new(), &server.uri());
    match api.refresh("R1").await {
        Err(Error::RefreshFailed(msg)) => {
            assert!(msg.contains("400"), "unexpected reason: {}", msg);
            assert!(msg.contains("invalid_grant"), "unexpected reason: {}", msg);
        }
        Err(other) => panic!("expected Error::RefreshFailed, got {}", other),
        Ok(_) => panic!("expected Error::RefreshFailed, got Ok"),
    }
}

#[tokio::test]
async fn login_posts_encoded_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_string_contains("username=ada%40example.com"))
        .and(body_string_contains("password=p%26w"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "A1",
            "refresh_token": "R1",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = AuthApi::with_client(reqwest::Client::new(), &server.uri());
    let issued = api.login("ada@example.com", "p&w").await.expect("login");
    assert_eq!(issued.refresh_token, "R1");
}

#[tokio::test]
async fn rejected_login_carries_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("locked out"))
        .expect(1)
        .mount(&server)
        .await;

    let api = AuthApi::with_client(reqwest::Client::new(), &server.uri());
    match api.login("ada", "pw").await {
        Err(Error::Api(status, body)) => {
            assert_eq!(status, 403);
            assert_eq!(body, "locked out");
        }
        Err(other) => panic!("expected Error::Api, got {}", other),
        Ok(_) => panic!("expected Error::Api, got Ok"),
    }
}

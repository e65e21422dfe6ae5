use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::errors::Error;
use crate::session::{AuthStatus, TokenPair};
use crate::tests::test_support::{capture_logs, drain_logs, logged_in_coordinator};

#[tokio::test]
async fn double_401_surfaces_the_response_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "A2",
            "refresh_token": "R2",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (lines, guard) = capture_logs();
    let coordinator = logged_in_coordinator(&server.uri(), TokenPair::new("A1", "R1")).await;

    let request = coordinator
        .http_client()
        .get(format!("{}/data", server.uri()))
        .build()
        .expect("build request");
    let response = coordinator
        .dispatch(request)
        .await
        .expect("double 401 is a response, not an error");
    drop(guard);

    assert_eq!(response.status(), 401);
    // The refreshed pair is kept even though the resource still rejects it.
    assert_eq!(
        coordinator.snapshot().await.token,
        Some(TokenPair::new("A2", "R2"))
    );

    let logs = drain_logs(lines);
    let warn_count = logs
        .iter()
        .filter(|line| line.contains("WARN") && line.contains("401"))
        .count();
    assert_eq!(
        warn_count, 2,
        "should log a warning for each 401, got {:?}",
        logs
    );
}

#[tokio::test]
async fn rejected_refresh_clears_the_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = logged_in_coordinator(&server.uri(), TokenPair::new("A1", "R1")).await;

    let request = coordinator
        .http_client()
        .get(format!("{}/data", server.uri()))
        .build()
        .expect("build request");
    let res = coordinator.dispatch(request).await;

    match res {
        Err(Error::RefreshFailed(msg)) => {
            assert!(msg.contains("invalid_grant"), "unexpected reason: {}", msg);
        }
        Err(other) => panic!("expected Error::RefreshFailed, got {}", other),
        Ok(resp) => panic!("expected Error::RefreshFailed, got status {}", resp.status()),
    }

    assert_eq!(coordinator.status().await, AuthStatus::LoggedOut);
    let snapshot = coordinator.snapshot().await;
    assert!(snapshot.token.is_none());
    assert!(snapshot.user.is_none());
}

use session_kit::api::AuthApi;
use session_kit::{Config, SessionCoordinator, UserInfo};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Optional: enable basic logging for the demo
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    // Load configuration from a JSON file placed next to the binary
    let cfg = Config::from_file("config.json")?;
    let coordinator = SessionCoordinator::from_config(&cfg)?;

    // A persisted session is restored automatically; log in only when
    // nothing usable survived the last run.
    if !coordinator.is_authenticated().await {
        let api = AuthApi::new(&cfg);
        let issued = api.login("demo@example.com", "hunter2").await?;
        let user = UserInfo {
            id: "demo".to_string(),
            name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
        };
        coordinator.login(issued.into(), user, true).await?;
    }

    // Bearer auth and the coordinated 401 retry both happen in dispatch.
    let request = coordinator
        .http_client()
        .get(format!("{}/auth/me", cfg.auth_base_url))
        .build()?;
    let response = coordinator.dispatch(request).await?;
    println!("profile fetch: {}", response.status());

    coordinator.logout().await;
    Ok(())
}

use std::net::TcpListener;
use std::sync::Arc;

use tenant_auth::auth::{InMemoryBlacklist, TokenCodec, TokenIssuer};
use tenant_auth::configuration::JwtSettings;
use tenant_auth::startup::run;
use tenant_auth::users::InMemoryUserStore;

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let jwt = JwtSettings {
        access_secret: "health-check-access-secret-32-bytes!".to_string(),
        refresh_secret: "health-check-refresh-secret-32-bytes!".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "tenant-auth-test".to_string(),
    };
    let issuer = TokenIssuer::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryBlacklist::new()),
        TokenCodec::new(&jwt),
    );
    let server = run(listener, issuer).expect("Failed to create server");

    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works_without_a_token() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .header("x-request-id", "trace-abc")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "trace-abc"
    );
}

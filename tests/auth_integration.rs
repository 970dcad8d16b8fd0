use reqwest::StatusCode;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;

use tenant_auth::auth::{InMemoryBlacklist, TokenCodec, TokenIssuer};
use tenant_auth::configuration::JwtSettings;
use tenant_auth::startup::run;
use tenant_auth::users::{InMemoryUserStore, NewUser, Role, UserStore};

const EMAIL: &str = "john@example.com";
const PASSWORD: &str = "SecurePass123";

pub struct TestApp {
    pub address: String,
    pub users: Arc<InMemoryUserStore>,
    pub client: reqwest::Client,
}

fn jwt_settings() -> JwtSettings {
    JwtSettings {
        access_secret: "integration-access-secret-32-bytes-min".to_string(),
        refresh_secret: "integration-refresh-secret-32-bytes-min".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        issuer: "tenant-auth-test".to_string(),
    }
}

async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let users = Arc::new(InMemoryUserStore::new());
    let user = NewUser {
        email: EMAIL.to_string(),
        full_name: "John Doe".to_string(),
        password: PASSWORD.to_string(),
        role: Some(Role::Admin),
    }
    .into_record()
    .expect("Failed to hash password");
    users.create(user).await.expect("Failed to seed user");

    let issuer = TokenIssuer::new(
        users.clone(),
        Arc::new(InMemoryBlacklist::new()),
        TokenCodec::new(&jwt_settings()),
    );
    let server = run(listener, issuer).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        users,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    async fn post_json(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post_json("/auth/login", &json!({ "email": email, "password": password }))
            .await
    }

    async fn login_ok(&self) -> Value {
        let response = self.login(EMAIL, PASSWORD).await;
        assert_eq!(StatusCode::OK, response.status());
        response.json().await.expect("Failed to parse response")
    }

    async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post_json("/auth/refresh", &json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn me(&self, access_token: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}/auth/me", self.address))
            .bearer_auth(access_token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

// --- Login ---

#[tokio::test]
async fn login_returns_200_and_a_bearer_pair() {
    let app = spawn_app().await;
    let body = app.login_ok().await;

    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 900);
}

#[tokio::test]
async fn login_accepts_differently_cased_email() {
    let app = spawn_app().await;
    let response = app.login("  John@Example.com ", PASSWORD).await;
    assert_eq!(StatusCode::OK, response.status());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app().await;

    let wrong_password = app.login(EMAIL, "wrongpass").await;
    let unknown_user = app.login("nosuchuser@example.com", "anything").await;

    assert_eq!(StatusCode::UNAUTHORIZED, wrong_password.status());
    assert_eq!(StatusCode::UNAUTHORIZED, unknown_user.status());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_user.json().await.unwrap();
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn login_returns_400_for_malformed_payloads() {
    let app = spawn_app().await;
    let test_cases = vec![
        (json!({ "email": "notanemail", "password": PASSWORD }), "invalid email"),
        (json!({ "email": EMAIL, "password": "" }), "empty password"),
        (json!({ "email": EMAIL }), "missing password"),
        (json!({ "password": PASSWORD }), "missing email"),
    ];

    for (body, reason) in test_cases {
        let response = app.post_json("/auth/login", &body).await;
        assert_eq!(
            StatusCode::BAD_REQUEST,
            response.status(),
            "Should reject payload with {}",
            reason
        );
    }
}

// --- Protected routes ---

#[tokio::test]
async fn me_returns_identity_from_access_token() {
    let app = spawn_app().await;
    let tokens = app.login_ok().await;

    let response = app.me(tokens["access_token"].as_str().unwrap()).await;
    assert_eq!(StatusCode::OK, response.status());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], EMAIL);
    assert_eq!(body["full_name"], "John Doe");
    assert_eq!(body["role"], "ADMIN");
}

#[tokio::test]
async fn protected_routes_require_a_valid_access_token() {
    let app = spawn_app().await;
    let tokens = app.login_ok().await;

    let no_header = app
        .client
        .get(&format!("{}/auth/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, no_header.status());

    let garbage = app.me("not.a.token").await;
    assert_eq!(StatusCode::UNAUTHORIZED, garbage.status());

    // A refresh token is not an access token
    let wrong_class = app.me(tokens["refresh_token"].as_str().unwrap()).await;
    assert_eq!(StatusCode::UNAUTHORIZED, wrong_class.status());

    let basic = app
        .client
        .get(&format!("{}/auth/me", app.address))
        .header("Authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, basic.status());
}

#[tokio::test]
async fn undeclared_routes_are_not_public() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(&format!("{}/admin", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, response.status());
}

// --- Refresh ---

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = spawn_app().await;
    let tokens = app.login_ok().await;
    let old_refresh = tokens["refresh_token"].as_str().unwrap();

    let first = app.refresh(old_refresh).await;
    assert_eq!(StatusCode::OK, first.status());
    let rotated: Value = first.json().await.unwrap();
    assert_ne!(rotated["refresh_token"].as_str().unwrap(), old_refresh);

    let replay = app.refresh(old_refresh).await;
    assert_eq!(StatusCode::UNAUTHORIZED, replay.status());

    let next = app.refresh(rotated["refresh_token"].as_str().unwrap()).await;
    assert_eq!(StatusCode::OK, next.status());
}

#[tokio::test]
async fn refresh_rejects_access_token() {
    let app = spawn_app().await;
    let tokens = app.login_ok().await;

    let response = app.refresh(tokens["access_token"].as_str().unwrap()).await;
    assert_eq!(StatusCode::UNAUTHORIZED, response.status());
}

#[tokio::test]
async fn refresh_rejects_token_of_deleted_user() {
    let app = spawn_app().await;
    let tokens = app.login_ok().await;

    let user = app.users.find_by_email(EMAIL).await.unwrap().unwrap();
    app.users.delete(user.id).await.unwrap();

    let response = app.refresh(tokens["refresh_token"].as_str().unwrap()).await;
    assert_eq!(StatusCode::UNAUTHORIZED, response.status());
}

#[tokio::test]
async fn refresh_rejects_malformed_token_as_unauthorized() {
    let app = spawn_app().await;

    // A body without the field never reaches the token checks
    let missing = app.post_json("/auth/refresh", &json!({})).await;
    assert_eq!(StatusCode::BAD_REQUEST, missing.status());

    for token in ["definitely-not-a-jwt", "", "a.b.c"] {
        let response = app.refresh(token).await;
        assert_eq!(StatusCode::UNAUTHORIZED, response.status(), "token {:?}", token);

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "UNAUTHORIZED");
        assert_eq!(body["message"], "Invalid credentials");
    }
}

// --- Logout ---

#[tokio::test]
async fn logout_revokes_access_and_refresh_tokens() {
    let app = spawn_app().await;
    let tokens = app.login_ok().await;
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let response = app
        .client
        .post(&format!("{}/auth/logout", app.address))
        .bearer_auth(access)
        .json(&json!({ "refresh_token": refresh }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, response.status());

    assert_eq!(StatusCode::UNAUTHORIZED, app.me(access).await.status());
    assert_eq!(StatusCode::UNAUTHORIZED, app.refresh(refresh).await.status());
}

#[tokio::test]
async fn logout_without_body_revokes_access_token_only() {
    let app = spawn_app().await;
    let tokens = app.login_ok().await;
    let access = tokens["access_token"].as_str().unwrap();

    let response = app
        .client
        .post(&format!("{}/auth/logout", app.address))
        .bearer_auth(access)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, response.status());

    assert_eq!(StatusCode::UNAUTHORIZED, app.me(access).await.status());
    let refreshed = app.refresh(tokens["refresh_token"].as_str().unwrap()).await;
    assert_eq!(StatusCode::OK, refreshed.status());
}

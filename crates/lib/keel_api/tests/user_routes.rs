//! Integration tests — build the router against a real PostgreSQL database
//! and drive the user routes with `tower::ServiceExt::oneshot`.
//!
//! Tests touching the database are `#[ignore]`d so the suite passes without
//! a local PostgreSQL; run them with
//! `DATABASE_URL=postgres://localhost:5432/keel_test cargo test -- --ignored`.
//! Flows that dispatch email (register with a fresh address, the password
//! flows) are exercised at the unit level instead, since they need an SMTP
//! endpoint.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;
use uuid::Uuid;

use keel_api::config::ApiConfig;
use keel_api::middleware::auth::{CurrentUser, require_admin};
use keel_api::services::media::MediaStore;
use keel_api::{AppState, router};
use keel_core::auth::tokens::{self, TokenKeys};
use keel_core::auth::{password, queries};
use keel_core::email::{Mailer, MailerConfig};
use keel_core::models::user::{PublicUser, Role, User};

fn test_keys() -> TokenKeys {
    TokenKeys::new(
        "access-secret",
        "refresh-secret",
        "register-secret",
        "new-email-secret",
        "change-password-secret",
        "reset-password-secret",
    )
}

async fn test_state() -> AppState {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost:5432/keel_test".into());
    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .expect("connect to PostgreSQL");
    keel_api::migrate(&pool).await.expect("migrate");

    let mailer = Mailer::new(MailerConfig {
        smtp_host: "localhost".into(),
        smtp_port: 2525,
        smtp_user: "keel@example.com".into(),
        smtp_password: String::new(),
        client_url: "http://localhost:3000".into(),
        app_name: "Keel".into(),
    })
    .expect("mailer");

    AppState {
        pool,
        config: ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            database_url,
            client_url: "http://localhost:3000".into(),
            production: false,
            keys: test_keys(),
            media_api_url: "http://localhost:9000".into(),
            media_api_key: String::new(),
        },
        mailer,
        media: MediaStore::new("http://localhost:9000", ""),
    }
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

/// Collect the Set-Cookie headers into a Cookie header value.
fn cookies_from(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| {
            let full = v.to_str().expect("cookie header");
            full.split(';').next().unwrap().to_string()
        })
        .collect()
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4())
}

async fn seed_password_user(state: &AppState, email: &str, pass: &str) -> User {
    let hash = password::hash_password(pass).expect("hash");
    queries::create_user(&state.pool, "Test User", email, &hash)
        .await
        .expect("create user")
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn health_and_unknown_routes() {
    let app = router(test_state().await);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["message"], "Server is running");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/non-existent-route")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn register_with_taken_email_conflicts() {
    let state = test_state().await;
    let email = unique_email("taken");
    seed_password_user(&state, &email, "Passw0rd!").await;

    let response = router(state)
        .oneshot(post_json(
            "/api/user/register",
            serde_json::json!({"name": "Alice", "email": email, "password": "Passw0rd!"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = response_json(response).await;
    assert_eq!(json["type"], "CONFLICT_ERROR");
    assert_eq!(json["message"], "Email already exists");
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn register_rejects_weak_passwords() {
    let app = router(test_state().await);

    let response = app
        .oneshot(post_json(
            "/api/user/register",
            serde_json::json!({"name": "Alice", "email": unique_email("weak"), "password": "weak"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["type"], "VALIDATION_ERROR");
    assert_eq!(json["errors"][0]["path"], "password");
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn login_failures_are_indistinguishable() {
    let state = test_state().await;
    let email = unique_email("login");
    seed_password_user(&state, &email, "Passw0rd!").await;
    let app = router(state);

    let wrong_password = app
        .clone()
        .oneshot(post_json(
            "/api/user/login",
            serde_json::json!({"email": email, "password": "Wrong0ne!"}),
        ))
        .await
        .unwrap();
    let unknown_email = app
        .oneshot(post_json(
            "/api/user/login",
            serde_json::json!({"email": unique_email("ghost"), "password": "Passw0rd!"}),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
    let a = response_json(wrong_password).await;
    let b = response_json(unknown_email).await;
    assert_eq!(a["message"], b["message"]);
    assert_eq!(a["message"], "Username or password incorrect");
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn login_succeeds_for_unverified_accounts() {
    // There is no is_active gate at login; an account that never redeemed
    // its activation token still logs in with correct credentials.
    let state = test_state().await;
    let email = unique_email("unverified");
    seed_password_user(&state, &email, "Passw0rd!").await;

    let response = router(state)
        .oneshot(post_json(
            "/api/user/login",
            serde_json::json!({"email": email, "password": "Passw0rd!"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = cookies_from(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));

    let json = response_json(response).await;
    assert_eq!(json["user"]["is_active"], false);
    assert!(json["user"].get("password").is_none());
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn refresh_cookie_alone_rotates_the_session() {
    let state = test_state().await;
    let email = unique_email("refresh");
    let user = seed_password_user(&state, &email, "Passw0rd!").await;
    let keys = state.config.keys.clone();
    let app = router(state);

    // Access path: identity resolves, no cookie mutation.
    let access = tokens::issue_access_token(&keys, &user.id.to_string()).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/me")
                .header(COOKIE, format!("accessToken={access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookies_from(&response).is_empty());

    // Refresh path: both cookies are reissued on the same response.
    let refresh = tokens::issue_refresh_token(&keys, &user.id.to_string()).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user/me")
                .header(COOKIE, format!("refreshToken={refresh}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = cookies_from(&response);
    assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
    assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));
    let json = response_json(response).await;
    assert_eq!(json["user"]["email"], email);

    // No cookies at all: 401.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn verify_email_activates_and_is_purpose_bound() {
    let state = test_state().await;
    let email = unique_email("verify");
    let user = seed_password_user(&state, &email, "Passw0rd!").await;
    assert!(!user.is_active);
    let keys = state.config.keys.clone();
    let app = router(state);

    let token = tokens::issue_register_token(&keys, &user.id.to_string()).unwrap();

    // The same token must not redeem under another purpose.
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/user/verify-new-email",
            serde_json::json!({"token": token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/user/verify-email",
            serde_json::json!({"token": token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["user"]["is_active"], true);

    // Stateless tokens stay redeemable; a second redemption is a no-op.
    let token = tokens::issue_register_token(&keys, &user.id.to_string()).unwrap();
    let response = app
        .oneshot(post_json(
            "/api/user/verify-email",
            serde_json::json!({"token": token}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn google_login_creates_once_then_reuses() {
    let state = test_state().await;
    let email = unique_email("google");
    let app = router(state);

    let first = app
        .clone()
        .oneshot(post_json(
            "/api/user/google-login",
            serde_json::json!({
                "name": "Alice",
                "email": email,
                "picture": "https://lh3.example.com/a.png",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(cookies_from(&first).len(), 2);
    let first = response_json(first).await;
    assert_eq!(first["user"]["is_active"], true);
    assert_eq!(first["user"]["image"]["url"], "https://lh3.example.com/a.png");

    let second = app
        .oneshot(post_json(
            "/api/user/google-login",
            serde_json::json!({
                "name": "Alice",
                "email": email,
                "picture": "https://lh3.example.com/b.png",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = response_json(second).await;
    // Same account, refreshed avatar.
    assert_eq!(second["user"]["id"], first["user"]["id"]);
    assert_eq!(second["user"]["image"]["url"], "https://lh3.example.com/b.png");
}

#[tokio::test]
#[ignore = "requires a local PostgreSQL (DATABASE_URL)"]
async fn delete_account_clears_the_session() {
    let state = test_state().await;
    let email = unique_email("delete");
    let user = seed_password_user(&state, &email, "Passw0rd!").await;
    let keys = state.config.keys.clone();
    let app = router(state);

    let access = tokens::issue_access_token(&keys, &user.id.to_string()).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/user/delete-account")
                .header(COOKIE, format!("accessToken={access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = cookies_from(&response);
    assert!(cleared.iter().any(|c| c == "accessToken="));
    assert!(cleared.iter().any(|c| c == "refreshToken="));

    // The still-valid token now resolves to no user.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user/me")
                .header(COOKIE, format!("accessToken={access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_gate_rejects_ordinary_users() {
    use axum::routing::get;

    let user = PublicUser {
        id: Uuid::new_v4(),
        name: "Alice".into(),
        email: "a@x.com".into(),
        role: Role::User,
        is_active: true,
        image: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    let app = axum::Router::new()
        .route("/admin", get(|| async { "ok" }))
        .layer(axum::middleware::from_fn(require_admin))
        .layer(axum::Extension(CurrentUser(user)));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = response_json(response).await;
    assert_eq!(json["type"], "AUTHORIZATION_ERROR");
}

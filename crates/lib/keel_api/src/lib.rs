//! # keel_api
//!
//! HTTP API library for Keel.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod validation;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;

use keel_core::email::Mailer;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, user};
use crate::services::media::MediaStore;

/// Request body cap — comfortably above the 5 MB profile-image limit.
const MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool.
    pub pool: PgPool,
    /// API configuration.
    pub config: ApiConfig,
    /// Outbound email dispatch.
    pub mailer: Mailer,
    /// External image-hosting client.
    pub media: MediaStore,
}

/// Run embedded database migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    keel_core::migrate::migrate(pool).await
}

async fn not_found(uri: Uri) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "success": false,
            "message": format!("Route: {uri} not found"),
        })),
    )
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);
    let cors = match state.config.client_url.parse::<HeaderValue>() {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => cors,
    };

    // Public routes (no auth required)
    let public = Router::new()
        .route("/test", get(health::health_check))
        .route("/api/user/register", post(auth::register_handler))
        .route("/api/user/resend-token", post(auth::resend_token_handler))
        .route("/api/user/verify-email", post(auth::verify_email_handler))
        .route("/api/user/login", post(auth::login_handler))
        .route("/api/user/google-login", post(auth::google_login_handler))
        .route(
            "/api/user/verify-new-email",
            post(user::verify_new_email_handler),
        )
        .route(
            "/api/user/verify-new-password",
            post(user::verify_new_password_handler),
        )
        .route(
            "/api/user/forgot-password",
            post(user::forgot_password_handler),
        )
        .route(
            "/api/user/reset-password-verify",
            post(user::reset_password_verify_handler),
        );

    // Protected routes (session cookies required)
    let protected = Router::new()
        .route("/api/user/me", get(auth::logged_in_user_handler))
        .route("/api/user/update-user", patch(user::update_user_handler))
        .route(
            "/api/user/update-password",
            post(user::update_password_handler),
        )
        .route("/api/user/logout", delete(auth::logout_handler))
        .route(
            "/api/user/delete-account",
            delete(user::delete_account_handler),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate_user,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

//! API server configuration.

use keel_core::auth::tokens::TokenKeys;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:3000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Origin of the web client (CORS allow-origin, email links).
    pub client_url: String,
    /// Production hardening: strict cookies, masked internal errors.
    pub production: bool,
    /// Per-purpose token signing secrets.
    pub keys: TokenKeys,
    /// Base URL of the external media store.
    pub media_api_url: String,
    /// API key for the external media store.
    pub media_api_key: String,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable        | Default                            |
    /// |-----------------|------------------------------------|
    /// | `BIND_ADDR`     | `0.0.0.0:3000`                     |
    /// | `DATABASE_URL`  | `postgres://localhost:5432/keel`   |
    /// | `CLIENT_URL`    | `http://localhost:3000`            |
    /// | `APP_ENV`       | anything but `production` is dev   |
    /// | `*_TOKEN_SECRET`| generated & persisted per purpose  |
    /// | `MEDIA_API_URL` | `http://localhost:9000`            |
    /// | `MEDIA_API_KEY` | (empty)                            |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/keel".into()),
            client_url: std::env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            production: std::env::var("APP_ENV").is_ok_and(|v| v == "production"),
            keys: TokenKeys::from_env(),
            media_api_url: std::env::var("MEDIA_API_URL")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            media_api_key: std::env::var("MEDIA_API_KEY").unwrap_or_default(),
        }
    }
}

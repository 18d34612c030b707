//! Liveness probe.

use axum::Json;

/// `GET /test` — cheap liveness check.
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Server is running" }))
}

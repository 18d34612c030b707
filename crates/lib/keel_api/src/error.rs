//! Application error taxonomy and the JSON error envelope.
//!
//! Every domain failure maps to `{success: false, message, type}`;
//! validation failures additionally carry a field-level `errors` list.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use keel_core::auth::AuthError;
use keel_core::email::EmailError;

use crate::services::media::MediaError;

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

/// One entry of a validation `errors` list.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    r#type: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message, errors) = match self {
            ApiError::Validation { message, errors } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, errors)
            }
            ApiError::Authentication(m) => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_ERROR", m, vec![])
            }
            ApiError::Authorization(m) => {
                (StatusCode::FORBIDDEN, "AUTHORIZATION_ERROR", m, vec![])
            }
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND_ERROR", m, vec![]),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, "CONFLICT_ERROR", m, vec![]),
            ApiError::Internal(m) => {
                error!("internal error: {m}");
                // Raw cause is exposed only outside production.
                let message = if in_production() {
                    "Something went wrong".to_string()
                } else {
                    m
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERVER_ERROR",
                    message,
                    vec![],
                )
            }
        };
        let body = Json(ErrorBody {
            success: false,
            message,
            r#type: kind,
            errors,
        });
        (status, body).into_response()
    }
}

fn in_production() -> bool {
    std::env::var("APP_ENV").is_ok_and(|v| v == "production")
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::TokenInvalid => ApiError::Authentication("Invalid token".into()),
            AuthError::TokenExpired => ApiError::Authentication("Token expired".into()),
            AuthError::TokenEncode(msg) => ApiError::Internal(msg),
            AuthError::Db(e) => ApiError::from(e),
            AuthError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => ApiError::NotFound("row not found".into()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                ApiError::Conflict("Email already exists".into())
            }
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(e: EmailError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = read_body(response);
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn read_body(response: Response) -> Vec<u8> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(async {
                axum::body::to_bytes(response.into_body(), usize::MAX)
                    .await
                    .unwrap()
                    .to_vec()
            })
    }

    #[test]
    fn statuses_and_type_tags_match_the_taxonomy() {
        let (status, json) = body_json(ApiError::Authentication("Unauthorized".into()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["type"], "AUTHENTICATION_ERROR");
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Unauthorized");

        let (status, json) = body_json(ApiError::Conflict("Email already exists".into()));
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["type"], "CONFLICT_ERROR");

        let (status, json) = body_json(ApiError::NotFound("User not found".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["type"], "NOT_FOUND_ERROR");

        let (status, json) = body_json(ApiError::Authorization("You are not authorized".into()));
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["type"], "AUTHORIZATION_ERROR");
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let err = ApiError::Validation {
            message: "Validation failed".into(),
            errors: vec![FieldError {
                path: "email".into(),
                message: "Invalid email format".into(),
            }],
        };
        let (status, json) = body_json(err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["errors"][0]["path"], "email");
    }

    #[test]
    fn token_failures_map_to_401() {
        let (status, json) = body_json(ApiError::from(AuthError::TokenExpired));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Token expired");

        let (status, json) = body_json(ApiError::from(AuthError::TokenInvalid));
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["message"], "Invalid token");
    }
}

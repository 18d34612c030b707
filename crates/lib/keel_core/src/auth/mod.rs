//! Authentication and credential-lifecycle logic.
//!
//! Provides password hashing, purpose-scoped token minting/verification,
//! and the user-store queries shared by the HTTP layer.

pub mod password;
pub mod queries;
pub mod tokens;

use thiserror::Error;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token error: {0}")]
    TokenEncode(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

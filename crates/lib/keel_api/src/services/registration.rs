//! Registration and email-verification flows.
//!
//! Accounts start out inactive (`unverified → active`). The activation token
//! is stateless, so a still-valid older token activates the account just as
//! well as the latest one; activation is idempotent.

use sqlx::PgPool;
use tracing::info;

use keel_core::auth::tokens::{self, TokenKeys, TokenPurpose};
use keel_core::auth::{password, queries};
use keel_core::email::Mailer;
use keel_core::models::user::PublicUser;

use crate::error::{ApiError, ApiResult};

/// Create an inactive account, then send the activation email.
///
/// The row is committed before dispatch; a failed email leaves the account
/// in place and surfaces as a server error (the client retries via
/// resend-token).
pub async fn register(
    pool: &PgPool,
    mailer: &Mailer,
    keys: &TokenKeys,
    name: &str,
    email: &str,
    password: &str,
) -> ApiResult<PublicUser> {
    if queries::email_exists(pool, email).await? {
        return Err(ApiError::Conflict("Email already exists".into()));
    }

    let hashed = password::hash_password(password)?;

    let user = match queries::create_user(pool, name, email, &hashed).await {
        Ok(user) => user,
        // Concurrent registration for the same email: the store's unique
        // constraint decides the winner.
        Err(ref err) if queries::is_unique_violation(err) => {
            return Err(ApiError::Conflict("Email already exists".into()));
        }
        Err(err) => return Err(err.into()),
    };

    let token = tokens::issue_register_token(keys, &user.id.to_string())?;
    mailer
        .send_verification_email(&user.name, &user.email, &token)
        .await?;

    info!(email = %user.email, "user registered, verification email sent");
    Ok(user.into_public())
}

/// Reissue the activation token and resend the email.
///
/// Deliberately does not check `is_active`; resending for an already-active
/// account is a harmless no-op from the state's perspective.
pub async fn resend_verification_token(
    pool: &PgPool,
    mailer: &Mailer,
    keys: &TokenKeys,
    email: &str,
) -> ApiResult<PublicUser> {
    let user = queries::find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let token = tokens::issue_register_token(keys, &user.id.to_string())?;
    mailer
        .send_verification_email(&user.name, &user.email, &token)
        .await?;

    Ok(user.into_public())
}

/// Redeem an activation token, marking the account active.
pub async fn verify_user_email(
    pool: &PgPool,
    keys: &TokenKeys,
    token: &str,
) -> ApiResult<PublicUser> {
    let claims = tokens::verify(keys, token, TokenPurpose::Register)?;

    let user = super::find_claimed_user(pool, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    queries::set_user_active(pool, user.id).await?;

    let user = queries::find_user_by_id(pool, user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    info!(email = %user.email, "email verified");
    Ok(user.into_public())
}

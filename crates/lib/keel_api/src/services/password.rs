//! Password change and reset flows.
//!
//! A password change pre-hashes the replacement and carries the hash inside
//! the confirmation token; nothing is stored until the token is redeemed. A
//! reset works the other way around: the token only names the user, and the
//! replacement arrives at redemption time.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use keel_core::auth::tokens::{self, TokenKeys, TokenPurpose};
use keel_core::auth::{password, queries};
use keel_core::email::Mailer;

use crate::error::{ApiError, ApiResult};

/// Start a password change: verify the current password, then mail a
/// confirmation token embedding the new hash to the account's current
/// address.
pub async fn update_password(
    pool: &PgPool,
    mailer: &Mailer,
    keys: &TokenKeys,
    user_id: Uuid,
    current_password: &str,
    new_password: &str,
) -> ApiResult<()> {
    let user = queries::find_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;

    let hash = user
        .password
        .as_deref()
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;

    if !password::verify_password(current_password, hash)? {
        return Err(ApiError::Authentication("Unauthorized".into()));
    }

    let new_hash = password::hash_password(new_password)?;
    let token = tokens::issue_change_password_token(keys, &user_id.to_string(), &new_hash)?;

    mailer
        .send_change_password_email(&user.name, &user.email, &token)
        .await?;
    Ok(())
}

/// Redeem a change-password token, committing the hash from its payload.
pub async fn verify_new_password(pool: &PgPool, keys: &TokenKeys, token: &str) -> ApiResult<()> {
    let claims = tokens::verify(keys, token, TokenPurpose::ChangePassword)?;

    let user = super::find_claimed_user(pool, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;

    let new_hash = claims
        .new_password
        .ok_or_else(|| ApiError::Authentication("Invalid token".into()))?;

    queries::update_user_password(pool, user.id, &new_hash).await?;
    info!(email = %user.email, "password change confirmed");
    Ok(())
}

/// Start a password reset: mail a reset token to the account's address.
pub async fn forgot_password(
    pool: &PgPool,
    mailer: &Mailer,
    keys: &TokenKeys,
    email: &str,
) -> ApiResult<()> {
    let user = queries::find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;

    let token = tokens::issue_reset_password_token(keys, &user.id.to_string())?;

    mailer
        .send_reset_password_email(&user.name, &user.email, &token)
        .await?;
    Ok(())
}

/// Redeem a reset token with the replacement password supplied now.
pub async fn reset_password_verify(
    pool: &PgPool,
    keys: &TokenKeys,
    token: &str,
    new_password: &str,
) -> ApiResult<()> {
    let claims = tokens::verify(keys, token, TokenPurpose::ResetPassword)?;

    let user = super::find_claimed_user(pool, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;

    let hash = password::hash_password(new_password)?;
    queries::update_user_password(pool, user.id, &hash).await?;
    info!(email = %user.email, "password reset");
    Ok(())
}

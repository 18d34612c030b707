//! Login flows — password and Google OAuth.

use sqlx::PgPool;
use tracing::info;

use keel_core::auth::tokens::{self, TokenKeys};
use keel_core::auth::{password, queries};
use keel_core::models::user::{PublicUser, User};

use crate::error::{ApiError, ApiResult};

/// A freshly minted access/refresh pair.
#[derive(Debug)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

fn issue_session(keys: &TokenKeys, user: &User) -> ApiResult<SessionTokens> {
    let user_id = user.id.to_string();
    Ok(SessionTokens {
        access: tokens::issue_access_token(keys, &user_id)?,
        refresh: tokens::issue_refresh_token(keys, &user_id)?,
    })
}

/// Authenticate with email + password.
///
/// Unknown email and wrong password are deliberately indistinguishable to
/// the caller. Note that `is_active` is not checked here: an unverified
/// account with correct credentials logs in.
pub async fn login(
    pool: &PgPool,
    keys: &TokenKeys,
    email: &str,
    password_input: &str,
) -> ApiResult<(PublicUser, SessionTokens)> {
    let user = queries::find_user_by_email(pool, email)
        .await?
        .ok_or_else(|| ApiError::Authentication("Username or password incorrect".into()))?;

    // OAuth-only accounts have no hash to compare against.
    let hash = user
        .password
        .as_deref()
        .ok_or_else(|| ApiError::Authentication("Username or password incorrect".into()))?;

    if !password::verify_password(password_input, hash)? {
        return Err(ApiError::Authentication("Username or password incorrect".into()));
    }

    let session = issue_session(keys, &user)?;
    Ok((user.into_public(), session))
}

/// Authenticate (or create) an account from a verified Google identity.
///
/// Linking is by email match alone — a pre-existing password account with
/// the same address becomes reachable through Google login as well. New
/// accounts are created already active, with the provider avatar attached.
pub async fn google_login(
    pool: &PgPool,
    keys: &TokenKeys,
    name: &str,
    email: &str,
    picture: &str,
) -> ApiResult<(PublicUser, SessionTokens)> {
    if let Some(mut user) = queries::find_user_by_email(pool, email).await? {
        // Refresh a provider-hosted avatar whose URL moved; never touch an
        // image we host ourselves.
        if let Some(image) = &user.image
            && image.public_id.is_none()
            && image.url != picture
        {
            queries::update_image_url(pool, image.id, picture).await?;
            user = queries::find_user_by_id(pool, user.id)
                .await?
                .ok_or_else(|| ApiError::Authentication("User not found".into()))?;
        }

        let session = issue_session(keys, &user)?;
        return Ok((user.into_public(), session));
    }

    let user = queries::create_google_user(pool, name, email, picture).await?;
    info!(email = %user.email, "user created via google login");

    let session = issue_session(keys, &user)?;
    Ok((user.into_public(), session))
}

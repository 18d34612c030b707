//! Profile updates and the deferred email-change flow.
//!
//! Name and image changes commit immediately. An email change never touches
//! the record synchronously: it queues a purpose token and mails the NEW
//! address; the record changes only when that token is redeemed. A single
//! call can do both.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use keel_core::auth::tokens::{self, TokenKeys, TokenPurpose};
use keel_core::auth::queries;
use keel_core::email::Mailer;
use keel_core::models::user::PublicUser;

use crate::error::{ApiError, ApiResult};
use crate::services::media::MediaStore;

/// Media-store folder for profile images.
const PROFILE_IMAGE_FOLDER: &str = "/images/profile";

/// An image file received from the client.
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Outcome of a profile update.
pub enum ProfileUpdate {
    /// All requested changes are committed.
    Updated(PublicUser),
    /// Name/image changes (if any) are committed; the email change awaits
    /// out-of-band confirmation.
    EmailChangePending { user: PublicUser, message: String },
}

pub async fn update_profile(
    pool: &PgPool,
    mailer: &Mailer,
    keys: &TokenKeys,
    media: &MediaStore,
    user_id: Uuid,
    name: Option<&str>,
    email: Option<&str>,
    current_email: &str,
    image: Option<UploadedImage>,
) -> ApiResult<ProfileUpdate> {
    if let Some(file) = image {
        let user = queries::find_user_by_id(pool, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        // Replace, never accumulate: drop the previous image first.
        if let Some(existing) = &user.image {
            if let Some(public_id) = &existing.public_id {
                media.delete(public_id).await?;
            }
            queries::delete_image(pool, existing.id).await?;
        }

        let uploaded = media
            .upload(&file.bytes, &file.content_type, PROFILE_IMAGE_FOLDER)
            .await?;

        if let Some(name) = name {
            queries::update_user_name(pool, user_id, name).await?;
        }
        queries::insert_image(pool, user_id, &uploaded.url, Some(&uploaded.public_id)).await?;
    } else if let Some(name) = name {
        queries::update_user_name(pool, user_id, name).await?;
    }

    if let Some(new_email) = email
        && new_email != current_email
    {
        if queries::email_exists(pool, new_email).await? {
            return Err(ApiError::Conflict("Email already exists".into()));
        }

        let token = tokens::issue_new_email_token(keys, &user_id.to_string(), new_email)?;

        let user = queries::find_user_by_id(pool, user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        mailer
            .send_new_email_verification(&user.name, new_email, &token)
            .await?;

        return Ok(ProfileUpdate::EmailChangePending {
            user: user.into_public(),
            message: "Complete your email change, check your email inbox".into(),
        });
    }

    let user = queries::find_user_by_id(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(ProfileUpdate::Updated(user.into_public()))
}

/// Redeem a new-email token, committing the address carried in its payload.
pub async fn verify_new_email(
    pool: &PgPool,
    keys: &TokenKeys,
    token: &str,
) -> ApiResult<PublicUser> {
    let claims = tokens::verify(keys, token, TokenPurpose::NewEmail)?;

    let user = super::find_claimed_user(pool, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;

    let new_email = claims
        .new_email
        .ok_or_else(|| ApiError::Authentication("Invalid token".into()))?;

    queries::update_user_email(pool, user.id, &new_email).await?;

    let user = queries::find_user_by_id(pool, user.id)
        .await?
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;
    info!(email = %user.email, "email change confirmed");
    Ok(user.into_public())
}

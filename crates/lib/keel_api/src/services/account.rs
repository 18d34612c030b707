//! Account deletion.

use sqlx::PgPool;
use tracing::info;

use keel_core::auth::queries;
use keel_core::models::user::PublicUser;

use crate::error::ApiResult;
use crate::services::media::MediaStore;

/// Irreversibly delete an account. A hosted profile image is removed from
/// the media store first; the image row cascades with the user.
pub async fn delete_account(pool: &PgPool, media: &MediaStore, user: &PublicUser) -> ApiResult<()> {
    if let Some(image) = &user.image
        && let Some(public_id) = &image.public_id
    {
        media.delete(public_id).await?;
    }

    queries::delete_user(pool, user.id).await?;
    info!(email = %user.email, "account deleted");
    Ok(())
}

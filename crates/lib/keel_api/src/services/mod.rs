//! Orchestration services behind the request handlers.

pub mod account;
pub mod cookies;
pub mod login;
pub mod media;
pub mod password;
pub mod profile;
pub mod registration;

use sqlx::PgPool;
use uuid::Uuid;

use keel_core::auth::queries;
use keel_core::models::user::User;

use crate::error::ApiResult;

/// Resolve the user a token's `sub` claim points at. A malformed id reads as
/// "no such user" rather than a store error.
pub(crate) async fn find_claimed_user(pool: &PgPool, sub: &str) -> ApiResult<Option<User>> {
    match sub.parse::<Uuid>() {
        Ok(id) => Ok(queries::find_user_by_id(pool, id).await?),
        Err(_) => Ok(None),
    }
}

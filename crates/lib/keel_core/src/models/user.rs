//! User domain models.
//!
//! `User` is the internal record including the password hash; `PublicUser`
//! is the wire-facing shape with the hash stripped. Field names on the wire
//! keep the store's spelling (`is_active`, `createdAt`) so existing clients
//! keep working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

/// Profile image owned by a user.
///
/// `public_id` is the handle in the external media store; it is `None` for
/// avatars hosted by the OAuth provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: Uuid,
    pub url: String,
    pub public_id: Option<String>,
}

/// Full user record, including the password hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// bcrypt hash; `None` for accounts created through Google login only.
    pub password: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub image: Option<Image>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User record as returned to callers — the password hash is never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub image: Option<Image>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Strip the password hash for the wire.
    pub fn into_public(self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            is_active: self.is_active,
            image: self.image,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

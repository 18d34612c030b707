//! User-store queries.
//!
//! Per-row consistency (unique email, atomic updates) is delegated to
//! PostgreSQL; concurrent writers race at the store's constraints and the
//! loser surfaces a unique violation (see [`is_unique_violation`]).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::AuthError;
use crate::models::user::{Image, Role, User};

/// User row joined with its optional image.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password: Option<String>,
    role: Role,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    image_id: Option<Uuid>,
    image_url: Option<String>,
    image_public_id: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        let image = match (row.image_id, row.image_url) {
            (Some(id), Some(url)) => Some(Image {
                id,
                url,
                public_id: row.image_public_id,
            }),
            _ => None,
        };
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            role: row.role,
            is_active: row.is_active,
            image,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_USER: &str = "SELECT u.id, u.name, u.email, u.password, u.role, u.is_active, \
     u.created_at, u.updated_at, \
     i.id AS image_id, i.url AS image_url, i.public_id AS image_public_id \
     FROM users u LEFT JOIN images i ON i.user_id = u.id";

/// Fetch a user (with image) by email.
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE u.email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

/// Fetch a user (with image) by id.
pub async fn find_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE u.id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(User::from))
}

/// Check whether an email is already registered.
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AuthError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Create an inactive user with a hashed password.
pub async fn create_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, AuthError> {
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (name, email, password) VALUES ($1, $2, $3) \
         RETURNING id, name, email, password, role, is_active, created_at, updated_at, \
         NULL::uuid AS image_id, NULL::text AS image_url, NULL::text AS image_public_id",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(row.into())
}

/// Create an already-active user from a Google identity, with the provider
/// avatar attached as an owned image. Both rows commit or neither does.
pub async fn create_google_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    picture: &str,
) -> Result<User, AuthError> {
    let mut tx = pool.begin().await?;

    let mut user: User = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (name, email, is_active) VALUES ($1, $2, true) \
         RETURNING id, name, email, password, role, is_active, created_at, updated_at, \
         NULL::uuid AS image_id, NULL::text AS image_url, NULL::text AS image_public_id",
    )
    .bind(name)
    .bind(email)
    .fetch_one(&mut *tx)
    .await?
    .into();

    let (image_id, url, public_id) = sqlx::query_as::<_, (Uuid, String, Option<String>)>(
        "INSERT INTO images (user_id, url) VALUES ($1, $2) RETURNING id, url, public_id",
    )
    .bind(user.id)
    .bind(picture)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    user.image = Some(Image {
        id: image_id,
        url,
        public_id,
    });
    Ok(user)
}

/// Mark a user as verified.
pub async fn set_user_active(pool: &PgPool, user_id: Uuid) -> Result<(), AuthError> {
    sqlx::query("UPDATE users SET is_active = true, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Rename a user.
pub async fn update_user_name(pool: &PgPool, user_id: Uuid, name: &str) -> Result<(), AuthError> {
    sqlx::query("UPDATE users SET name = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(name)
        .execute(pool)
        .await?;
    Ok(())
}

/// Commit a confirmed email change.
pub async fn update_user_email(pool: &PgPool, user_id: Uuid, email: &str) -> Result<(), AuthError> {
    sqlx::query("UPDATE users SET email = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(email)
        .execute(pool)
        .await?;
    Ok(())
}

/// Commit a confirmed password change (hash already computed).
pub async fn update_user_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<(), AuthError> {
    sqlx::query("UPDATE users SET password = $2, updated_at = now() WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Point an existing image at a new URL (provider avatar refresh).
pub async fn update_image_url(pool: &PgPool, image_id: Uuid, url: &str) -> Result<(), AuthError> {
    sqlx::query("UPDATE images SET url = $2 WHERE id = $1")
        .bind(image_id)
        .bind(url)
        .execute(pool)
        .await?;
    Ok(())
}

/// Attach a freshly uploaded image to a user.
pub async fn insert_image(
    pool: &PgPool,
    user_id: Uuid,
    url: &str,
    public_id: Option<&str>,
) -> Result<Image, AuthError> {
    let (id, url, public_id) = sqlx::query_as::<_, (Uuid, String, Option<String>)>(
        "INSERT INTO images (user_id, url, public_id) VALUES ($1, $2, $3) \
         RETURNING id, url, public_id",
    )
    .bind(user_id)
    .bind(url)
    .bind(public_id)
    .fetch_one(pool)
    .await?;
    Ok(Image {
        id,
        url,
        public_id,
    })
}

/// Delete an image record.
pub async fn delete_image(pool: &PgPool, image_id: Uuid) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM images WHERE id = $1")
        .bind(image_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a user; the owned image row cascades.
pub async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<(), AuthError> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Whether an error is the store's unique-constraint violation — the losing
/// side of a concurrent insert race on `users.email`.
pub fn is_unique_violation(err: &AuthError) -> bool {
    match err {
        AuthError::Db(sqlx::Error::Database(db)) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

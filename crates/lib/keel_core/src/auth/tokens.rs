//! Token minting and verification.
//!
//! Every token Keel hands out is an HS256 JWT signed with a secret dedicated
//! to its purpose: the session pair (access/refresh) plus one secret per
//! out-of-band confirmation flow. A token minted for one purpose never
//! verifies under another purpose's secret.
//!
//! Purpose tokens carry no server-side state; validity is entirely a
//! function of signature and expiry, so a purpose token stays redeemable
//! until it expires.

use std::path::PathBuf;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AuthError;

/// Access token lifetime: 5 minutes.
pub const ACCESS_TOKEN_EXPIRY_SECS: i64 = 5 * 60;

/// Refresh token lifetime: 30 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;

/// Lifetime of every out-of-band confirmation token: 1 day.
pub const PURPOSE_TOKEN_EXPIRY_DAYS: i64 = 1;

/// The flows a token can be minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Access,
    Refresh,
    Register,
    NewEmail,
    ChangePassword,
    ResetPassword,
}

/// Claims carried by Keel tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject — user id.
    pub sub: String,
    /// Pending email address (`NewEmail` tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_email: Option<String>,
    /// Pending bcrypt hash (`ChangePassword` tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

impl TokenClaims {
    fn new(sub: &str, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: sub.to_string(),
            new_email: None,
            new_password: None,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// One signing secret per token purpose.
#[derive(Clone, Debug)]
pub struct TokenKeys {
    access: String,
    refresh: String,
    register: String,
    new_email: String,
    change_password: String,
    reset_password: String,
}

impl TokenKeys {
    /// Build a key set from explicit secrets.
    pub fn new(
        access: impl Into<String>,
        refresh: impl Into<String>,
        register: impl Into<String>,
        new_email: impl Into<String>,
        change_password: impl Into<String>,
        reset_password: impl Into<String>,
    ) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
            register: register.into(),
            new_email: new_email.into(),
            change_password: change_password.into(),
            reset_password: reset_password.into(),
        }
    }

    /// Resolve all six secrets: env var first, then a persisted per-purpose
    /// secret file, generating one if neither exists.
    pub fn from_env() -> Self {
        Self {
            access: resolve_secret("ACCESS_TOKEN_SECRET", "access-token-secret"),
            refresh: resolve_secret("REFRESH_TOKEN_SECRET", "refresh-token-secret"),
            register: resolve_secret("REGISTER_TOKEN_SECRET", "register-token-secret"),
            new_email: resolve_secret("NEW_EMAIL_TOKEN_SECRET", "new-email-token-secret"),
            change_password: resolve_secret(
                "UPDATE_PASSWORD_TOKEN_SECRET",
                "update-password-token-secret",
            ),
            reset_password: resolve_secret(
                "FORGOT_PASSWORD_TOKEN_SECRET",
                "forgot-password-token-secret",
            ),
        }
    }

    fn secret(&self, purpose: TokenPurpose) -> &[u8] {
        match purpose {
            TokenPurpose::Access => self.access.as_bytes(),
            TokenPurpose::Refresh => self.refresh.as_bytes(),
            TokenPurpose::Register => self.register.as_bytes(),
            TokenPurpose::NewEmail => self.new_email.as_bytes(),
            TokenPurpose::ChangePassword => self.change_password.as_bytes(),
            TokenPurpose::ResetPassword => self.reset_password.as_bytes(),
        }
    }
}

fn sign(keys: &TokenKeys, purpose: TokenPurpose, claims: &TokenClaims) -> Result<String, AuthError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(keys.secret(purpose)),
    )
    .map_err(|e| AuthError::TokenEncode(format!("jwt encode: {e}")))
}

/// Generate a signed access token (5 min expiry).
pub fn issue_access_token(keys: &TokenKeys, user_id: &str) -> Result<String, AuthError> {
    let claims = TokenClaims::new(user_id, Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS));
    sign(keys, TokenPurpose::Access, &claims)
}

/// Generate a signed refresh token (30 day expiry).
pub fn issue_refresh_token(keys: &TokenKeys, user_id: &str) -> Result<String, AuthError> {
    let claims = TokenClaims::new(user_id, Duration::days(REFRESH_TOKEN_EXPIRY_DAYS));
    sign(keys, TokenPurpose::Refresh, &claims)
}

/// Generate the account-activation token sent at registration.
pub fn issue_register_token(keys: &TokenKeys, user_id: &str) -> Result<String, AuthError> {
    let claims = TokenClaims::new(user_id, Duration::days(PURPOSE_TOKEN_EXPIRY_DAYS));
    sign(keys, TokenPurpose::Register, &claims)
}

/// Generate the token confirming a pending email change.
pub fn issue_new_email_token(
    keys: &TokenKeys,
    user_id: &str,
    new_email: &str,
) -> Result<String, AuthError> {
    let mut claims = TokenClaims::new(user_id, Duration::days(PURPOSE_TOKEN_EXPIRY_DAYS));
    claims.new_email = Some(new_email.to_string());
    sign(keys, TokenPurpose::NewEmail, &claims)
}

/// Generate the token confirming a pending password change.
///
/// The replacement hash travels inside the token; nothing is stored
/// server-side until the token is redeemed.
pub fn issue_change_password_token(
    keys: &TokenKeys,
    user_id: &str,
    new_password_hash: &str,
) -> Result<String, AuthError> {
    let mut claims = TokenClaims::new(user_id, Duration::days(PURPOSE_TOKEN_EXPIRY_DAYS));
    claims.new_password = Some(new_password_hash.to_string());
    sign(keys, TokenPurpose::ChangePassword, &claims)
}

/// Generate the password-reset token; the replacement password is supplied
/// at redemption time.
pub fn issue_reset_password_token(keys: &TokenKeys, user_id: &str) -> Result<String, AuthError> {
    let claims = TokenClaims::new(user_id, Duration::days(PURPOSE_TOKEN_EXPIRY_DAYS));
    sign(keys, TokenPurpose::ResetPassword, &claims)
}

/// Verify a token under the given purpose's secret, returning the claims.
pub fn verify(
    keys: &TokenKeys,
    token: &str,
    purpose: TokenPurpose,
) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_secret(keys.secret(purpose));
    let mut validation = Validation::default();
    validation.validate_exp = true;
    decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid,
        })
}

/// Resolve a signing secret: env var, else a secret persisted under the
/// platform data dir, generating and saving one on first use.
fn resolve_secret(env_var: &str, file_name: &str) -> String {
    if let Ok(secret) = std::env::var(env_var)
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = secret_path(file_name);
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new signing secret");
    secret
}

/// Path to a persisted signing-secret file.
fn secret_path(file_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keel")
        .join(file_name)
}

//! Cookie service — build and clear the session cookie pair.
//!
//! Each cookie expires with its own token. Security flags are tightened in
//! production (httpOnly, secure, SameSite=None for the cross-origin client)
//! and relaxed in development so local cross-origin debugging works.

use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use keel_core::auth::tokens::{ACCESS_TOKEN_EXPIRY_SECS, REFRESH_TOKEN_EXPIRY_DAYS};

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "accessToken";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refreshToken";

fn build(name: &str, value: String, max_age: Duration, production: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .http_only(production)
        .secure(production)
        .same_site(if production {
            SameSite::None
        } else {
            SameSite::Lax
        })
        .path("/".to_string())
        .max_age(max_age)
        .build()
}

/// Build the access+refresh cookie pair for a response.
pub fn session_cookies(
    access_token: &str,
    refresh_token: &str,
    production: bool,
) -> [Cookie<'static>; 2] {
    [
        build(
            ACCESS_COOKIE,
            access_token.to_string(),
            Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS),
            production,
        ),
        build(
            REFRESH_COOKIE,
            refresh_token.to_string(),
            Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
            production,
        ),
    ]
}

/// Build immediately-expiring cookies that clear the session.
pub fn clear_session_cookies(production: bool) -> [Cookie<'static>; 2] {
    [
        build(ACCESS_COOKIE, String::new(), Duration::ZERO, production),
        build(REFRESH_COOKIE, String::new(), Duration::ZERO, production),
    ]
}

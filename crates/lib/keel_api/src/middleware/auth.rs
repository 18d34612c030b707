//! Session authentication middleware.
//!
//! Resolves the caller from the `accessToken`/`refreshToken` cookies. A
//! valid access token binds the user to the request and touches nothing. An
//! absent or invalid access token falls through to the refresh token; a
//! valid refresh token silently reissues BOTH cookies on the response
//! (rotation), so every authenticated request can extend the session.

use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::{
    extract::{FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use keel_core::auth::tokens::{self, TokenPurpose};
use keel_core::models::user::{PublicUser, Role};

use crate::AppState;
use crate::error::ApiError;
use crate::services::{self, cookies};

/// The authenticated user bound to the request.
///
/// Inserted into request extensions by [`authenticate_user`]; handlers take
/// it as an extractor, which rejects with 401 if the middleware did not run.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))
    }
}

async fn lookup_user(state: &AppState, sub: &str) -> Result<PublicUser, ApiError> {
    services::find_claimed_user(&state.pool, sub)
        .await?
        .map(|user| user.into_public())
        .ok_or_else(|| ApiError::Authentication("User not found".into()))
}

/// Axum middleware guarding the protected routes.
pub async fn authenticate_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let access_token = jar.get(cookies::ACCESS_COOKIE).map(|c| c.value().to_string());
    let refresh_token = jar
        .get(cookies::REFRESH_COOKIE)
        .map(|c| c.value().to_string());

    if access_token.is_none() && refresh_token.is_none() {
        return Err(ApiError::Authentication("Unauthorized".into()));
    }

    // First try the access token if available.
    if let Some(token) = access_token {
        match tokens::verify(&state.config.keys, &token, TokenPurpose::Access) {
            Ok(claims) => {
                let user = lookup_user(&state, &claims.sub).await?;
                request.extensions_mut().insert(CurrentUser(user));
                return Ok(next.run(request).await);
            }
            // Expired or tampered access token: fall through to the refresh token.
            Err(err) => debug!("access token rejected: {err}"),
        }
    }

    let Some(token) = refresh_token else {
        return Err(ApiError::Authentication("Unauthorized".into()));
    };

    let claims = tokens::verify(&state.config.keys, &token, TokenPurpose::Refresh)
        .map_err(|_| ApiError::Authentication("Authentication failed. Please login again".into()))?;

    let user = lookup_user(&state, &claims.sub).await?;

    // Token rotation: reissue the whole pair on the same response.
    let access_token = tokens::issue_access_token(&state.config.keys, &claims.sub)?;
    let refresh_token = tokens::issue_refresh_token(&state.config.keys, &claims.sub)?;

    request.extensions_mut().insert(CurrentUser(user));
    let mut response = next.run(request).await;
    for cookie in cookies::session_cookies(&access_token, &refresh_token, state.config.production) {
        if let Ok(value) = cookie.to_string().parse() {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    Ok(response)
}

/// Gate for admin-only routes. Must run after [`authenticate_user`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Authentication("Unauthorized".into()))?;
    if user.0.role != Role::Admin {
        return Err(ApiError::Authorization("You are not authorized".into()));
    }
    Ok(next.run(request).await)
}

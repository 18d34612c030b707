//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::auth::CurrentUser;
use crate::models::{
    GoogleLoginRequest, LoginRequest, MessageResponse, RegisterRequest, ResendTokenRequest,
    UserResponse, VerifyTokenRequest,
};
use crate::services::{cookies, login, registration};
use crate::validation;

/// `POST /api/user/register` — create an inactive account and send the
/// activation email.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    validation::check(&body)?;
    let user = registration::register(
        &state.pool,
        &state.mailer,
        &state.config.keys,
        &body.name,
        &body.email,
        &body.password,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new("User registered and email sent", user)),
    ))
}

/// `POST /api/user/resend-token` — resend the activation email.
pub async fn resend_token_handler(
    State(state): State<AppState>,
    Json(body): Json<ResendTokenRequest>,
) -> ApiResult<Json<UserResponse>> {
    validation::check(&body)?;
    let user = registration::resend_verification_token(
        &state.pool,
        &state.mailer,
        &state.config.keys,
        &body.email,
    )
    .await?;
    Ok(Json(UserResponse::new("Email sent", user)))
}

/// `POST /api/user/verify-email` — redeem an activation token.
pub async fn verify_email_handler(
    State(state): State<AppState>,
    Json(body): Json<VerifyTokenRequest>,
) -> ApiResult<Json<UserResponse>> {
    validation::check(&body)?;
    let user =
        registration::verify_user_email(&state.pool, &state.config.keys, &body.token).await?;
    Ok(Json(UserResponse::new("Email verified", user)))
}

/// `POST /api/user/login` — authenticate with email + password, setting the
/// session cookie pair.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<UserResponse>)> {
    validation::check(&body)?;
    let (user, session) =
        login::login(&state.pool, &state.config.keys, &body.email, &body.password).await?;

    let [access, refresh] =
        cookies::session_cookies(&session.access, &session.refresh, state.config.production);
    Ok((
        jar.add(access).add(refresh),
        Json(UserResponse::new("Login successful", user)),
    ))
}

/// `POST /api/user/google-login` — authenticate (or create) an account from
/// a Google identity.
pub async fn google_login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<GoogleLoginRequest>,
) -> ApiResult<(CookieJar, Json<UserResponse>)> {
    validation::check(&body)?;
    let (user, session) = login::google_login(
        &state.pool,
        &state.config.keys,
        &body.name,
        &body.email,
        &body.picture,
    )
    .await?;

    let [access, refresh] =
        cookies::session_cookies(&session.access, &session.refresh, state.config.production);
    Ok((
        jar.add(access).add(refresh),
        Json(UserResponse::new("Login successful", user)),
    ))
}

/// `GET /api/user/me` — return the caller bound by the auth middleware.
pub async fn logged_in_user_handler(user: CurrentUser) -> ApiResult<Json<UserResponse>> {
    Ok(Json(UserResponse::new("User logged in", user.0)))
}

/// `DELETE /api/user/logout` — expire the session cookies.
///
/// Stateless tokens cannot be revoked; logout is purely cookie removal and
/// is idempotent.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let [access, refresh] = cookies::clear_session_cookies(state.config.production);
    Ok((
        jar.add(access).add(refresh),
        Json(MessageResponse::new("Logout success")),
    ))
}

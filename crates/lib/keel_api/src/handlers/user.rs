//! Profile, password and account-lifecycle request handlers.

use axum::Json;
use axum::extract::{Multipart, State};
use axum_extra::extract::cookie::CookieJar;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::CurrentUser;
use crate::models::{
    ForgotPasswordRequest, MessageResponse, ResetPasswordVerifyRequest, UpdatePasswordRequest,
    UpdateProfileRequest, UserResponse, VerifyTokenRequest,
};
use crate::services::profile::{ProfileUpdate, UploadedImage};
use crate::services::{account, cookies, password, profile};
use crate::validation;

/// Upload cap for profile images.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation {
        message: format!("Invalid multipart payload: {err}"),
        errors: vec![],
    }
}

/// `PATCH /api/user/update-user` — multipart profile update (`name?`,
/// `email?`, `image?`). Name/image commit now; an email change only queues a
/// confirmation.
pub async fn update_user_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<UserResponse>> {
    let mut name: Option<String> = None;
    let mut email: Option<String> = None;
    let mut image: Option<UploadedImage> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("name") => name = Some(field.text().await.map_err(multipart_error)?),
            Some("email") => email = Some(field.text().await.map_err(multipart_error)?),
            Some("image") => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !content_type.starts_with("image/") {
                    return Err(ApiError::Validation {
                        message: "File must be an image".into(),
                        errors: vec![],
                    });
                }
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if bytes.len() > MAX_IMAGE_BYTES {
                    return Err(ApiError::Validation {
                        message: "Image size must be less than 5mb".into(),
                        errors: vec![],
                    });
                }
                image = Some(UploadedImage {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            _ => {}
        }
    }

    validation::check(&UpdateProfileRequest {
        name: name.clone(),
        email: email.clone(),
    })?;

    let result = profile::update_profile(
        &state.pool,
        &state.mailer,
        &state.config.keys,
        &state.media,
        user.0.id,
        name.as_deref(),
        email.as_deref(),
        &user.0.email,
        image,
    )
    .await?;

    let response = match result {
        ProfileUpdate::Updated(user) => UserResponse::new("User updated", user),
        ProfileUpdate::EmailChangePending { user, message } => UserResponse::new(message, user),
    };
    Ok(Json(response))
}

/// `POST /api/user/verify-new-email` — redeem a new-email token.
pub async fn verify_new_email_handler(
    State(state): State<AppState>,
    Json(body): Json<VerifyTokenRequest>,
) -> ApiResult<Json<UserResponse>> {
    validation::check(&body)?;
    let user = profile::verify_new_email(&state.pool, &state.config.keys, &body.token).await?;
    Ok(Json(UserResponse::new("Email updated", user)))
}

/// `POST /api/user/update-password` — start a password change; the stored
/// hash does not move until the emailed token is redeemed.
pub async fn update_password_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UpdatePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validation::check(&body)?;
    password::update_password(
        &state.pool,
        &state.mailer,
        &state.config.keys,
        user.0.id,
        &body.password,
        &body.new_password,
    )
    .await?;
    Ok(Json(MessageResponse::new(
        "Complete your password change, check your email inbox",
    )))
}

/// `POST /api/user/verify-new-password` — redeem a change-password token.
pub async fn verify_new_password_handler(
    State(state): State<AppState>,
    Json(body): Json<VerifyTokenRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validation::check(&body)?;
    password::verify_new_password(&state.pool, &state.config.keys, &body.token).await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// `POST /api/user/forgot-password` — mail a password-reset token.
pub async fn forgot_password_handler(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validation::check(&body)?;
    password::forgot_password(&state.pool, &state.mailer, &state.config.keys, &body.email).await?;
    Ok(Json(MessageResponse::new(
        "Complete your password reset, check your email inbox",
    )))
}

/// `POST /api/user/reset-password-verify` — redeem a reset token with the
/// replacement password.
pub async fn reset_password_verify_handler(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordVerifyRequest>,
) -> ApiResult<Json<MessageResponse>> {
    validation::check(&body)?;
    password::reset_password_verify(
        &state.pool,
        &state.config.keys,
        &body.token,
        &body.new_password,
    )
    .await?;
    Ok(Json(MessageResponse::new("Password updated")))
}

/// `DELETE /api/user/delete-account` — irreversibly delete the caller's
/// account and clear the session cookies.
pub async fn delete_account_handler(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    account::delete_account(&state.pool, &state.media, &user.0).await?;

    let [access, refresh] = cookies::clear_session_cookies(state.config.production);
    Ok((
        jar.add(access).add(refresh),
        Json(MessageResponse::new("Account deleted")),
    ))
}

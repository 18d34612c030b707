//! Request and response payloads.
//!
//! Request field names keep the client's camelCase spelling where the two
//! differ (`newPassword`).

use serde::{Deserialize, Serialize};
use validator::Validate;

use keel_core::models::user::PublicUser;

use crate::validation::password_strength;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(custom(function = password_strength))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendTokenRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Shared shape of the four token-redemption endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyTokenRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GoogleLoginRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(url(message = "Picture must be a valid URL"))]
    pub picture: String,
}

/// Text fields of the multipart profile-update request.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, message = "Name must be at least 2 characters long"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(custom(function = password_strength))]
    pub password: String,
    #[serde(rename = "newPassword")]
    #[validate(custom(function = password_strength))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordVerifyRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
    #[serde(rename = "newPassword")]
    #[validate(custom(function = password_strength))]
    pub new_password: String,
}

/// Success envelope carrying a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

impl UserResponse {
    pub fn new(message: impl Into<String>, user: PublicUser) -> Self {
        Self {
            success: true,
            message: message.into(),
            user,
        }
    }
}

/// Success envelope without a payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_password_uses_camel_case_field() {
        let body: UpdatePasswordRequest =
            serde_json::from_str(r#"{"password": "Passw0rd!", "newPassword": "N3wPassword"}"#)
                .unwrap();
        assert_eq!(body.new_password, "N3wPassword");
    }

    #[test]
    fn optional_profile_fields_validate_when_present() {
        let ok = UpdateProfileRequest {
            name: None,
            email: None,
        };
        assert!(ok.validate().is_ok());

        let bad = UpdateProfileRequest {
            name: Some("A".into()),
            email: Some("nope".into()),
        };
        assert!(bad.validate().is_err());
    }
}

//! Request validation.
//!
//! Payload structs derive `validator::Validate`; [`check`] runs a payload's
//! rules and folds any failures into the validation error envelope.

use validator::{Validate, ValidationError};

use crate::error::{ApiError, FieldError};

/// Password policy: minimum 8 characters, at least one uppercase letter,
/// one lowercase letter and one digit.
pub fn password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 {
        return Err(ValidationError::new("password_length")
            .with_message("Password must be at least 8 characters long".into()));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ValidationError::new("password_strength").with_message(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .into(),
        ));
    }
    Ok(())
}

/// Validate a payload, mapping rule failures to the 400 envelope.
pub fn check<T: Validate>(payload: &T) -> Result<(), ApiError> {
    payload.validate().map_err(|errors| {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    path: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.path.cmp(&b.path));
        ApiError::Validation {
            message: "Validation failed".into(),
            errors: details,
        }
    })
}

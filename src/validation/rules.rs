//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates display name format.
///
/// Requirements:
/// - ASCII letters and spaces only
/// - 3-50 characters in length
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.len() < 3 || name.len() > 50 {
        return Err(ValidationError::new("name_invalid_length"));
    }

    if !name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
        return Err(ValidationError::new("name_invalid_characters"));
    }

    Ok(())
}

/// Rejects emails containing whitespace. Normalization trims the ends;
/// interior whitespace is a client error.
pub fn validate_email_no_spaces(email: &str) -> Result<(), ValidationError> {
    if email.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::new("email_contains_spaces"));
    }
    Ok(())
}

/// Validates password strength.
///
/// Requirements:
/// - 8-64 characters
/// - At least one uppercase letter, one lowercase letter, one digit and
///   one special character
/// - No whitespace
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.len() < 8 || password.len() > 64 {
        return Err(ValidationError::new("password_invalid_length"));
    }

    if password.chars().any(|c| c.is_whitespace()) {
        return Err(ValidationError::new("password_contains_spaces"));
    }

    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(ValidationError::new("password_too_weak"));
    }

    Ok(())
}

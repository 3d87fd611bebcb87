use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ApiError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const EMAIL_MAX: usize = 254;
pub const PASSWORD_MIN: usize = 8;
pub const TITLE_MAX: usize = 255;
pub const DESCRIPTION_MAX: usize = 1000;
pub const CATEGORY_MAX: usize = 50;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Trims surrounding whitespace and drops NUL bytes.
pub fn sanitize(input: &str) -> String {
    input.trim().replace('\0', "")
}

pub fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() {
        return Err(invalid("email is required"));
    }
    if email.chars().count() > EMAIL_MAX {
        return Err(invalid("email too long"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(invalid("invalid email format"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(invalid("username is required"));
    }
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(invalid("username must be between 3 and 50 characters"));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(invalid(
            "username can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(invalid("password is required"));
    }
    if password.chars().count() < PASSWORD_MIN {
        return Err(invalid("password must be at least 8 characters long"));
    }
    let has_upper = password.chars().any(char::is_uppercase);
    let has_lower = password.chars().any(char::is_lowercase);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(invalid(
            "password must contain at least one uppercase letter, one lowercase letter, and one digit",
        ));
    }
    Ok(())
}

/// Rejects `value` when it is longer than `max` characters.
pub fn check_len(field: &str, value: &str, max: usize) -> Result<(), ApiError> {
    if value.chars().count() > max {
        return Err(ApiError::Validation(format!("{field} too long")));
    }
    Ok(())
}

pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(invalid("invalid todo ID")),
    }
}

fn invalid(msg: &str) -> ApiError {
    ApiError::Validation(msg.to_string())
}

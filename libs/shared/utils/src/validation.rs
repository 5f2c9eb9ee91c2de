//! Field formats shared by the user, patient and report endpoints.

use std::sync::LazyLock;

use regex::Regex;

use shared_models::error::AppError;

static PHONE_NUMBER: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^09\d{9}$"));
static NATIONAL_CODE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^\d{10}$"));
static EMERGENCY_CONTACT: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"^\d{11}$"));

fn matches(pattern: &LazyLock<Result<Regex, regex::Error>>, value: &str) -> bool {
    pattern.as_ref().is_ok_and(|re| re.is_match(value))
}

/// Mobile numbers: eleven digits starting with `09`.
pub fn is_valid_phone_number(value: &str) -> bool {
    matches(&PHONE_NUMBER, value)
}

pub fn is_valid_national_code(value: &str) -> bool {
    matches(&NATIONAL_CODE, value)
}

pub fn is_valid_emergency_contact(value: &str) -> bool {
    matches(&EMERGENCY_CONTACT, value)
}

pub fn require_phone_number(value: &str) -> Result<(), AppError> {
    if is_valid_phone_number(value) {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "Phone number must be 11 digits and start with 09".to_string(),
        ))
    }
}

pub fn require_national_code(value: &str) -> Result<(), AppError> {
    if is_valid_national_code(value) {
        Ok(())
    } else {
        Err(AppError::ValidationError("National code must be exactly 10 digits".to_string()))
    }
}

pub fn require_emergency_contact(value: &str) -> Result<(), AppError> {
    if is_valid_emergency_contact(value) {
        Ok(())
    } else {
        Err(AppError::ValidationError("Emergency contact must be exactly 11 digits".to_string()))
    }
}

/// Rejects blank values for required text fields.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::ValidationError(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

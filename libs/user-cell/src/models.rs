use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_database::DatabaseError;
use shared_models::auth::UserRole;
use shared_models::error::AppError;
use shared_utils::password::{is_acceptable_password, MIN_PASSWORD_LENGTH};
use shared_utils::validation::is_valid_phone_number;

pub const MIN_FULL_NAME_LENGTH: usize = 2;
pub const MAX_FULL_NAME_LENGTH: usize = 255;

/// A user as returned by the API. The password hash never leaves storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub phone_number: String,
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Storage row including the credential, used only for login.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCredentials {
    #[serde(flatten)]
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub phone_number: String,
    pub full_name: String,
    pub password: String,
    #[serde(default)]
    pub role: UserRole,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), UserError> {
        validate_phone(&self.phone_number)?;
        validate_full_name(&self.full_name)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub phone_number: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), UserError> {
        if let Some(phone) = &self.phone_number {
            validate_phone(phone)?;
        }
        if let Some(name) = &self.full_name {
            validate_full_name(name)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }

    /// `password_hash` replaces the plain password, which never reaches the patch.
    pub fn into_patch(self, password_hash: Option<String>, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(phone_number) = self.phone_number {
            patch.insert("phone_number".to_string(), json!(phone_number));
        }
        if let Some(full_name) = self.full_name {
            patch.insert("full_name".to_string(), json!(full_name));
        }
        if let Some(hash) = password_hash {
            patch.insert("password_hash".to_string(), json!(hash));
        }
        if let Some(role) = self.role {
            patch.insert("role".to_string(), json!(role));
        }
        if let Some(is_active) = self.is_active {
            patch.insert("is_active".to_string(), json!(is_active));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

fn validate_phone(phone: &str) -> Result<(), UserError> {
    if is_valid_phone_number(phone) {
        Ok(())
    } else {
        Err(UserError::ValidationError(
            "Phone number must be 11 digits and start with 09".to_string(),
        ))
    }
}

fn validate_full_name(name: &str) -> Result<(), UserError> {
    let length = name.trim().chars().count();
    if (MIN_FULL_NAME_LENGTH..=MAX_FULL_NAME_LENGTH).contains(&length) {
        Ok(())
    } else {
        Err(UserError::ValidationError(format!(
            "Full name must be between {} and {} characters",
            MIN_FULL_NAME_LENGTH, MAX_FULL_NAME_LENGTH
        )))
    }
}

fn validate_password(password: &str) -> Result<(), UserError> {
    if is_acceptable_password(password) {
        Ok(())
    } else {
        Err(UserError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Phone number is already registered")]
    PhoneTaken,

    #[error("{0}")]
    ValidationError(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::PhoneTaken => AppError::BadRequest(err.to_string()),
            UserError::ValidationError(msg) => AppError::ValidationError(msg),
            UserError::PasswordHash(msg) => AppError::Internal(msg),
            UserError::Database(db) => db.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(phone: &str, name: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            phone_number: phone.to_string(),
            full_name: name.to_string(),
            password: password.to_string(),
            role: UserRole::Secretary,
        }
    }

    #[test]
    fn create_request_rules() {
        assert!(create("09121234567", "Maryam Hosseini", "secret1").validate().is_ok());
        assert!(create("9121234567", "Maryam Hosseini", "secret1").validate().is_err());
        assert!(create("09121234567", "M", "secret1").validate().is_err());
        assert!(create("09121234567", "Maryam Hosseini", "short").validate().is_err());
    }

    #[test]
    fn role_defaults_to_patient() {
        let request: CreateUserRequest = serde_json::from_value(json!({
            "phone_number": "09121234567",
            "full_name": "Ali Rezaei",
            "password": "secret1"
        }))
        .unwrap();
        assert_eq!(request.role, UserRole::Patient);
    }

    #[test]
    fn patch_swaps_password_for_hash() {
        let patch = UpdateUserRequest {
            password: Some("new-secret".to_string()),
            is_active: Some(false),
            ..UpdateUserRequest::default()
        }
        .into_patch(Some("$argon2id$hash".to_string()), Utc::now());

        assert!(patch.get("password").is_none());
        assert_eq!(patch["password_hash"], "$argon2id$hash");
        assert_eq!(patch["is_active"], false);
    }

    #[test]
    fn credentials_row_keeps_hash_out_of_user() {
        let row = json!({
            "id": 1, "phone_number": "09121234567", "full_name": "Ali Rezaei", "role": "Admin",
            "is_active": true, "created_at": "2024-01-01T00:00:00Z", "updated_at": null,
            "password_hash": "$argon2id$hash"
        });
        let credentials: UserCredentials = serde_json::from_value(row).unwrap();
        assert_eq!(credentials.user.role, UserRole::Admin);
        let public = serde_json::to_value(&credentials.user).unwrap();
        assert!(public.get("password_hash").is_none());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_database::DatabaseError;
use shared_models::error::AppError;

pub const MAX_TEXT_LENGTH: usize = 255;
pub const MAX_PHONE_LENGTH: usize = 20;

/// The clinic's single settings row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: i64,
    pub clinic_name: String,
    pub clinic_description: Option<String>,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub clinic_email: Option<String>,
    pub working_hours: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateSettingsRequest {
    pub clinic_name: String,
    pub clinic_description: Option<String>,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub clinic_email: Option<String>,
    pub working_hours: Option<String>,
}

impl Default for CreateSettingsRequest {
    /// Values written when settings are first read and none exist.
    fn default() -> Self {
        Self {
            clinic_name: "Clinic".to_string(),
            clinic_description: Some("Clinic management system".to_string()),
            clinic_address: Some("Clinic address".to_string()),
            clinic_phone: Some("021-12345678".to_string()),
            clinic_email: None,
            working_hours: Some("Saturday to Wednesday: 8 AM to 8 PM".to_string()),
        }
    }
}

impl CreateSettingsRequest {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.clinic_name.trim().is_empty() {
            return Err(SettingsError::ValidationError("Clinic name must not be empty".to_string()));
        }
        validate_lengths(
            Some(&self.clinic_name),
            self.clinic_phone.as_deref(),
            self.clinic_email.as_deref(),
            self.working_hours.as_deref(),
        )
    }

    pub fn into_row(self, now: DateTime<Utc>) -> Value {
        json!({
            "clinic_name": self.clinic_name.trim(),
            "clinic_description": self.clinic_description,
            "clinic_address": self.clinic_address,
            "clinic_phone": self.clinic_phone,
            "clinic_email": self.clinic_email,
            "working_hours": self.working_hours,
            "created_at": now,
            "updated_at": now,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub clinic_name: Option<String>,
    pub clinic_description: Option<String>,
    pub clinic_address: Option<String>,
    pub clinic_phone: Option<String>,
    pub clinic_email: Option<String>,
    pub working_hours: Option<String>,
}

impl UpdateSettingsRequest {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.clinic_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            return Err(SettingsError::ValidationError("Clinic name must not be empty".to_string()));
        }
        validate_lengths(
            self.clinic_name.as_deref(),
            self.clinic_phone.as_deref(),
            self.clinic_email.as_deref(),
            self.working_hours.as_deref(),
        )
    }

    pub fn into_patch(self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(name) = self.clinic_name {
            patch.insert("clinic_name".to_string(), json!(name.trim()));
        }
        if let Some(description) = self.clinic_description {
            patch.insert("clinic_description".to_string(), json!(description));
        }
        if let Some(address) = self.clinic_address {
            patch.insert("clinic_address".to_string(), json!(address));
        }
        if let Some(phone) = self.clinic_phone {
            patch.insert("clinic_phone".to_string(), json!(phone));
        }
        if let Some(email) = self.clinic_email {
            patch.insert("clinic_email".to_string(), json!(email));
        }
        if let Some(hours) = self.working_hours {
            patch.insert("working_hours".to_string(), json!(hours));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

fn validate_lengths(
    name: Option<&str>,
    phone: Option<&str>,
    email: Option<&str>,
    hours: Option<&str>,
) -> Result<(), SettingsError> {
    let too_long = |value: Option<&str>, max: usize| value.is_some_and(|v| v.chars().count() > max);

    if too_long(name, MAX_TEXT_LENGTH) {
        return Err(SettingsError::ValidationError(format!("Clinic name must be at most {} characters", MAX_TEXT_LENGTH)));
    }
    if too_long(phone, MAX_PHONE_LENGTH) {
        return Err(SettingsError::ValidationError(format!("Clinic phone must be at most {} characters", MAX_PHONE_LENGTH)));
    }
    if too_long(email, MAX_TEXT_LENGTH) {
        return Err(SettingsError::ValidationError(format!("Clinic email must be at most {} characters", MAX_TEXT_LENGTH)));
    }
    if too_long(hours, MAX_TEXT_LENGTH) {
        return Err(SettingsError::ValidationError(format!("Working hours must be at most {} characters", MAX_TEXT_LENGTH)));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings not found")]
    NotFound,

    #[error("Settings already exist, update them instead")]
    AlreadyExists,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::NotFound => AppError::NotFound(err.to_string()),
            SettingsError::AlreadyExists => AppError::BadRequest(err.to_string()),
            SettingsError::ValidationError(msg) => AppError::ValidationError(msg),
            SettingsError::Database(db) => db.into(),
        }
    }
}

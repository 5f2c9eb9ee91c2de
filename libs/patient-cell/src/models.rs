use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_database::DatabaseError;
use shared_models::embed::EmbeddedUser;
use shared_models::error::AppError;
use shared_utils::validation::{require_emergency_contact, require_national_code};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BloodType {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub user_id: i64,
    pub national_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<BloodType>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub user: Option<EmbeddedUser>,
}

impl Patient {
    pub fn full_name(&self) -> Option<String> {
        self.user.as_ref().map(|u| u.full_name.clone())
    }

    /// Whole years on `today`, when the birth date is known.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        self.date_of_birth.and_then(|dob| today.years_since(dob))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientResponse {
    #[serde(flatten)]
    pub patient: Patient,
    pub user_full_name: Option<String>,
    pub user_phone: Option<String>,
}

impl From<Patient> for PatientResponse {
    fn from(patient: Patient) -> Self {
        let user_full_name = patient.user.as_ref().map(|u| u.full_name.clone());
        let user_phone = patient.user.as_ref().map(|u| u.phone_number.clone());
        Self { patient, user_full_name, user_phone }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub user_id: i64,
    pub national_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<BloodType>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,
}

impl CreatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        validate_identifiers(self.national_code.as_deref(), self.emergency_contact.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub national_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_type: Option<BloodType>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<String>,
}

impl UpdatePatientRequest {
    pub fn validate(&self) -> Result<(), PatientError> {
        validate_identifiers(self.national_code.as_deref(), self.emergency_contact.as_deref())
    }

    pub fn into_patch(self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(national_code) = self.national_code {
            patch.insert("national_code".to_string(), json!(national_code));
        }
        if let Some(date_of_birth) = self.date_of_birth {
            patch.insert("date_of_birth".to_string(), json!(date_of_birth));
        }
        if let Some(gender) = self.gender {
            patch.insert("gender".to_string(), json!(gender));
        }
        if let Some(blood_type) = self.blood_type {
            patch.insert("blood_type".to_string(), json!(blood_type));
        }
        if let Some(address) = self.address {
            patch.insert("address".to_string(), json!(address));
        }
        if let Some(emergency_contact) = self.emergency_contact {
            patch.insert("emergency_contact".to_string(), json!(emergency_contact));
        }
        if let Some(medical_history) = self.medical_history {
            patch.insert("medical_history".to_string(), json!(medical_history));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

fn validate_identifiers(national_code: Option<&str>, emergency_contact: Option<&str>) -> Result<(), PatientError> {
    if let Some(code) = national_code {
        require_national_code(code).map_err(|e| PatientError::ValidationError(e.to_string()))?;
    }
    if let Some(contact) = emergency_contact {
        require_emergency_contact(contact).map_err(|e| PatientError::ValidationError(e.to_string()))?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("This user is already registered as a patient")]
    AlreadyRegistered,

    #[error("National code is already registered")]
    DuplicateNationalCode,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound | PatientError::UserNotFound => AppError::NotFound(err.to_string()),
            PatientError::AlreadyRegistered | PatientError::DuplicateNationalCode => {
                AppError::BadRequest(err.to_string())
            }
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::Database(db) => db.into(),
        }
    }
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_database::DatabaseError;
use shared_models::embed::EmbeddedPatient;
use shared_models::error::AppError;

pub const MAX_COMPANY_LENGTH: usize = 255;
pub const MAX_CODE_LENGTH: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insurance {
    pub id: i64,
    pub patient_id: i64,
    pub insurance_company: String,
    pub policy_number: String,
    pub group_number: Option<String>,
    pub coverage_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub patient: Option<EmbeddedPatient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceResponse {
    #[serde(flatten)]
    pub insurance: Insurance,
    pub patient_name: Option<String>,
}

impl From<Insurance> for InsuranceResponse {
    fn from(insurance: Insurance) -> Self {
        let patient_name = insurance.patient.as_ref().and_then(EmbeddedPatient::full_name);
        Self { insurance, patient_name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInsuranceRequest {
    pub patient_id: i64,
    pub insurance_company: String,
    pub policy_number: String,
    pub group_number: Option<String>,
    pub coverage_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl CreateInsuranceRequest {
    pub fn validate(&self) -> Result<(), InsuranceError> {
        validate_text("Insurance company", &self.insurance_company, MAX_COMPANY_LENGTH, true)?;
        validate_text("Policy number", &self.policy_number, MAX_CODE_LENGTH, true)?;
        validate_optional("Group number", self.group_number.as_deref())?;
        validate_optional("Coverage type", self.coverage_type.as_deref())?;
        validate_period(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInsuranceRequest {
    pub insurance_company: Option<String>,
    pub policy_number: Option<String>,
    pub group_number: Option<String>,
    pub coverage_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl UpdateInsuranceRequest {
    /// Checks the fields on their own and the period they form with `current`.
    pub fn validate_against(&self, current: &Insurance) -> Result<(), InsuranceError> {
        if let Some(company) = &self.insurance_company {
            validate_text("Insurance company", company, MAX_COMPANY_LENGTH, true)?;
        }
        if let Some(policy) = &self.policy_number {
            validate_text("Policy number", policy, MAX_CODE_LENGTH, true)?;
        }
        validate_optional("Group number", self.group_number.as_deref())?;
        validate_optional("Coverage type", self.coverage_type.as_deref())?;
        validate_period(
            self.start_date.or(current.start_date),
            self.end_date.or(current.end_date),
        )
    }

    pub fn into_patch(self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(company) = self.insurance_company {
            patch.insert("insurance_company".to_string(), json!(company.trim()));
        }
        if let Some(policy) = self.policy_number {
            patch.insert("policy_number".to_string(), json!(policy.trim()));
        }
        if let Some(group) = self.group_number {
            patch.insert("group_number".to_string(), json!(group));
        }
        if let Some(coverage) = self.coverage_type {
            patch.insert("coverage_type".to_string(), json!(coverage));
        }
        if let Some(start) = self.start_date {
            patch.insert("start_date".to_string(), json!(start));
        }
        if let Some(end) = self.end_date {
            patch.insert("end_date".to_string(), json!(end));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

fn validate_text(field: &str, value: &str, max: usize, required: bool) -> Result<(), InsuranceError> {
    let length = value.trim().chars().count();
    if required && length == 0 {
        return Err(InsuranceError::ValidationError(format!("{} must not be empty", field)));
    }
    if length > max {
        return Err(InsuranceError::ValidationError(format!("{} must be at most {} characters", field, max)));
    }
    Ok(())
}

fn validate_optional(field: &str, value: Option<&str>) -> Result<(), InsuranceError> {
    match value {
        Some(v) => validate_text(field, v, MAX_CODE_LENGTH, false),
        None => Ok(()),
    }
}

fn validate_period(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), InsuranceError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(InsuranceError::ValidationError("End date cannot be before start date".to_string()));
        }
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum InsuranceError {
    #[error("Insurance not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("This patient already has an insurance record")]
    AlreadyInsured,

    #[error("Policy number is already registered")]
    DuplicatePolicy,

    #[error("You can only view your own insurance")]
    AccessDenied,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<InsuranceError> for AppError {
    fn from(err: InsuranceError) -> Self {
        match err {
            InsuranceError::NotFound | InsuranceError::PatientNotFound => AppError::NotFound(err.to_string()),
            InsuranceError::AlreadyInsured | InsuranceError::DuplicatePolicy => AppError::BadRequest(err.to_string()),
            InsuranceError::AccessDenied => AppError::Forbidden(err.to_string()),
            InsuranceError::ValidationError(msg) => AppError::ValidationError(msg),
            InsuranceError::Database(db) => db.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Insurance {
        Insurance {
            id: 1,
            patient_id: 4,
            insurance_company: "Tamin".to_string(),
            policy_number: "P-100".to_string(),
            group_number: None,
            coverage_type: None,
            start_date: start,
            end_date: end,
            created_at: Utc::now(),
            updated_at: None,
            patient: None,
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        let request = CreateInsuranceRequest {
            patient_id: 4,
            insurance_company: "Tamin".to_string(),
            policy_number: "P-100".to_string(),
            group_number: None,
            coverage_type: None,
            start_date: Some(date(2024, 6, 1)),
            end_date: Some(date(2024, 5, 31)),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn partial_update_is_checked_against_stored_period() {
        let current = stored(Some(date(2024, 1, 1)), Some(date(2024, 12, 31)));

        let moves_end_too_early = UpdateInsuranceRequest {
            end_date: Some(date(2023, 12, 1)),
            ..UpdateInsuranceRequest::default()
        };
        assert!(moves_end_too_early.validate_against(&current).is_err());

        let extends = UpdateInsuranceRequest {
            end_date: Some(date(2025, 12, 31)),
            ..UpdateInsuranceRequest::default()
        };
        assert!(extends.validate_against(&current).is_ok());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_database::DatabaseError;
use shared_models::datetime::{deserialize_optional_timestamp, deserialize_timestamp};
use shared_models::embed::EmbeddedPatient;
use shared_models::error::AppError;
use shared_models::pagination::Pagination;

pub const MAX_FACTOR_TYPE_LENGTH: usize = 100;
pub const MAX_LOT_NUMBER_LENGTH: usize = 100;
pub const MAX_ADMINISTERED_BY_LENGTH: usize = 255;

/// One administration of clotting factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Factor {
    pub id: i64,
    pub patient_id: i64,
    pub factor_type: String,
    pub units_administered: i32,
    pub administration_date: DateTime<Utc>,
    pub lot_number: Option<String>,
    pub administered_by: Option<String>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub patient: Option<EmbeddedPatient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorResponse {
    #[serde(flatten)]
    pub factor: Factor,
    pub patient_name: Option<String>,
}

impl From<Factor> for FactorResponse {
    fn from(factor: Factor) -> Self {
        let patient_name = factor.patient.as_ref().and_then(EmbeddedPatient::full_name);
        Self { factor, patient_name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFactorRequest {
    pub patient_id: i64,
    pub factor_type: String,
    pub units_administered: i32,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub administration_date: DateTime<Utc>,
    pub lot_number: Option<String>,
    pub administered_by: Option<String>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
}

impl CreateFactorRequest {
    pub fn validate(&self) -> Result<(), FactorError> {
        validate_factor_type(&self.factor_type)?;
        validate_units(self.units_administered)?;
        validate_details(self.lot_number.as_deref(), self.administered_by.as_deref(), self.cost)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFactorRequest {
    pub factor_type: Option<String>,
    pub units_administered: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub administration_date: Option<DateTime<Utc>>,
    pub lot_number: Option<String>,
    pub administered_by: Option<String>,
    pub notes: Option<String>,
    pub cost: Option<f64>,
}

impl UpdateFactorRequest {
    pub fn validate(&self) -> Result<(), FactorError> {
        if let Some(factor_type) = &self.factor_type {
            validate_factor_type(factor_type)?;
        }
        if let Some(units) = self.units_administered {
            validate_units(units)?;
        }
        validate_details(self.lot_number.as_deref(), self.administered_by.as_deref(), self.cost)
    }

    pub fn into_patch(self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(factor_type) = self.factor_type {
            patch.insert("factor_type".to_string(), json!(factor_type.trim()));
        }
        if let Some(units) = self.units_administered {
            patch.insert("units_administered".to_string(), json!(units));
        }
        if let Some(date) = self.administration_date {
            patch.insert("administration_date".to_string(), json!(date));
        }
        if let Some(lot_number) = self.lot_number {
            patch.insert("lot_number".to_string(), json!(lot_number));
        }
        if let Some(administered_by) = self.administered_by {
            patch.insert("administered_by".to_string(), json!(administered_by));
        }
        if let Some(notes) = self.notes {
            patch.insert("notes".to_string(), json!(notes));
        }
        if let Some(cost) = self.cost {
            patch.insert("cost".to_string(), json!(cost));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FactorListQuery {
    pub patient_id: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl FactorListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination { skip: self.skip, limit: self.limit }
    }
}

fn validate_factor_type(factor_type: &str) -> Result<(), FactorError> {
    let length = factor_type.trim().chars().count();
    if length == 0 || length > MAX_FACTOR_TYPE_LENGTH {
        return Err(FactorError::ValidationError(format!(
            "Factor type must be between 1 and {} characters",
            MAX_FACTOR_TYPE_LENGTH
        )));
    }
    Ok(())
}

fn validate_units(units: i32) -> Result<(), FactorError> {
    if units <= 0 {
        return Err(FactorError::ValidationError("Units administered must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_details(lot_number: Option<&str>, administered_by: Option<&str>, cost: Option<f64>) -> Result<(), FactorError> {
    if lot_number.is_some_and(|lot| lot.chars().count() > MAX_LOT_NUMBER_LENGTH) {
        return Err(FactorError::ValidationError(format!(
            "Lot number must be at most {} characters",
            MAX_LOT_NUMBER_LENGTH
        )));
    }
    if administered_by.is_some_and(|by| by.chars().count() > MAX_ADMINISTERED_BY_LENGTH) {
        return Err(FactorError::ValidationError(format!(
            "Administered by must be at most {} characters",
            MAX_ADMINISTERED_BY_LENGTH
        )));
    }
    if cost.is_some_and(|c| !c.is_finite() || c < 0.0) {
        return Err(FactorError::ValidationError("Cost cannot be negative".to_string()));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum FactorError {
    #[error("Factor record not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("You can only view your own factor records")]
    AccessDenied,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<FactorError> for AppError {
    fn from(err: FactorError) -> Self {
        match err {
            FactorError::NotFound | FactorError::PatientNotFound => AppError::NotFound(err.to_string()),
            FactorError::AccessDenied => AppError::Forbidden(err.to_string()),
            FactorError::ValidationError(msg) => AppError::ValidationError(msg),
            FactorError::Database(db) => db.into(),
        }
    }
}

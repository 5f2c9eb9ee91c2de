use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_database::DatabaseError;
use shared_models::error::AppError;
use shared_models::pagination::Pagination;

pub const MAX_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    pub name: String,
    pub generic_name: Option<String>,
    pub manufacturer: Option<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub stock_quantity: i32,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMedicationRequest {
    pub name: String,
    pub generic_name: Option<String>,
    pub manufacturer: Option<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub stock_quantity: i32,
    pub description: Option<String>,
}

impl CreateMedicationRequest {
    pub fn validate(&self) -> Result<(), MedicationError> {
        validate_name(&self.name)?;
        validate_amounts(self.unit_price, Some(self.stock_quantity))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicationRequest {
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub manufacturer: Option<String>,
    pub dosage_form: Option<String>,
    pub strength: Option<String>,
    pub unit_price: Option<f64>,
    pub stock_quantity: Option<i32>,
    pub description: Option<String>,
}

impl UpdateMedicationRequest {
    pub fn validate(&self) -> Result<(), MedicationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        validate_amounts(self.unit_price, self.stock_quantity)
    }

    pub fn into_patch(self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(name) = self.name {
            patch.insert("name".to_string(), json!(name.trim()));
        }
        if let Some(generic_name) = self.generic_name {
            patch.insert("generic_name".to_string(), json!(generic_name));
        }
        if let Some(manufacturer) = self.manufacturer {
            patch.insert("manufacturer".to_string(), json!(manufacturer));
        }
        if let Some(dosage_form) = self.dosage_form {
            patch.insert("dosage_form".to_string(), json!(dosage_form));
        }
        if let Some(strength) = self.strength {
            patch.insert("strength".to_string(), json!(strength));
        }
        if let Some(unit_price) = self.unit_price {
            patch.insert("unit_price".to_string(), json!(unit_price));
        }
        if let Some(stock_quantity) = self.stock_quantity {
            patch.insert("stock_quantity".to_string(), json!(stock_quantity));
        }
        if let Some(description) = self.description {
            patch.insert("description".to_string(), json!(description));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicationListQuery {
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl MedicationListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination { skip: self.skip, limit: self.limit }
    }

    /// Trimmed search term, `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn validate_name(name: &str) -> Result<(), MedicationError> {
    let length = name.trim().chars().count();
    if length == 0 || length > MAX_NAME_LENGTH {
        return Err(MedicationError::ValidationError(format!(
            "Medication name must be between 1 and {} characters",
            MAX_NAME_LENGTH
        )));
    }
    Ok(())
}

fn validate_amounts(unit_price: Option<f64>, stock_quantity: Option<i32>) -> Result<(), MedicationError> {
    if unit_price.is_some_and(|price| !price.is_finite() || price < 0.0) {
        return Err(MedicationError::ValidationError("Unit price cannot be negative".to_string()));
    }
    if stock_quantity.is_some_and(|stock| stock < 0) {
        return Err(MedicationError::ValidationError("Stock quantity cannot be negative".to_string()));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum MedicationError {
    #[error("Medication not found")]
    NotFound,

    #[error("A medication with this name already exists")]
    DuplicateName,

    #[error("Medication is referenced by prescriptions")]
    InUse,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<MedicationError> for AppError {
    fn from(err: MedicationError) -> Self {
        match err {
            MedicationError::NotFound => AppError::NotFound(err.to_string()),
            MedicationError::DuplicateName | MedicationError::InUse => AppError::BadRequest(err.to_string()),
            MedicationError::ValidationError(msg) => AppError::ValidationError(msg),
            MedicationError::Database(db) => db.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create(name: &str, price: Option<f64>, stock: i32) -> CreateMedicationRequest {
        CreateMedicationRequest {
            name: name.to_string(),
            generic_name: None,
            manufacturer: None,
            dosage_form: None,
            strength: None,
            unit_price: price,
            stock_quantity: stock,
            description: None,
        }
    }

    #[test]
    fn rejects_negative_amounts_and_blank_names() {
        assert!(create("Factor VIII", Some(12.5), 10).validate().is_ok());
        assert!(create("Factor VIII", None, 0).validate().is_ok());
        assert!(create("Factor VIII", Some(-1.0), 0).validate().is_err());
        assert!(create("Factor VIII", None, -3).validate().is_err());
        assert!(create("  ", None, 0).validate().is_err());
    }

    #[test]
    fn stock_defaults_to_zero() {
        let request: CreateMedicationRequest = serde_json::from_value(json!({ "name": "Tranexamic acid" })).unwrap();
        assert_eq!(request.stock_quantity, 0);
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = MedicationListQuery { search: Some("  ".to_string()), ..Default::default() };
        assert_eq!(query.search_term(), None);
    }

    #[test]
    fn patch_only_carries_given_fields() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let patch = UpdateMedicationRequest {
            stock_quantity: Some(40),
            ..UpdateMedicationRequest::default()
        }
        .into_patch(now);

        assert_eq!(patch["stock_quantity"], 40);
        assert!(!patch.contains_key("name"));
        assert_eq!(patch.len(), 2);
    }
}

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use shared_database::DatabaseError;
use shared_models::embed::EmbeddedPatient;
use shared_models::error::AppError;
use shared_models::pagination::Pagination;

pub const MAX_DOCTOR_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedMedication {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionItem {
    pub id: i64,
    pub prescription_id: i64,
    pub medication_id: i64,
    pub dosage: String,
    pub duration: Option<String>,
    pub quantity: Option<i32>,
    pub instructions: Option<String>,
    #[serde(default, skip_serializing)]
    pub medication: Option<EmbeddedMedication>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<PrescriptionItem>,
    #[serde(default, skip_serializing)]
    pub patient: Option<EmbeddedPatient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionItemResponse {
    #[serde(flatten)]
    pub item: PrescriptionItem,
    pub medication_name: Option<String>,
}

impl From<PrescriptionItem> for PrescriptionItemResponse {
    fn from(item: PrescriptionItem) -> Self {
        let medication_name = item.medication.as_ref().map(|m| m.name.clone());
        Self { item, medication_name }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionResponse {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<PrescriptionItemResponse>,
    pub patient_name: Option<String>,
}

impl From<Prescription> for PrescriptionResponse {
    fn from(prescription: Prescription) -> Self {
        let patient_name = prescription.patient.as_ref().and_then(EmbeddedPatient::full_name);
        Self {
            id: prescription.id,
            patient_id: prescription.patient_id,
            doctor_name: prescription.doctor_name,
            diagnosis: prescription.diagnosis,
            notes: prescription.notes,
            created_at: prescription.created_at,
            updated_at: prescription.updated_at,
            items: prescription.items.into_iter().map(Into::into).collect(),
            patient_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionItem {
    pub medication_id: i64,
    pub dosage: String,
    pub duration: Option<String>,
    pub quantity: Option<i32>,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub patient_id: i64,
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<CreatePrescriptionItem>,
}

impl CreatePrescriptionRequest {
    pub fn validate(&self) -> Result<(), PrescriptionError> {
        if self.items.is_empty() {
            return Err(PrescriptionError::ValidationError(
                "A prescription needs at least one medication".to_string(),
            ));
        }
        validate_doctor_name(self.doctor_name.as_deref())?;

        for item in &self.items {
            if item.dosage.trim().is_empty() {
                return Err(PrescriptionError::ValidationError("Dosage must not be empty".to_string()));
            }
            if item.quantity.is_some_and(|q| q < 1) {
                return Err(PrescriptionError::ValidationError("Quantity must be at least 1".to_string()));
            }
        }
        Ok(())
    }

    /// Distinct medication ids in ascending order.
    pub fn medication_ids(&self) -> Vec<i64> {
        self.items
            .iter()
            .map(|item| item.medication_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Item rows for `prescription_id`, in request order.
    pub fn item_rows(&self, prescription_id: i64) -> Value {
        Value::Array(
            self.items
                .iter()
                .map(|item| {
                    json!({
                        "prescription_id": prescription_id,
                        "medication_id": item.medication_id,
                        "dosage": item.dosage.trim(),
                        "duration": item.duration,
                        "quantity": item.quantity,
                        "instructions": item.instructions,
                    })
                })
                .collect(),
        )
    }
}

/// Only the header fields can change; items are fixed once written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePrescriptionRequest {
    pub doctor_name: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
}

impl UpdatePrescriptionRequest {
    pub fn validate(&self) -> Result<(), PrescriptionError> {
        validate_doctor_name(self.doctor_name.as_deref())
    }

    pub fn into_patch(self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(doctor_name) = self.doctor_name {
            patch.insert("doctor_name".to_string(), json!(doctor_name));
        }
        if let Some(diagnosis) = self.diagnosis {
            patch.insert("diagnosis".to_string(), json!(diagnosis));
        }
        if let Some(notes) = self.notes {
            patch.insert("notes".to_string(), json!(notes));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrescriptionListQuery {
    pub patient_id: Option<i64>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PrescriptionListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination { skip: self.skip, limit: self.limit }
    }
}

fn validate_doctor_name(name: Option<&str>) -> Result<(), PrescriptionError> {
    if name.is_some_and(|n| n.chars().count() > MAX_DOCTOR_NAME_LENGTH) {
        return Err(PrescriptionError::ValidationError(format!(
            "Doctor name must be at most {} characters",
            MAX_DOCTOR_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Attaches names to freshly inserted items, which come back without embeds.
pub fn attach_medication_names(items: &mut [PrescriptionItem], names: &HashMap<i64, String>) {
    for item in items {
        if let Some(name) = names.get(&item.medication_id) {
            item.medication = Some(EmbeddedMedication { name: name.clone() });
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrescriptionError {
    #[error("Prescription not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Medication {0} not found")]
    MedicationNotFound(i64),

    #[error("You can only view your own prescriptions")]
    AccessDenied,

    #[error("{0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<PrescriptionError> for AppError {
    fn from(err: PrescriptionError) -> Self {
        match err {
            PrescriptionError::NotFound
            | PrescriptionError::PatientNotFound
            | PrescriptionError::MedicationNotFound(_) => AppError::NotFound(err.to_string()),
            PrescriptionError::AccessDenied => AppError::Forbidden(err.to_string()),
            PrescriptionError::ValidationError(msg) => AppError::ValidationError(msg),
            PrescriptionError::Database(db) => db.into(),
        }
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use shared_database::DatabaseError;
use shared_models::datetime::{deserialize_optional_timestamp, deserialize_timestamp};
use shared_models::embed::EmbeddedPatient;
use shared_models::error::AppError;
use shared_models::pagination::Pagination;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Canceled,
    ];

    /// Pending and confirmed visits hold their slot.
    pub fn is_active(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Completed => "Completed",
            AppointmentStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_date: DateTime<Utc>,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing)]
    pub patient: Option<EmbeddedPatient>,
}

/// The columns the conflict check needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledSlot {
    pub id: i64,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: i64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub appointment_date: DateTime<Utc>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub appointment_date: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl UpdateAppointmentRequest {
    pub fn status_only(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Only the fields present in the request end up in the patch.
    pub fn into_patch(self, now: DateTime<Utc>) -> Map<String, Value> {
        let mut patch = Map::new();

        if let Some(appointment_date) = self.appointment_date {
            patch.insert("appointment_date".to_string(), json!(appointment_date));
        }
        if let Some(status) = self.status {
            patch.insert("status".to_string(), json!(status));
        }
        if let Some(reason) = self.reason {
            patch.insert("reason".to_string(), json!(reason));
        }
        if let Some(notes) = self.notes {
            patch.insert("notes".to_string(), json!(notes));
        }

        patch.insert("updated_at".to_string(), json!(now));
        patch
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status_filter: Option<AppointmentStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl AppointmentListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            skip: self.skip,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentResponse {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_date: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appointment: Appointment) -> Self {
        let patient_name = appointment.patient.as_ref().and_then(EmbeddedPatient::full_name);
        let patient_phone = appointment.patient.as_ref().and_then(EmbeddedPatient::phone_number);

        Self {
            id: appointment.id,
            patient_id: appointment.patient_id,
            appointment_date: appointment.appointment_date,
            status: appointment.status,
            reason: appointment.reason,
            notes: appointment.notes,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
            patient_name,
            patient_phone,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Another appointment is already scheduled at {existing_date}")]
    Conflict {
        existing_id: Option<i64>,
        existing_date: String,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            AppointmentError::PatientNotFound => AppError::NotFound("Patient not found".to_string()),
            conflict @ AppointmentError::Conflict { .. } => AppError::Conflict(conflict.to_string()),
            AppointmentError::Database(db) => db.into(),
        }
    }
}

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};
use shared_models::embed::PATIENT_EMBED;
use shared_models::pagination::Pagination;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, CreateAppointmentRequest, ScheduledSlot,
    UpdateAppointmentRequest,
};
use crate::services::conflict::{conflict_query, find_conflict};
use crate::services::lifecycle::{requires_conflict_check, resulting_slot};

const TABLE: &str = "appointments";

/// Appointment lifecycle manager.
///
/// Every conflict-checked write runs while holding `schedule_gate`, so the
/// check and the write are never interleaved with another scheduling call in
/// this process. Across processes the exclusion constraint in the reference
/// schema rejects the second write; that rejection is reported as a conflict.
pub struct AppointmentService {
    supabase: SupabaseClient,
    schedule_gate: Mutex<()>,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            schedule_gate: Mutex::new(()),
        }
    }

    pub async fn schedule(&self, request: CreateAppointmentRequest) -> Result<Appointment, AppointmentError> {
        debug!("Scheduling appointment for patient {} at {}", request.patient_id, request.appointment_date);

        let patient_filter = format!("id=eq.{}", request.patient_id);
        if !self.supabase.exists("patients", &patient_filter).await? {
            warn!("Cannot schedule for unknown patient {}", request.patient_id);
            return Err(AppointmentError::PatientNotFound);
        }

        let _gate = self.schedule_gate.lock().await;
        self.ensure_slot_free(request.appointment_date, None).await?;

        let now = Utc::now();
        let row = json!({
            "patient_id": request.patient_id,
            "appointment_date": request.appointment_date,
            "status": AppointmentStatus::Pending,
            "reason": request.reason,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now,
        });

        let appointment: Appointment = self
            .supabase
            .insert(TABLE, row)
            .await
            .map_err(|e| slot_taken_or(e, request.appointment_date))?;

        info!("Appointment {} scheduled at {}", appointment.id, appointment.appointment_date);
        Ok(appointment)
    }

    /// Newest first, optionally narrowed to one status.
    pub async fn list(
        &self,
        status_filter: Option<AppointmentStatus>,
        pagination: Pagination,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let mut query = format!("select=*,{}&order=appointment_date.desc", PATIENT_EMBED);
        if let Some(status) = status_filter {
            query.push_str(&format!("&status=eq.{}", status));
        }
        query.push('&');
        query.push_str(&pagination.to_query());

        Ok(self.supabase.select(TABLE, &query).await?)
    }

    pub async fn list_for_patient(
        &self,
        patient_id: i64,
        pagination: Pagination,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let query = format!(
            "select=*,{}&patient_id=eq.{}&order=appointment_date.desc&{}",
            PATIENT_EMBED,
            patient_id,
            pagination.to_query()
        );
        Ok(self.supabase.select(TABLE, &query).await?)
    }

    /// Appointments of the patient record owned by `user_id`.
    pub async fn list_for_user(&self, user_id: i64, pagination: Pagination) -> Result<Vec<Appointment>, AppointmentError> {
        let patient_id = self
            .supabase
            .id_of("patients", &format!("user_id=eq.{}", user_id))
            .await?
            .ok_or(AppointmentError::PatientNotFound)?;

        self.list_for_patient(patient_id, pagination).await
    }

    pub async fn get(&self, appointment_id: i64) -> Result<Appointment, AppointmentError> {
        let query = format!("select=*,{}&id=eq.{}", PATIENT_EMBED, appointment_id);
        self.supabase
            .select_one(TABLE, &query)
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Generic patch. Any status may follow any other, but a result that would
    /// occupy a slot it did not occupy before passes the conflict check again.
    pub async fn update(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.get(appointment_id).await?;
        debug!("Updating appointment {} (currently {})", appointment_id, current.status);

        if requires_conflict_check(&current, &request) {
            let (next_date, _) = resulting_slot(&current, &request);
            let _gate = self.schedule_gate.lock().await;
            self.ensure_slot_free(next_date, Some(appointment_id)).await?;
            return self.apply_patch(appointment_id, request, Some(next_date)).await;
        }

        self.apply_patch(appointment_id, request, None).await
    }

    pub async fn update_status(
        &self,
        appointment_id: i64,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        self.update(appointment_id, UpdateAppointmentRequest::status_only(status)).await
    }

    pub async fn delete(&self, appointment_id: i64) -> Result<(), AppointmentError> {
        let removed = self
            .supabase
            .delete(TABLE, &format!("id=eq.{}", appointment_id))
            .await?;

        if removed == 0 {
            return Err(AppointmentError::NotFound);
        }

        info!("Appointment {} deleted", appointment_id);
        Ok(())
    }

    async fn ensure_slot_free(&self, date: DateTime<Utc>, exclude_id: Option<i64>) -> Result<(), AppointmentError> {
        let candidates: Vec<ScheduledSlot> = self
            .supabase
            .select(TABLE, &conflict_query(date, exclude_id))
            .await?;

        match find_conflict(date, &candidates, exclude_id) {
            Some(existing) => Err(AppointmentError::Conflict {
                existing_id: Some(existing.id),
                existing_date: existing.appointment_date.to_rfc3339_opts(SecondsFormat::Secs, true),
            }),
            None => Ok(()),
        }
    }

    async fn apply_patch(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
        checked_date: Option<DateTime<Utc>>,
    ) -> Result<Appointment, AppointmentError> {
        let patch = request.into_patch(Utc::now());
        let filter = format!("id=eq.{}&select=*,{}", appointment_id, PATIENT_EMBED);

        let updated: Vec<Appointment> = self
            .supabase
            .update(TABLE, &filter, Value::Object(patch))
            .await
            .map_err(|e| match checked_date {
                Some(date) => slot_taken_or(e, date),
                None => e.into(),
            })?;

        let appointment = updated.into_iter().next().ok_or(AppointmentError::NotFound)?;
        info!("Appointment {} updated (status {})", appointment.id, appointment.status);
        Ok(appointment)
    }
}

/// Storage-level exclusion violations surface as the same conflict as the in-process check.
fn slot_taken_or(err: DatabaseError, date: DateTime<Utc>) -> AppointmentError {
    if err.is_exclusion_violation() {
        warn!("Storage rejected overlapping appointment at {}", date);
        AppointmentError::Conflict {
            existing_id: None,
            existing_date: date.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    } else {
        err.into()
    }
}

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{DatabaseError, SupabaseClient};
use shared_models::embed::USER_EMBED;
use shared_models::pagination::Pagination;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

const TABLE: &str = "patients";

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(&self, request: CreatePatientRequest) -> Result<Patient, PatientError> {
        debug!("Creating patient record for user {}", request.user_id);
        request.validate()?;

        if !self.supabase.exists("users", &format!("id=eq.{}", request.user_id)).await? {
            return Err(PatientError::UserNotFound);
        }

        if self.find_by_user(request.user_id).await?.is_some() {
            warn!("User {} already has a patient record", request.user_id);
            return Err(PatientError::AlreadyRegistered);
        }

        let row = json!({
            "user_id": request.user_id,
            "national_code": request.national_code,
            "date_of_birth": request.date_of_birth,
            "gender": request.gender,
            "blood_type": request.blood_type,
            "address": request.address,
            "emergency_contact": request.emergency_contact,
            "medical_history": request.medical_history,
            "created_at": Utc::now(),
        });

        let patient: Patient = self.supabase.insert(TABLE, row).await.map_err(duplicate_or)?;
        info!("Patient {} created for user {}", patient.id, patient.user_id);
        Ok(patient)
    }

    pub async fn list_patients(&self, pagination: Pagination) -> Result<Vec<Patient>, PatientError> {
        let query = format!("select=*,{}&order=id.asc&{}", USER_EMBED, pagination.to_query());
        Ok(self.supabase.select(TABLE, &query).await?)
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Patient, PatientError> {
        let query = format!("select=*,{}&id=eq.{}", USER_EMBED, patient_id);
        self.supabase
            .select_one(TABLE, &query)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Option<Patient>, PatientError> {
        let query = format!("select=*,{}&user_id=eq.{}", USER_EMBED, user_id);
        Ok(self.supabase.select_one(TABLE, &query).await?)
    }

    /// The caller's own patient record, or `NotFound`.
    pub async fn patient_for_user(&self, user_id: i64) -> Result<Patient, PatientError> {
        self.find_by_user(user_id).await?.ok_or(PatientError::NotFound)
    }

    pub async fn patient_exists(&self, patient_id: i64) -> Result<bool, PatientError> {
        Ok(self.supabase.exists(TABLE, &format!("id=eq.{}", patient_id)).await?)
    }

    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient {}", patient_id);
        request.validate()?;

        let patch = request.into_patch(Utc::now());
        let filter = format!("id=eq.{}&select=*,{}", patient_id, USER_EMBED);

        let updated: Vec<Patient> = self
            .supabase
            .update(TABLE, &filter, Value::Object(patch))
            .await
            .map_err(duplicate_or)?;

        updated.into_iter().next().ok_or(PatientError::NotFound)
    }

    /// Appointments, prescriptions, factors and insurance go with the patient.
    pub async fn delete_patient(&self, patient_id: i64) -> Result<(), PatientError> {
        let removed = self.supabase.delete(TABLE, &format!("id=eq.{}", patient_id)).await?;
        if removed == 0 {
            return Err(PatientError::NotFound);
        }
        info!("Patient {} deleted", patient_id);
        Ok(())
    }
}

fn duplicate_or(err: DatabaseError) -> PatientError {
    if err.is_unique_violation() {
        match &err {
            DatabaseError::Conflict { message, .. } if message.contains("user_id") => PatientError::AlreadyRegistered,
            _ => PatientError::DuplicateNationalCode,
        }
    } else {
        err.into()
    }
}

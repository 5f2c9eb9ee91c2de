use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{supabase::encode_value, DatabaseError, SupabaseClient};
use shared_models::auth::AuthUser;
use shared_models::embed::PATIENT_EMBED;
use shared_models::pagination::Pagination;

use crate::models::{CreateInsuranceRequest, Insurance, InsuranceError, UpdateInsuranceRequest};

const TABLE: &str = "insurances";

pub struct InsuranceService {
    supabase: SupabaseClient,
}

impl InsuranceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_insurance(&self, request: CreateInsuranceRequest) -> Result<Insurance, InsuranceError> {
        request.validate()?;
        debug!("Creating insurance for patient {}", request.patient_id);

        if !self.supabase.exists("patients", &format!("id=eq.{}", request.patient_id)).await? {
            return Err(InsuranceError::PatientNotFound);
        }
        if self.supabase.exists(TABLE, &format!("patient_id=eq.{}", request.patient_id)).await? {
            warn!("Patient {} is already insured", request.patient_id);
            return Err(InsuranceError::AlreadyInsured);
        }
        let policy_filter = format!("policy_number=eq.{}", encode_value(request.policy_number.trim()));
        if self.supabase.exists(TABLE, &policy_filter).await? {
            return Err(InsuranceError::DuplicatePolicy);
        }

        let now = Utc::now();
        let row = json!({
            "patient_id": request.patient_id,
            "insurance_company": request.insurance_company.trim(),
            "policy_number": request.policy_number.trim(),
            "group_number": request.group_number,
            "coverage_type": request.coverage_type,
            "start_date": request.start_date,
            "end_date": request.end_date,
            "created_at": now,
            "updated_at": now,
        });

        let insurance: Insurance = self.supabase.insert(TABLE, row).await.map_err(duplicate_or)?;
        info!("Insurance {} created for patient {}", insurance.id, insurance.patient_id);
        Ok(insurance)
    }

    pub async fn list_insurances(&self, pagination: Pagination) -> Result<Vec<Insurance>, InsuranceError> {
        let query = format!("select=*,{}&order=id.asc&{}", PATIENT_EMBED, pagination.to_query());
        Ok(self.supabase.select(TABLE, &query).await?)
    }

    /// The caller's own insurance. Missing patient record or insurance is `NotFound`.
    pub async fn insurance_for_user(&self, user_id: i64) -> Result<Insurance, InsuranceError> {
        let patient_id = self
            .supabase
            .id_of("patients", &format!("user_id=eq.{}", user_id))
            .await?
            .ok_or(InsuranceError::PatientNotFound)?;

        let query = format!("select=*,{}&patient_id=eq.{}", PATIENT_EMBED, patient_id);
        self.supabase
            .select_one(TABLE, &query)
            .await?
            .ok_or(InsuranceError::NotFound)
    }

    pub async fn get_insurance(&self, insurance_id: i64) -> Result<Insurance, InsuranceError> {
        let query = format!("select=*,{}&id=eq.{}", PATIENT_EMBED, insurance_id);
        self.supabase
            .select_one(TABLE, &query)
            .await?
            .ok_or(InsuranceError::NotFound)
    }

    pub async fn get_visible_to(&self, user: &AuthUser, insurance_id: i64) -> Result<Insurance, InsuranceError> {
        let insurance = self.get_insurance(insurance_id).await?;
        if user.is_patient() {
            let own = self.supabase.id_of("patients", &format!("user_id=eq.{}", user.id)).await?;
            if own != Some(insurance.patient_id) {
                warn!("User {} denied access to insurance {}", user.id, insurance_id);
                return Err(InsuranceError::AccessDenied);
            }
        }
        Ok(insurance)
    }

    pub async fn update_insurance(
        &self,
        insurance_id: i64,
        request: UpdateInsuranceRequest,
    ) -> Result<Insurance, InsuranceError> {
        let current = self.get_insurance(insurance_id).await?;
        request.validate_against(&current)?;

        if let Some(policy) = request.policy_number.as_deref().map(str::trim) {
            let filter = format!("policy_number=eq.{}&id=neq.{}", encode_value(policy), insurance_id);
            if self.supabase.exists(TABLE, &filter).await? {
                return Err(InsuranceError::DuplicatePolicy);
            }
        }

        let patch = request.into_patch(Utc::now());
        let filter = format!("id=eq.{}&select=*,{}", insurance_id, PATIENT_EMBED);
        let updated: Vec<Insurance> = self
            .supabase
            .update(TABLE, &filter, Value::Object(patch))
            .await
            .map_err(duplicate_or)?;

        let insurance = updated.into_iter().next().ok_or(InsuranceError::NotFound)?;
        info!("Insurance {} updated", insurance.id);
        Ok(insurance)
    }

    pub async fn delete_insurance(&self, insurance_id: i64) -> Result<(), InsuranceError> {
        let removed = self.supabase.delete(TABLE, &format!("id=eq.{}", insurance_id)).await?;
        if removed == 0 {
            return Err(InsuranceError::NotFound);
        }
        info!("Insurance {} deleted", insurance_id);
        Ok(())
    }
}

fn duplicate_or(err: DatabaseError) -> InsuranceError {
    if err.is_unique_violation() {
        match &err {
            DatabaseError::Conflict { message, .. } if message.contains("patient_id") => InsuranceError::AlreadyInsured,
            _ => InsuranceError::DuplicatePolicy,
        }
    } else {
        err.into()
    }
}

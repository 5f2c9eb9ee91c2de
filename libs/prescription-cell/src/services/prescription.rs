use std::collections::HashMap;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::embed::PATIENT_EMBED;
use shared_models::pagination::Pagination;

use crate::models::{
    attach_medication_names, CreatePrescriptionRequest, Prescription, PrescriptionError, PrescriptionItem,
    PrescriptionListQuery, UpdatePrescriptionRequest,
};

const TABLE: &str = "prescriptions";
const ITEMS_TABLE: &str = "prescription_items";
const ITEMS_EMBED: &str = "items:prescription_items(*,medication:medications(name))";

pub struct PrescriptionService {
    supabase: SupabaseClient,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn select_clause() -> String {
        format!("select=*,{},{}", ITEMS_EMBED, PATIENT_EMBED)
    }

    /// Writes the header and then its items. When the items cannot be written
    /// the header is removed again so no empty prescription is left behind.
    pub async fn create_prescription(
        &self,
        request: CreatePrescriptionRequest,
    ) -> Result<Prescription, PrescriptionError> {
        request.validate()?;
        debug!("Creating prescription for patient {} with {} items", request.patient_id, request.items.len());

        if !self.supabase.exists("patients", &format!("id=eq.{}", request.patient_id)).await? {
            return Err(PrescriptionError::PatientNotFound);
        }

        let names = self.medication_names(&request.medication_ids()).await?;
        if let Some(missing) = request.medication_ids().into_iter().find(|id| !names.contains_key(id)) {
            warn!("Prescription references unknown medication {}", missing);
            return Err(PrescriptionError::MedicationNotFound(missing));
        }

        let now = Utc::now();
        let header = json!({
            "patient_id": request.patient_id,
            "doctor_name": request.doctor_name,
            "diagnosis": request.diagnosis,
            "notes": request.notes,
            "created_at": now,
            "updated_at": now,
        });
        let mut prescription: Prescription = self.supabase.insert(TABLE, header).await?;

        let items: Result<Vec<PrescriptionItem>, _> = self
            .supabase
            .insert_many(ITEMS_TABLE, request.item_rows(prescription.id))
            .await;

        let mut items = match items {
            Ok(items) => items,
            Err(e) => {
                error!("Writing items of prescription {} failed: {}", prescription.id, e);
                if let Err(cleanup) = self.supabase.delete(TABLE, &format!("id=eq.{}", prescription.id)).await {
                    error!("Could not remove incomplete prescription {}: {}", prescription.id, cleanup);
                }
                return Err(e.into());
            }
        };

        attach_medication_names(&mut items, &names);
        prescription.items = items;
        info!("Prescription {} created for patient {}", prescription.id, prescription.patient_id);
        Ok(prescription)
    }

    /// Newest first.
    pub async fn list_prescriptions(&self, query: &PrescriptionListQuery) -> Result<Vec<Prescription>, PrescriptionError> {
        let mut filter = format!("{}&order=created_at.desc", Self::select_clause());
        if let Some(patient_id) = query.patient_id {
            filter.push_str(&format!("&patient_id=eq.{}", patient_id));
        }
        filter.push('&');
        filter.push_str(&query.pagination().to_query());

        Ok(self.supabase.select(TABLE, &filter).await?)
    }

    pub async fn list_for_user(&self, user_id: i64, pagination: Pagination) -> Result<Vec<Prescription>, PrescriptionError> {
        let patient_id = self.patient_id_for_user(user_id).await?.ok_or(PrescriptionError::PatientNotFound)?;
        let query = PrescriptionListQuery {
            patient_id: Some(patient_id),
            skip: pagination.skip,
            limit: pagination.limit,
        };
        self.list_prescriptions(&query).await
    }

    pub async fn get_prescription(&self, prescription_id: i64) -> Result<Prescription, PrescriptionError> {
        let query = format!("{}&id=eq.{}", Self::select_clause(), prescription_id);
        self.supabase
            .select_one(TABLE, &query)
            .await?
            .ok_or(PrescriptionError::NotFound)
    }

    /// Patients only see prescriptions written for their own record.
    pub async fn get_visible_to(&self, user: &AuthUser, prescription_id: i64) -> Result<Prescription, PrescriptionError> {
        let prescription = self.get_prescription(prescription_id).await?;
        if user.is_patient() && self.patient_id_for_user(user.id).await? != Some(prescription.patient_id) {
            warn!("User {} denied access to prescription {}", user.id, prescription_id);
            return Err(PrescriptionError::AccessDenied);
        }
        Ok(prescription)
    }

    pub async fn update_prescription(
        &self,
        prescription_id: i64,
        request: UpdatePrescriptionRequest,
    ) -> Result<Prescription, PrescriptionError> {
        request.validate()?;

        let patch = request.into_patch(Utc::now());
        let filter = format!("id=eq.{}&{}", prescription_id, Self::select_clause());
        let updated: Vec<Prescription> = self.supabase.update(TABLE, &filter, Value::Object(patch)).await?;

        let prescription = updated.into_iter().next().ok_or(PrescriptionError::NotFound)?;
        info!("Prescription {} updated", prescription.id);
        Ok(prescription)
    }

    /// Items go with the prescription.
    pub async fn delete_prescription(&self, prescription_id: i64) -> Result<(), PrescriptionError> {
        let removed = self.supabase.delete(TABLE, &format!("id=eq.{}", prescription_id)).await?;
        if removed == 0 {
            return Err(PrescriptionError::NotFound);
        }
        info!("Prescription {} deleted", prescription_id);
        Ok(())
    }

    async fn patient_id_for_user(&self, user_id: i64) -> Result<Option<i64>, PrescriptionError> {
        Ok(self.supabase.id_of("patients", &format!("user_id=eq.{}", user_id)).await?)
    }

    async fn medication_names(&self, ids: &[i64]) -> Result<HashMap<i64, String>, PrescriptionError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let list = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        let rows: Vec<Value> = self
            .supabase
            .select("medications", &format!("select=id,name&id=in.({})", list))
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| Some((row.get("id")?.as_i64()?, row.get("name")?.as_str()?.to_string())))
            .collect())
    }
}

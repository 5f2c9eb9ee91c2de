use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::{supabase::encode_value, DatabaseError, SupabaseClient};

use crate::models::{
    CreateMedicationRequest, Medication, MedicationError, MedicationListQuery, UpdateMedicationRequest,
};

const TABLE: &str = "medications";

pub struct MedicationService {
    supabase: SupabaseClient,
}

impl MedicationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_medication(&self, request: CreateMedicationRequest) -> Result<Medication, MedicationError> {
        request.validate()?;
        let name = request.name.trim().to_string();
        debug!("Creating medication {}", name);

        if self.name_taken(&name).await? {
            warn!("Medication {} already exists", name);
            return Err(MedicationError::DuplicateName);
        }

        let row = json!({
            "name": name,
            "generic_name": request.generic_name,
            "manufacturer": request.manufacturer,
            "dosage_form": request.dosage_form,
            "strength": request.strength,
            "unit_price": request.unit_price,
            "stock_quantity": request.stock_quantity,
            "description": request.description,
            "created_at": Utc::now(),
        });

        let medication: Medication = self.supabase.insert(TABLE, row).await.map_err(duplicate_or)?;
        info!("Medication {} created as {}", medication.name, medication.id);
        Ok(medication)
    }

    /// Case-insensitive substring match on the name when a search term is given.
    pub async fn list_medications(&self, query: &MedicationListQuery) -> Result<Vec<Medication>, MedicationError> {
        let mut filter = format!("select=*&order=name.asc&{}", query.pagination().to_query());
        if let Some(term) = query.search_term() {
            filter.push_str(&format!("&name=ilike.{}", encode_value(&format!("*{}*", term))));
        }
        Ok(self.supabase.select(TABLE, &filter).await?)
    }

    pub async fn get_medication(&self, medication_id: i64) -> Result<Medication, MedicationError> {
        self.supabase
            .select_one(TABLE, &format!("select=*&id=eq.{}", medication_id))
            .await?
            .ok_or(MedicationError::NotFound)
    }

    pub async fn name_taken(&self, name: &str) -> Result<bool, MedicationError> {
        let filter = format!("name=eq.{}", encode_value(name));
        Ok(self.supabase.exists(TABLE, &filter).await?)
    }

    pub async fn update_medication(
        &self,
        medication_id: i64,
        request: UpdateMedicationRequest,
    ) -> Result<Medication, MedicationError> {
        request.validate()?;

        if let Some(name) = request.name.as_deref().map(str::trim) {
            let filter = format!("name=eq.{}&id=neq.{}", encode_value(name), medication_id);
            if self.supabase.exists(TABLE, &filter).await? {
                return Err(MedicationError::DuplicateName);
            }
        }

        let patch = request.into_patch(Utc::now());
        let updated: Vec<Medication> = self
            .supabase
            .update(TABLE, &format!("id=eq.{}", medication_id), Value::Object(patch))
            .await
            .map_err(duplicate_or)?;

        let medication = updated.into_iter().next().ok_or(MedicationError::NotFound)?;
        info!("Medication {} updated", medication.id);
        Ok(medication)
    }

    pub async fn delete_medication(&self, medication_id: i64) -> Result<(), MedicationError> {
        let removed = self
            .supabase
            .delete(TABLE, &format!("id=eq.{}", medication_id))
            .await
            .map_err(|e| if e.is_foreign_key_violation() { MedicationError::InUse } else { e.into() })?;
        if removed == 0 {
            return Err(MedicationError::NotFound);
        }
        info!("Medication {} deleted", medication_id);
        Ok(())
    }
}

fn duplicate_or(err: DatabaseError) -> MedicationError {
    if err.is_unique_violation() {
        MedicationError::DuplicateName
    } else {
        err.into()
    }
}

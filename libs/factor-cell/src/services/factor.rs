use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_models::auth::AuthUser;
use shared_models::embed::PATIENT_EMBED;
use shared_models::pagination::Pagination;

use crate::models::{CreateFactorRequest, Factor, FactorError, FactorListQuery, UpdateFactorRequest};

const TABLE: &str = "factors";

pub struct FactorService {
    supabase: SupabaseClient,
}

impl FactorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_factor(&self, request: CreateFactorRequest) -> Result<Factor, FactorError> {
        request.validate()?;
        debug!("Logging {} units of {} for patient {}", request.units_administered, request.factor_type, request.patient_id);

        if !self.supabase.exists("patients", &format!("id=eq.{}", request.patient_id)).await? {
            return Err(FactorError::PatientNotFound);
        }

        let now = Utc::now();
        let row = json!({
            "patient_id": request.patient_id,
            "factor_type": request.factor_type.trim(),
            "units_administered": request.units_administered,
            "administration_date": request.administration_date,
            "lot_number": request.lot_number,
            "administered_by": request.administered_by,
            "notes": request.notes,
            "cost": request.cost,
            "created_at": now,
            "updated_at": now,
        });

        let factor: Factor = self.supabase.insert(TABLE, row).await?;
        info!("Factor record {} created for patient {}", factor.id, factor.patient_id);
        Ok(factor)
    }

    /// Most recent administration first.
    pub async fn list_factors(&self, query: &FactorListQuery) -> Result<Vec<Factor>, FactorError> {
        let mut filter = format!("select=*,{}&order=administration_date.desc", PATIENT_EMBED);
        if let Some(patient_id) = query.patient_id {
            filter.push_str(&format!("&patient_id=eq.{}", patient_id));
        }
        filter.push('&');
        filter.push_str(&query.pagination().to_query());

        Ok(self.supabase.select(TABLE, &filter).await?)
    }

    pub async fn list_for_user(&self, user_id: i64, pagination: Pagination) -> Result<Vec<Factor>, FactorError> {
        let patient_id = self
            .supabase
            .id_of("patients", &format!("user_id=eq.{}", user_id))
            .await?
            .ok_or(FactorError::PatientNotFound)?;

        let query = FactorListQuery {
            patient_id: Some(patient_id),
            skip: pagination.skip,
            limit: pagination.limit,
        };
        self.list_factors(&query).await
    }

    pub async fn get_factor(&self, factor_id: i64) -> Result<Factor, FactorError> {
        let query = format!("select=*,{}&id=eq.{}", PATIENT_EMBED, factor_id);
        self.supabase
            .select_one(TABLE, &query)
            .await?
            .ok_or(FactorError::NotFound)
    }

    pub async fn get_visible_to(&self, user: &AuthUser, factor_id: i64) -> Result<Factor, FactorError> {
        let factor = self.get_factor(factor_id).await?;
        if user.is_patient() {
            let own = self.supabase.id_of("patients", &format!("user_id=eq.{}", user.id)).await?;
            if own != Some(factor.patient_id) {
                warn!("User {} denied access to factor record {}", user.id, factor_id);
                return Err(FactorError::AccessDenied);
            }
        }
        Ok(factor)
    }

    pub async fn update_factor(&self, factor_id: i64, request: UpdateFactorRequest) -> Result<Factor, FactorError> {
        request.validate()?;

        let patch = request.into_patch(Utc::now());
        let filter = format!("id=eq.{}&select=*,{}", factor_id, PATIENT_EMBED);
        let updated: Vec<Factor> = self.supabase.update(TABLE, &filter, Value::Object(patch)).await?;

        let factor = updated.into_iter().next().ok_or(FactorError::NotFound)?;
        info!("Factor record {} updated", factor.id);
        Ok(factor)
    }

    pub async fn delete_factor(&self, factor_id: i64) -> Result<(), FactorError> {
        let removed = self.supabase.delete(TABLE, &format!("id=eq.{}", factor_id)).await?;
        if removed == 0 {
            return Err(FactorError::NotFound);
        }
        info!("Factor record {} deleted", factor_id);
        Ok(())
    }
}

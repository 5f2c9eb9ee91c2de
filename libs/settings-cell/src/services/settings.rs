use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{ClinicSettings, CreateSettingsRequest, SettingsError, UpdateSettingsRequest};

const TABLE: &str = "settings";
const FIRST_ROW: &str = "select=*&order=id.asc&limit=1";

/// Reads and writes the settings singleton. The first row by id is the one in use.
pub struct SettingsService {
    supabase: SupabaseClient,
    create_gate: Mutex<()>,
}

impl SettingsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            create_gate: Mutex::new(()),
        }
    }

    pub async fn current(&self) -> Result<Option<ClinicSettings>, SettingsError> {
        Ok(self.supabase.select_one(TABLE, FIRST_ROW).await?)
    }

    /// Current settings, writing the defaults first when none exist.
    pub async fn get_or_init(&self) -> Result<ClinicSettings, SettingsError> {
        if let Some(settings) = self.current().await? {
            return Ok(settings);
        }

        let _gate = self.create_gate.lock().await;
        if let Some(settings) = self.current().await? {
            return Ok(settings);
        }

        debug!("No clinic settings stored, writing defaults");
        let settings: ClinicSettings = self
            .supabase
            .insert(TABLE, CreateSettingsRequest::default().into_row(Utc::now()))
            .await?;
        info!("Default clinic settings created as {}", settings.id);
        Ok(settings)
    }

    pub async fn create(&self, request: CreateSettingsRequest) -> Result<ClinicSettings, SettingsError> {
        request.validate()?;

        let _gate = self.create_gate.lock().await;
        if self.current().await?.is_some() {
            warn!("Refusing to create a second settings row");
            return Err(SettingsError::AlreadyExists);
        }

        let settings: ClinicSettings = self.supabase.insert(TABLE, request.into_row(Utc::now())).await?;
        info!("Clinic settings created as {}", settings.id);
        Ok(settings)
    }

    pub async fn update(&self, request: UpdateSettingsRequest) -> Result<ClinicSettings, SettingsError> {
        request.validate()?;
        let current = self.current().await?.ok_or(SettingsError::NotFound)?;

        let patch = request.into_patch(Utc::now());
        let updated: Vec<ClinicSettings> = self
            .supabase
            .update(TABLE, &format!("id=eq.{}", current.id), Value::Object(patch))
            .await?;

        let settings = updated.into_iter().next().ok_or(SettingsError::NotFound)?;
        info!("Clinic settings updated");
        Ok(settings)
    }
}

use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{ClinicSettings, CreateSettingsRequest, UpdateSettingsRequest};
use crate::services::SettingsService;

#[derive(Clone)]
pub struct SettingsState {
    pub config: Arc<AppConfig>,
    pub service: Arc<SettingsService>,
}

impl SettingsState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let service = Arc::new(SettingsService::new(&config));
        Self { config, service }
    }
}

#[axum::debug_handler]
pub async fn get_settings(
    State(state): State<SettingsState>,
    Extension(_user): Extension<AuthUser>,
) -> Result<Json<ClinicSettings>, AppError> {
    let settings = state.service.get_or_init().await?;
    Ok(Json(settings))
}

#[axum::debug_handler]
pub async fn create_settings(
    State(state): State<SettingsState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateSettingsRequest>,
) -> Result<(StatusCode, Json<ClinicSettings>), AppError> {
    user.require_admin()?;

    let settings = state.service.create(request).await?;
    Ok((StatusCode::CREATED, Json(settings)))
}

#[axum::debug_handler]
pub async fn update_settings(
    State(state): State<SettingsState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<ClinicSettings>, AppError> {
    user.require_admin()?;

    let settings = state.service.update(request).await?;
    Ok(Json(settings))
}

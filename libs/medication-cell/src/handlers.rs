use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{CreateMedicationRequest, Medication, MedicationListQuery, UpdateMedicationRequest};
use crate::services::MedicationService;

#[axum::debug_handler]
pub async fn create_medication(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateMedicationRequest>,
) -> Result<(StatusCode, Json<Medication>), AppError> {
    user.require_admin()?;
    let service = MedicationService::new(&config);

    let medication = service.create_medication(request).await?;
    Ok((StatusCode::CREATED, Json(medication)))
}

#[axum::debug_handler]
pub async fn list_medications(
    State(config): State<Arc<AppConfig>>,
    Extension(_user): Extension<AuthUser>,
    Query(query): Query<MedicationListQuery>,
) -> Result<Json<Vec<Medication>>, AppError> {
    let service = MedicationService::new(&config);

    let medications = service.list_medications(&query).await?;
    Ok(Json(medications))
}

#[axum::debug_handler]
pub async fn get_medication(
    State(config): State<Arc<AppConfig>>,
    Extension(_user): Extension<AuthUser>,
    Path(medication_id): Path<i64>,
) -> Result<Json<Medication>, AppError> {
    let service = MedicationService::new(&config);

    let medication = service.get_medication(medication_id).await?;
    Ok(Json(medication))
}

#[axum::debug_handler]
pub async fn update_medication(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(medication_id): Path<i64>,
    Json(request): Json<UpdateMedicationRequest>,
) -> Result<Json<Medication>, AppError> {
    user.require_admin()?;
    let service = MedicationService::new(&config);

    let medication = service.update_medication(medication_id, request).await?;
    Ok(Json(medication))
}

#[axum::debug_handler]
pub async fn delete_medication(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(medication_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;
    let service = MedicationService::new(&config);

    service.delete_medication(medication_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

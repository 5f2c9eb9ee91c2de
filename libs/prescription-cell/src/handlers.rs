use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use shared_models::pagination::Pagination;

use crate::models::{
    CreatePrescriptionRequest, PrescriptionListQuery, PrescriptionResponse, UpdatePrescriptionRequest,
};
use crate::services::PrescriptionService;

#[axum::debug_handler]
pub async fn create_prescription(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<PrescriptionResponse>), AppError> {
    user.require_staff()?;
    let service = PrescriptionService::new(&config);

    let prescription = service.create_prescription(request).await?;
    Ok((StatusCode::CREATED, Json(prescription.into())))
}

#[axum::debug_handler]
pub async fn list_prescriptions(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PrescriptionListQuery>,
) -> Result<Json<Vec<PrescriptionResponse>>, AppError> {
    user.require_staff()?;
    let service = PrescriptionService::new(&config);

    let prescriptions = service.list_prescriptions(&query).await?;
    Ok(Json(prescriptions.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_my_prescriptions(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<PrescriptionResponse>>, AppError> {
    let service = PrescriptionService::new(&config);

    let prescriptions = service.list_for_user(user.id, pagination).await?;
    Ok(Json(prescriptions.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_prescription(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(prescription_id): Path<i64>,
) -> Result<Json<PrescriptionResponse>, AppError> {
    let service = PrescriptionService::new(&config);

    let prescription = service.get_visible_to(&user, prescription_id).await?;
    Ok(Json(prescription.into()))
}

#[axum::debug_handler]
pub async fn update_prescription(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(prescription_id): Path<i64>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Json<PrescriptionResponse>, AppError> {
    user.require_staff()?;
    let service = PrescriptionService::new(&config);

    let prescription = service.update_prescription(prescription_id, request).await?;
    Ok(Json(prescription.into()))
}

#[axum::debug_handler]
pub async fn delete_prescription(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(prescription_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_staff()?;
    let service = PrescriptionService::new(&config);

    service.delete_prescription(prescription_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

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

use crate::models::{CreatePatientRequest, PatientResponse, UpdatePatientRequest};
use crate::services::PatientService;

#[axum::debug_handler]
pub async fn create_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<(StatusCode, Json<PatientResponse>), AppError> {
    user.require_staff()?;
    let service = PatientService::new(&config);

    let patient = service.create_patient(request).await?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<PatientResponse>>, AppError> {
    user.require_staff()?;
    let service = PatientService::new(&config);

    let patients = service.list_patients(pagination).await?;
    Ok(Json(patients.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_my_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<PatientResponse>, AppError> {
    let service = PatientService::new(&config);

    let patient = service.patient_for_user(user.id).await?;
    Ok(Json(patient.into()))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<i64>,
) -> Result<Json<PatientResponse>, AppError> {
    user.require_staff()?;
    let service = PatientService::new(&config);

    let patient = service.get_patient(patient_id).await?;
    Ok(Json(patient.into()))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<i64>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<PatientResponse>, AppError> {
    user.require_staff()?;
    let service = PatientService::new(&config);

    let patient = service.update_patient(patient_id, request).await?;
    Ok(Json(patient.into()))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_staff()?;
    let service = PatientService::new(&config);

    service.delete_patient(patient_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

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

use crate::models::{CreateInsuranceRequest, InsuranceResponse, UpdateInsuranceRequest};
use crate::services::InsuranceService;

#[axum::debug_handler]
pub async fn create_insurance(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateInsuranceRequest>,
) -> Result<(StatusCode, Json<InsuranceResponse>), AppError> {
    user.require_staff()?;
    let service = InsuranceService::new(&config);

    let insurance = service.create_insurance(request).await?;
    Ok((StatusCode::CREATED, Json(insurance.into())))
}

#[axum::debug_handler]
pub async fn list_insurances(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<InsuranceResponse>>, AppError> {
    user.require_staff()?;
    let service = InsuranceService::new(&config);

    let insurances = service.list_insurances(pagination).await?;
    Ok(Json(insurances.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_my_insurance(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<InsuranceResponse>, AppError> {
    let service = InsuranceService::new(&config);

    let insurance = service.insurance_for_user(user.id).await?;
    Ok(Json(insurance.into()))
}

#[axum::debug_handler]
pub async fn get_insurance(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(insurance_id): Path<i64>,
) -> Result<Json<InsuranceResponse>, AppError> {
    let service = InsuranceService::new(&config);

    let insurance = service.get_visible_to(&user, insurance_id).await?;
    Ok(Json(insurance.into()))
}

#[axum::debug_handler]
pub async fn update_insurance(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(insurance_id): Path<i64>,
    Json(request): Json<UpdateInsuranceRequest>,
) -> Result<Json<InsuranceResponse>, AppError> {
    user.require_staff()?;
    let service = InsuranceService::new(&config);

    let insurance = service.update_insurance(insurance_id, request).await?;
    Ok(Json(insurance.into()))
}

#[axum::debug_handler]
pub async fn delete_insurance(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(insurance_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_staff()?;
    let service = InsuranceService::new(&config);

    service.delete_insurance(insurance_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

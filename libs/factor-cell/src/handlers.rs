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

use crate::models::{CreateFactorRequest, FactorListQuery, FactorResponse, UpdateFactorRequest};
use crate::services::FactorService;

#[axum::debug_handler]
pub async fn create_factor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateFactorRequest>,
) -> Result<(StatusCode, Json<FactorResponse>), AppError> {
    user.require_staff()?;
    let service = FactorService::new(&config);

    let factor = service.create_factor(request).await?;
    Ok((StatusCode::CREATED, Json(factor.into())))
}

#[axum::debug_handler]
pub async fn list_factors(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<FactorListQuery>,
) -> Result<Json<Vec<FactorResponse>>, AppError> {
    user.require_staff()?;
    let service = FactorService::new(&config);

    let factors = service.list_factors(&query).await?;
    Ok(Json(factors.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_my_factors(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<FactorResponse>>, AppError> {
    let service = FactorService::new(&config);

    let factors = service.list_for_user(user.id, pagination).await?;
    Ok(Json(factors.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_factor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(factor_id): Path<i64>,
) -> Result<Json<FactorResponse>, AppError> {
    let service = FactorService::new(&config);

    let factor = service.get_visible_to(&user, factor_id).await?;
    Ok(Json(factor.into()))
}

#[axum::debug_handler]
pub async fn update_factor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(factor_id): Path<i64>,
    Json(request): Json<UpdateFactorRequest>,
) -> Result<Json<FactorResponse>, AppError> {
    user.require_staff()?;
    let service = FactorService::new(&config);

    let factor = service.update_factor(factor_id, request).await?;
    Ok(Json(factor.into()))
}

#[axum::debug_handler]
pub async fn delete_factor(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(factor_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_staff()?;
    let service = FactorService::new(&config);

    service.delete_factor(factor_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

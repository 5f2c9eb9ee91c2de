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

use crate::models::{CreateUserRequest, UpdateUserRequest, User};
use crate::services::UserService;

#[axum::debug_handler]
pub async fn create_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    user.require_admin()?;

    let created = UserService::new(&config).create_user(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[axum::debug_handler]
pub async fn list_users(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<User>>, AppError> {
    user.require_admin()?;

    let users = UserService::new(&config).list_users(pagination).await?;
    Ok(Json(users))
}

#[axum::debug_handler]
pub async fn get_me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let me = UserService::new(&config).get_user(user.id).await?;
    Ok(Json(me))
}

#[axum::debug_handler]
pub async fn get_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<Json<User>, AppError> {
    user.require_admin()?;

    let found = UserService::new(&config).get_user(user_id).await?;
    Ok(Json(found))
}

#[axum::debug_handler]
pub async fn update_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    user.require_admin()?;

    let updated = UserService::new(&config).update_user(user_id, request).await?;
    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn delete_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_admin()?;

    UserService::new(&config).delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
};

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;
use user_cell::models::User;

use crate::models::{LoginRequest, RefreshRequest, TokenResponse};
use crate::services::AuthService;

pub async fn login(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = AuthService::new(&config).login(request).await?;
    Ok(Json(tokens))
}

pub async fn refresh(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let tokens = AuthService::new(&config).refresh(&request.refresh_token).await?;
    Ok(Json(tokens))
}

pub async fn me(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    let current = AuthService::new(&config).current_user(user.id).await?;
    Ok(Json(current))
}

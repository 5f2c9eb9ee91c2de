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
    AppointmentListQuery, AppointmentResponse, CreateAppointmentRequest, UpdateAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::AppointmentService;

#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub service: Arc<AppointmentService>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let service = Arc::new(AppointmentService::new(&config));
        Self { config, service }
    }
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), AppError> {
    user.require_staff()?;

    let appointment = state.service.schedule(request).await?;
    Ok((StatusCode::CREATED, Json(appointment.into())))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    user.require_staff()?;

    let appointments = state
        .service
        .list(query.status_filter, query.pagination())
        .await?;

    Ok(Json(appointments.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<AuthUser>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<AppointmentResponse>>, AppError> {
    let appointments = state
        .service
        .list_for_user(user.id, pagination)
        .await?;

    Ok(Json(appointments.into_iter().map(Into::into).collect()))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<AppointmentResponse>, AppError> {
    user.require_staff()?;

    let appointment = state.service.get(appointment_id).await?;
    Ok(Json(appointment.into()))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    user.require_staff()?;

    let appointment = state.service.update(appointment_id, request).await?;
    Ok(Json(appointment.into()))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<i64>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<AppointmentResponse>, AppError> {
    user.require_staff()?;

    let appointment = state
        .service
        .update_status(appointment_id, request.status)
        .await?;
    Ok(Json(appointment.into()))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<AuthUser>,
    Path(appointment_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user.require_staff()?;

    state.service.delete(appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

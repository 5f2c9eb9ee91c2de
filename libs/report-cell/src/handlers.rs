use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::Utc;

use shared_config::AppConfig;
use shared_models::auth::AuthUser;
use shared_models::error::AppError;

use crate::models::{
    AppointmentDetailReport, AppointmentReportQuery, DailyAppointmentReport, DateRangeQuery, ExportFormat,
    ExportQuery, FactorDetailReport, FactorReportQuery, PatientDetailReport, PatientReportQuery,
    PrescriptionDetailReport, PrescriptionReportQuery, SinglePatientReport,
};
use crate::services::{export, Attachment, ReportService};

#[axum::debug_handler]
pub async fn patients_report(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PatientReportQuery>,
) -> Result<Json<Vec<PatientDetailReport>>, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    let rows = service.patients_report(&query, Utc::now().date_naive()).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn factors_report(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<FactorReportQuery>,
) -> Result<Json<Vec<FactorDetailReport>>, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    let rows = service.factors_report(&query, Utc::now().date_naive()).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn patient_report(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Path(patient_id): Path<i64>,
) -> Result<Json<SinglePatientReport>, AppError> {
    let service = ReportService::new(&config);

    let report = service.patient_report(&user, patient_id, Utc::now()).await?;
    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn prescriptions_report(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PrescriptionReportQuery>,
) -> Result<Json<Vec<PrescriptionDetailReport>>, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    let rows = service.prescriptions_report(&query, Utc::now().date_naive()).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn appointments_report(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<AppointmentReportQuery>,
) -> Result<Json<Vec<AppointmentDetailReport>>, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    let rows = service.appointments_report(&query, Utc::now().date_naive()).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn daily_appointments(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Vec<DailyAppointmentReport>>, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    let rows = service.daily_appointments(&range, Utc::now().date_naive()).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn export_patients_csv(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Attachment, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    let query = PatientReportQuery {
        start_date: range.start_date,
        end_date: range.end_date,
        ..PatientReportQuery::default()
    };
    let rows = service.patients_report(&query, Utc::now().date_naive()).await?;
    Ok(export::attachment("patients_detailed_report", ExportFormat::Csv, &rows)?)
}

#[axum::debug_handler]
pub async fn export_factors_csv(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Attachment, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    let query = FactorReportQuery {
        start_date: range.start_date,
        end_date: range.end_date,
        ..FactorReportQuery::default()
    };
    let rows = service.factors_report(&query, Utc::now().date_naive()).await?;
    Ok(export::attachment("factors_detailed_report", ExportFormat::Csv, &rows)?)
}

#[axum::debug_handler]
pub async fn export_report(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ExportQuery>,
) -> Result<Attachment, AppError> {
    user.require_admin()?;
    let service = ReportService::new(&config);

    Ok(service.export(&query, Utc::now().date_naive()).await?)
}

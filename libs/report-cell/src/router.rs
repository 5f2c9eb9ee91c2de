use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn report_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/patients", get(patients_report))
        .route("/factors", get(factors_report))
        .route("/patient/{patient_id}", get(patient_report))
        .route("/prescriptions", get(prescriptions_report))
        .route("/appointments", get(appointments_report))
        .route("/daily-appointments", get(daily_appointments))
        .route("/export", get(export_report))
        .route("/export/patients-csv", get(export_patients_csv))
        .route("/export/factors-csv", get(export_factors_csv))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

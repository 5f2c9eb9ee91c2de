use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::appointment_routes;
use auth_cell::router::auth_routes;
use factor_cell::factor_routes;
use insurance_cell::insurance_routes;
use medication_cell::medication_routes;
use patient_cell::patient_routes;
use prescription_cell::prescription_routes;
use report_cell::report_routes;
use settings_cell::settings_routes;
use shared_config::AppConfig;
use support_cell::support_routes;
use user_cell::user_routes;

async fn root(State(config): State<Arc<AppConfig>>) -> Json<Value> {
    Json(json!({
        "message": config.app_name,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub fn api_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .nest("/auth", auth_routes(config.clone()))
        .nest("/users", user_routes(config.clone()))
        .nest("/patients", patient_routes(config.clone()))
        .nest("/appointments", appointment_routes(config.clone()))
        .nest("/medications", medication_routes(config.clone()))
        .nest("/prescriptions", prescription_routes(config.clone()))
        .nest("/factors", factor_routes(config.clone()))
        .nest("/insurances", insurance_routes(config.clone()))
        .nest("/settings", settings_routes(config.clone()))
        .nest("/support", support_routes(config.clone()))
        .nest("/reports", report_routes(config))
}

pub fn create_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(config.clone())
        .nest("/api/v1", api_routes(config))
}

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn insurance_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_insurances).post(create_insurance))
        .route("/my", get(get_my_insurance))
        .route(
            "/{insurance_id}",
            get(get_insurance).put(update_insurance).delete(delete_insurance),
        )
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

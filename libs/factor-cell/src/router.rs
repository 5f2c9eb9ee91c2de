use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::*;

pub fn factor_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(list_factors).post(create_factor))
        .route("/my", get(get_my_factors))
        .route("/{factor_id}", get(get_factor).put(update_factor).delete(delete_factor))
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn user_routes(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/me", get(handlers::get_me))
        .route(
            "/{user_id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .layer(middleware::from_fn_with_state(config.clone(), auth_middleware))
        .with_state(config)
}

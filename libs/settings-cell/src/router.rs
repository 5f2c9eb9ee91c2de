use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, SettingsState};

pub fn settings_routes(config: Arc<AppConfig>) -> Router {
    let state = SettingsState::new(config);

    Router::new()
        .route(
            "/",
            get(handlers::get_settings)
                .post(handlers::create_settings)
                .put(handlers::update_settings),
        )
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        .with_state(state)
}

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, SupportState};

pub fn support_routes(config: Arc<AppConfig>) -> Router {
    support_routes_with_state(SupportState::new(config))
}

/// Builds the routes around an existing relay, so callers can share or observe it.
pub fn support_routes_with_state(state: SupportState) -> Router {
    Router::new()
        .route("/chats", get(handlers::list_chats).post(handlers::create_chat))
        .route("/chats/{chat_id}", get(handlers::get_chat))
        .route("/chats/{chat_id}/close", put(handlers::close_chat))
        .route("/messages", post(handlers::send_message))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware))
        // authenticates through its query string
        .route("/ws/{chat_id}", get(handlers::chat_socket))
        .with_state(state)
}

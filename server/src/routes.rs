use axum::{routing, Router};

use crate::chat::api as chat_api;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the full axum Router with all routes.
pub fn build_router(state: AppState) -> Router {
    // Unary chat operations
    let chat_routes = Router::new()
        .route("/api/chat/connect", routing::post(chat_api::connect))
        .route("/api/chat/disconnect", routing::post(chat_api::disconnect))
        .route("/api/chat/send", routing::post(chat_api::send_message));

    // Read-only views of the log
    let inspect_routes = Router::new()
        .route("/api/chat/actions", routing::get(chat_api::list_actions))
        .route("/api/chat/stats", routing::get(chat_api::stats));

    // Action stream
    let ws_routes = Router::new().route("/ws", routing::get(ws_handler::ws_upgrade));

    let health = Router::new().route("/health", routing::get(health_check));

    Router::new()
        .merge(chat_routes)
        .merge(inspect_routes)
        .merge(ws_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

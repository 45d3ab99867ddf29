use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{chat, config, handlers, sonarr};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Runtime configuration store
        .route("/config", get(config::list_config))
        .route(
            "/config/{key}",
            get(config::get_config)
                .put(config::set_config)
                .delete(config::delete_config),
        )
        // Sonarr mirror
        .route("/sonarr/search", get(sonarr::search))
        .route(
            "/sonarr/sync",
            get(sonarr::sync_status).post(sonarr::trigger_sync),
        )
        // Chat commands
        .route("/messages", post(chat::handle_message))
        .route_layer(middleware::from_fn(super::middleware::metrics_middleware))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics).with_state(state))
        .layer(TraceLayer::new_for_http())
}

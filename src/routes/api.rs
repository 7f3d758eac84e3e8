use crate::{
    handlers::{activity_feed, diagnostics, health_check, ready_check, section_presence},
    routes::auth_middleware::auth_middleware,
    websocket::handler::websocket_handler,
    AppState,
};
use axum::{middleware, routing::get, Router};

/// Create API routes
pub fn create_api_routes(state: AppState) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/documents/:document/sections/:section_id/presence", get(section_presence))
        .route("/v1/documents/:document/activity", get(activity_feed))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware)) // Applies to all routes added above
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
}

/// Create the websocket route
pub fn create_ws_routes(state: AppState) -> Router<AppState> {
    Router::<AppState>::new()
        .route("/ws/:document", get(websocket_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

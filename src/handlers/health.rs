use axum::{extract::State, Json};
use crate::{models::HealthResponse, AppState};
use tracing::debug;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("{} is running", state.config.cloud_service_name),
        open_documents: None,
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let stats = state.hub.stats();
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
        open_documents: Some(stats.documents),
    })
}

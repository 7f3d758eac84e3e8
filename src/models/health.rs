use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Liveness and readiness check body
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    /// Documents with at least one live connection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_documents: Option<usize>,
}

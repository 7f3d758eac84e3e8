use utoipa::OpenApi;
use crate::colab::{ActivityFeedItemView, CollaborationSession, NotificationEvent, SessionStatus, Severity};
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Active collaborators of a section
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document}/sections/{section_id}/presence",
    params(
        ("document" = String, Path, description = "Document identifier"),
        ("section_id" = String, Path, description = "Section identifier")
    ),
    responses(
        (status = 200, description = "Active sessions, first seen first", body = SectionPresenceResponse),
        (status = 404, description = "Document has no open channel", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn section_presence_doc() {}

/// Recent activity of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document}/activity",
    params(
        ("document" = String, Path, description = "Document identifier"),
        ActivityQuery
    ),
    responses(
        (status = 200, description = "Activity, newest first", body = ActivityFeedResponse),
        (status = 404, description = "Document has no open channel", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn activity_feed_doc() {}

/// Service diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Diagnostics", body = DiagnosticsResponse),
        (status = 403, description = "Caller is not a cloud admin", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        section_presence_doc,
        activity_feed_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            DiagnosticsResponse,
            SectionPresenceResponse,
            ActivityFeedResponse,
            ActivityFeedItemView,
            CollaborationSession,
            SessionStatus,
            NotificationEvent,
            Severity,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;

use axum::{extract::{Path, State}, http::StatusCode, Json};
use tracing::debug;

use crate::{models::{ErrorResponse, SectionPresenceResponse}, AppState};

/// List the collaborators actively working in a section of a document
pub async fn section_presence(
    State(state): State<AppState>,
    Path((document, section_id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<SectionPresenceResponse>), (StatusCode, Json<ErrorResponse>)> {

    let sessions = match state.hub.list_active_in_section(&document, &section_id) {
        Some(sessions) => sessions,
        None => {
            debug!("Presence requested for closed document '{}'", document);
            return Err(ErrorResponse::with_status(
                StatusCode::NOT_FOUND,
                format!("Document '{}' has no open channel", document),
            ));
        }
    };

    Ok((
        StatusCode::OK,
        Json(SectionPresenceResponse {
            document,
            section_id,
            sessions,
        }),
    ))
}

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::colab::{ActivityFeedItemView, CollaborationSession};

/// Active collaborators of a document section
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionPresenceResponse {
    pub document: String,
    pub section_id: String,
    pub sessions: Vec<CollaborationSession>,
}

/// Most recent activity of a document, newest first
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFeedResponse {
    pub document: String,
    pub items: Vec<ActivityFeedItemView>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Number of items, clamped to the feed size
    pub limit: Option<usize>,
}

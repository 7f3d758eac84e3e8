use axum::{extract::{Path, Query, State}, http::StatusCode, Json};

use crate::{
    colab::ActivityFeedItemView,
    models::{ActivityFeedResponse, ActivityQuery, ErrorResponse},
    AppState,
};

/// Most recent activity of a document
pub async fn activity_feed(
    State(state): State<AppState>,
    Path(document): Path<String>,
    Query(query): Query<ActivityQuery>,
) -> Result<(StatusCode, Json<ActivityFeedResponse>), (StatusCode, Json<ErrorResponse>)> {

    let limit = query.limit.unwrap_or(state.config.feed_capacity);
    let items = state.hub.recent(&document, limit).ok_or_else(|| {
        ErrorResponse::with_status(
            StatusCode::NOT_FOUND,
            format!("Document '{}' has no open channel", document),
        )
    })?;

    Ok((
        StatusCode::OK,
        Json(ActivityFeedResponse {
            document,
            items: items.iter().map(ActivityFeedItemView::from).collect(),
        }),
    ))
}

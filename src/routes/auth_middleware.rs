use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::error;

use crate::services::auth_service::authenticate;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {

    // Resolve the caller from the token (or the dev user parameter)
    let user = match authenticate(&req, &state.config, &state.user_cache) {
        Ok(user) => user,
        Err(e) => {
            error!("Authentication failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // Make the caller available to downstream handlers
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

//! API key middleware

use crate::api::{AppError, AppState};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Header carrying the client API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Middleware: Require a configured API key.
///
/// Development deployments with no keys configured accept every request.
pub async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let server = &state.config.server;
    if server.auth_disabled() {
        return Ok(next.run(req).await);
    }

    let key = req
        .headers()
        .get(API_KEY_HEADER)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    if !server.api_keys.iter().any(|allowed| allowed == key) {
        tracing::warn!(path = %req.uri().path(), "Rejected request with unknown API key");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(req).await)
}

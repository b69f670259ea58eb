use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::AppState;
use crate::error::ApiError;

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn tokens_match(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Guards operator routes with the configured admin token.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let expected = state.config.admin_token.trim();
    let token = extract_bearer_token(req.headers()).map(str::trim).unwrap_or_default();

    if expected.is_empty() || token.is_empty() || !tokens_match(expected, token) {
        warn!("Rejected operator request to {}", req.uri().path());
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

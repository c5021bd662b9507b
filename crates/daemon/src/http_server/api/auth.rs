use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::error::ApiError;
use crate::ServiceState;

/// Let the request through only if it carries `Authorization: Bearer <secret>`.
pub async fn require_bearer(
    State(state): State<ServiceState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if token == state.secret_key() => Ok(next.run(req).await),
        _ => Err(ApiError::Unauthorized),
    }
}

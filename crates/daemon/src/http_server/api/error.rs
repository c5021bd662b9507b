use axum::extract::rejection::BytesRejection;
use axum::http::header::{CONTENT_RANGE, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use object_store::{ErrorKind, RangeError, StoreError};

/// Every way an API request can fail, rendered as `{"message": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Body(#[from] BytesRejection),
}

fn message(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "message": message.into() });
    (status, Json(body)).into_response()
}

fn store_error_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::BadRange => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::RangeTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::StorageIO => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Store(err) => {
                if let StoreError::Range(RangeError::Unsatisfiable { size }) = err {
                    tracing::warn!(size, "range not satisfiable");
                    let mut response = message(StatusCode::RANGE_NOT_SATISFIABLE, err.to_string());
                    if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", size)) {
                        response.headers_mut().insert(CONTENT_RANGE, value);
                    }
                    return response;
                }

                let status = store_error_status(err.kind());
                if status.is_server_error() {
                    tracing::error!(error = %err, "storage failure");
                    return message(status, "internal server error");
                }

                tracing::warn!(status = status.as_u16(), error = %err, "request rejected");
                message(status, err.to_string())
            }
            ApiError::Unauthorized => {
                tracing::warn!("missing or invalid bearer token");
                let mut response = message(StatusCode::UNAUTHORIZED, "unauthorized");
                response
                    .headers_mut()
                    .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Body(rejection) => {
                let status = rejection.status();
                tracing::warn!(status = status.as_u16(), "request body rejected");
                message(status, rejection.body_text())
            }
        }
    }
}

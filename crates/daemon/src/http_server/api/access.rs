use axum::extract::{Path, Query, State};
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use object_store::{RangeError, StoreError};

use super::error::ApiError;
use crate::ServiceState;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    #[serde(default)]
    pub bucket_id: String,
    #[serde(default)]
    pub blob_id: String,
}

pub async fn create(
    State(state): State<ServiceState>,
    Query(params): Query<CreateParams>,
) -> Result<Response, ApiError> {
    let grant = state
        .store()
        .create_grant(&params.bucket_id, &params.blob_id)
        .await?;
    Ok((StatusCode::CREATED, Json(grant)).into_response())
}

/// Grants pointing at one blob.
pub async fn list(
    State(state): State<ServiceState>,
    Path((bucket_id, blob_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let grants = state.store().list_grants(&bucket_id, &blob_id).await?;
    Ok((StatusCode::OK, Json(grants)).into_response())
}

pub async fn delete(
    State(state): State<ServiceState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_grant(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serve the blob behind a grant. No credentials needed; the key is the credential.
pub async fn download(
    State(state): State<ServiceState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let range = match headers.get(RANGE) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| StoreError::Range(RangeError::Malformed))?,
        ),
        None => None,
    };

    let download = state.store().download(&key, range).await?;
    let length = download.data.len();

    let mut response = match download.range {
        Some(range) => {
            let mut response = (StatusCode::PARTIAL_CONTENT, download.data).into_response();
            if let Ok(value) = HeaderValue::from_str(&range.content_range()) {
                response.headers_mut().insert(CONTENT_RANGE, value);
            }
            response
        }
        None => (StatusCode::OK, download.data).into_response(),
    };

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
    headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));

    Ok(response)
}

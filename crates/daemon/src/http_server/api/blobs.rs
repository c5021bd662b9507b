use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    #[serde(default)]
    pub blob_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppendResponse {
    /// Recorded size after the append
    pub size: u64,
}

pub async fn create(
    State(state): State<ServiceState>,
    Path(bucket_id): Path<String>,
    Query(params): Query<CreateParams>,
) -> Result<Response, ApiError> {
    let blob = state
        .store()
        .create_blob(&bucket_id, &params.blob_id)
        .await?;
    Ok((StatusCode::CREATED, Json(blob)).into_response())
}

/// Append the request body to the blob.
pub async fn append(
    State(state): State<ServiceState>,
    Path((bucket_id, blob_id)): Path<(String, String)>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body?;
    let size = state
        .store()
        .append_blob(&bucket_id, &blob_id, &body)
        .await?;
    Ok((StatusCode::OK, Json(AppendResponse { size })).into_response())
}

pub async fn list(
    State(state): State<ServiceState>,
    Path(bucket_id): Path<String>,
) -> Result<Response, ApiError> {
    let blobs = state.store().list_blobs(&bucket_id).await?;
    Ok((StatusCode::OK, Json(blobs)).into_response())
}

pub async fn get(
    State(state): State<ServiceState>,
    Path((bucket_id, blob_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let blob = state.store().get_blob(&bucket_id, &blob_id).await?;
    Ok((StatusCode::OK, Json(blob)).into_response())
}

pub async fn delete(
    State(state): State<ServiceState>,
    Path((bucket_id, blob_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_blob(&bucket_id, &blob_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::error::ApiError;
use crate::ServiceState;

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    #[serde(default)]
    pub bucket_id: String,
}

pub async fn create(
    State(state): State<ServiceState>,
    Query(params): Query<CreateParams>,
) -> Result<Response, ApiError> {
    let bucket = state.store().create_bucket(&params.bucket_id).await?;
    Ok((StatusCode::CREATED, Json(bucket)).into_response())
}

pub async fn list(State(state): State<ServiceState>) -> Result<Response, ApiError> {
    let buckets = state.store().list_buckets().await?;
    Ok((StatusCode::OK, Json(buckets)).into_response())
}

pub async fn get(
    State(state): State<ServiceState>,
    Path(bucket_id): Path<String>,
) -> Result<Response, ApiError> {
    let bucket = state.store().get_bucket(&bucket_id).await?;
    Ok((StatusCode::OK, Json(bucket)).into_response())
}

pub async fn delete(
    State(state): State<ServiceState>,
    Path(bucket_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.store().delete_bucket(&bucket_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

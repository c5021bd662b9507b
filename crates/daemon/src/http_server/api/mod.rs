use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

mod access;
mod auth;
mod blobs;
mod buckets;
mod error;

pub use blobs::AppendResponse;
pub use error::ApiError;

use crate::ServiceState;

/// Bucket, blob and grant routes. Everything except grant downloads
/// requires the bearer secret.
pub fn router(state: ServiceState) -> Router<ServiceState> {
    let protected = Router::new()
        .route("/buckets", post(buckets::create).get(buckets::list))
        .route(
            "/buckets/:bucket_id",
            get(buckets::get).delete(buckets::delete),
        )
        .route(
            "/buckets/:bucket_id/blobs",
            post(blobs::create).get(blobs::list),
        )
        .route(
            "/buckets/:bucket_id/blobs/:blob_id",
            get(blobs::get).put(blobs::append).delete(blobs::delete),
        )
        .route("/buckets/:bucket_id/blobs/:blob_id/access", get(access::list))
        .route("/access", post(access::create))
        .route("/access/:key", delete(access::delete))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let open = Router::new().route("/access/:key", get(access::download));

    protected.merge(open).with_state(state)
}

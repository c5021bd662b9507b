//! Records owned by the metadata catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named container of blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub blobs: Vec<Blob>,
}

/// An append-only byte payload inside a bucket.
///
/// `size` mirrors the number of bytes appended to the blob's file; it is only
/// ever changed by adding the length of a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub id: String,
    pub bucket_id: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
}

/// An unauthenticated, revocable capability to download one blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub key: String,
    pub bucket_id: String,
    pub blob_id: String,
    pub created_at: DateTime<Utc>,
}

/// Bytes returned by a grant download.
#[derive(Debug, Clone)]
pub struct Download {
    pub blob: Blob,
    pub data: bytes::Bytes,
    /// Present when the download was for a byte range
    pub range: Option<crate::range::ResolvedRange>,
}

//! The request-facing store: sequences catalog, byte store, range resolver
//! and grant issuer for every bucket, blob and grant operation.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::catalog::Catalog;
use crate::error::{Result, StoreError};
use crate::grants::GrantIssuer;
use crate::locks::BlobLocks;
use crate::range;
use crate::storage::ByteStore;
use crate::types::{Blob, Bucket, Download, Grant};

/// Default cap on appended chunks and downloaded ranges (1 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 1024 * 1024;

const MAX_ID_LEN: usize = 255;

/// Where the store keeps its state.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    /// Directory holding one subdirectory per bucket
    pub blobs_path: PathBuf,
    /// SQLite catalog file; `None` keeps the catalog in memory
    pub catalog_path: Option<PathBuf>,
    /// Largest range a single download may request
    pub max_chunk_size: u64,
}

impl ObjectStoreConfig {
    pub fn new(blobs_path: impl Into<PathBuf>, catalog_path: Option<PathBuf>) -> Self {
        Self {
            blobs_path: blobs_path.into(),
            catalog_path,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: u64) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }
}

/// Buckets, blobs and access grants over a metadata catalog and a byte store.
///
/// The two backends share no transaction. Deletes remove bytes before
/// metadata, so an interrupted delete leaves a catalog row that can simply be
/// deleted again rather than a file nothing lists. A failure between a
/// successful append and its size increment is reported and not rolled back.
#[derive(Debug)]
pub struct ObjectStore {
    catalog: Catalog,
    bytes: ByteStore,
    grants: GrantIssuer,
    locks: BlobLocks,
    max_chunk_size: u64,
}

impl ObjectStore {
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::new(path).await?,
            None => Catalog::in_memory().await?,
        };
        let bytes = ByteStore::new(&config.blobs_path).await?;
        Ok(Self::from_parts(catalog, bytes, config.max_chunk_size))
    }

    /// A store with an in-memory catalog and blobs under `blobs_path`.
    pub async fn new_local(blobs_path: &Path) -> Result<Self> {
        Self::new(ObjectStoreConfig::new(blobs_path, None)).await
    }

    pub fn from_parts(catalog: Catalog, bytes: ByteStore, max_chunk_size: u64) -> Self {
        Self {
            grants: GrantIssuer::new(catalog.clone()),
            catalog,
            bytes,
            locks: BlobLocks::default(),
            max_chunk_size,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn byte_store(&self) -> &ByteStore {
        &self.bytes
    }

    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size
    }

    // Buckets

    #[tracing::instrument(skip(self))]
    pub async fn create_bucket(&self, bucket_id: &str) -> Result<Bucket> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        let bucket = self.catalog.create_bucket(bucket_id, Utc::now()).await?;
        self.bytes.create_bucket_dir(bucket_id).await?;
        tracing::info!(bucket_id, "bucket created");
        Ok(bucket)
    }

    pub async fn list_buckets(&self) -> Result<Vec<Bucket>> {
        self.catalog.list_buckets().await
    }

    pub async fn get_bucket(&self, bucket_id: &str) -> Result<Bucket> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        self.catalog.get_bucket(bucket_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_bucket(&self, bucket_id: &str) -> Result<()> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        if !self.catalog.bucket_exists(bucket_id).await? {
            return Err(StoreError::bucket_not_found(bucket_id));
        }

        self.bytes.remove_bucket_dir(bucket_id).await?;
        self.catalog.delete_bucket(bucket_id).await?;
        tracing::info!(bucket_id, "bucket deleted");
        Ok(())
    }

    // Blobs

    #[tracing::instrument(skip(self))]
    pub async fn create_blob(&self, bucket_id: &str, blob_id: &str) -> Result<Blob> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        let blob_id = validate_id("blob_id", blob_id)?;
        let blob = self
            .catalog
            .create_blob(bucket_id, blob_id, Utc::now())
            .await?;
        tracing::info!(bucket_id, blob_id, "blob created");
        Ok(blob)
    }

    /// Append `chunk` to a blob and return its new recorded size.
    #[tracing::instrument(skip(self, chunk), fields(len = chunk.len()))]
    pub async fn append_blob(&self, bucket_id: &str, blob_id: &str, chunk: &[u8]) -> Result<u64> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        let blob_id = validate_id("blob_id", blob_id)?;

        let _guard = self.locks.lock(bucket_id, blob_id).await;
        if !self.catalog.blob_exists(bucket_id, blob_id).await? {
            return Err(StoreError::blob_not_found(bucket_id, blob_id));
        }

        let written = self.bytes.append(bucket_id, blob_id, chunk).await?;
        let size = self
            .catalog
            .increment_blob_size(bucket_id, blob_id, written)
            .await
            .inspect_err(|e| {
                tracing::error!(
                    bucket_id,
                    blob_id,
                    written,
                    error = %e,
                    "bytes appended but size not recorded"
                );
            })?;

        tracing::debug!(bucket_id, blob_id, written, size, "blob appended");
        Ok(size)
    }

    pub async fn get_blob(&self, bucket_id: &str, blob_id: &str) -> Result<Blob> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        let blob_id = validate_id("blob_id", blob_id)?;
        self.catalog.get_blob(bucket_id, blob_id).await
    }

    pub async fn list_blobs(&self, bucket_id: &str) -> Result<Vec<Blob>> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        if !self.catalog.bucket_exists(bucket_id).await? {
            return Err(StoreError::bucket_not_found(bucket_id));
        }
        self.catalog.list_blobs(bucket_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_blob(&self, bucket_id: &str, blob_id: &str) -> Result<()> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        let blob_id = validate_id("blob_id", blob_id)?;

        let _guard = self.locks.lock(bucket_id, blob_id).await;
        if !self.catalog.blob_exists(bucket_id, blob_id).await? {
            return Err(StoreError::blob_not_found(bucket_id, blob_id));
        }

        // Never written, or a previous delete got as far as the file
        if self.bytes.has_file(bucket_id, blob_id).await? {
            self.bytes.delete_file(bucket_id, blob_id).await?;
        }
        self.catalog.delete_blob(bucket_id, blob_id).await?;

        tracing::info!(bucket_id, blob_id, "blob deleted");
        Ok(())
    }

    // Grants

    pub async fn create_grant(&self, bucket_id: &str, blob_id: &str) -> Result<Grant> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        let blob_id = validate_id("blob_id", blob_id)?;
        self.grants.issue(bucket_id, blob_id, Utc::now()).await
    }

    /// Grants currently pointing at a blob.
    pub async fn list_grants(&self, bucket_id: &str, blob_id: &str) -> Result<Vec<Grant>> {
        let bucket_id = validate_id("bucket_id", bucket_id)?;
        let blob_id = validate_id("blob_id", blob_id)?;
        if !self.catalog.blob_exists(bucket_id, blob_id).await? {
            return Err(StoreError::blob_not_found(bucket_id, blob_id));
        }
        self.catalog.list_grants(bucket_id, blob_id).await
    }

    pub async fn delete_grant(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.grants.revoke(key).await
    }

    /// Read the blob behind a grant, whole or as one byte range.
    ///
    /// The range is resolved against the size recorded when the grant was
    /// looked up; appends landing afterwards are not visible to this read.
    #[tracing::instrument(skip(self))]
    pub async fn download(&self, key: &str, range_spec: Option<&str>) -> Result<Download> {
        let key = validate_key(key)?;
        let blob = self.grants.resolve(key).await?;

        let range_spec = range_spec.map(str::trim).filter(|s| !s.is_empty());
        let Some(spec) = range_spec else {
            let data = self.bytes.read_all(&blob.bucket_id, &blob.id).await?;
            tracing::debug!(key, len = data.len(), "full download");
            return Ok(Download {
                blob,
                data,
                range: None,
            });
        };

        let resolved = range::resolve(spec, blob.size, self.max_chunk_size)?;
        let data = self
            .bytes
            .read_range(&blob.bucket_id, &blob.id, resolved.offset, resolved.length)
            .await?;
        tracing::debug!(key, range = %resolved, "ranged download");

        Ok(Download {
            blob,
            data,
            range: Some(resolved),
        })
    }
}

/// Trim and check an identifier that names a directory or file on disk.
fn validate_id<'a>(field: &'static str, id: &'a str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(StoreError::validation(field, "must not be empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(StoreError::validation(
            field,
            format!("must be at most {} bytes", MAX_ID_LEN),
        ));
    }
    if id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
        return Err(StoreError::validation(
            field,
            "must not be a path or contain path separators",
        ));
    }
    Ok(id)
}

fn validate_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(StoreError::validation("key", "must not be empty"));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id("bucket_id", "  b1 ").unwrap(), "b1");
        for bad in ["", "   ", ".", "..", "a/b", "a\\b", "nul\0"] {
            let err = validate_id("bucket_id", bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad:?}");
        }
        let long = "x".repeat(MAX_ID_LEN + 1);
        assert!(validate_id("blob_id", &long).is_err());
    }

    #[tokio::test]
    async fn test_blob_id_cannot_escape_bucket_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new_local(temp_dir.path()).await.unwrap();
        store.create_bucket("b1").await.unwrap();

        let err = store.create_blob("b1", "../escape").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = store.append_blob("b1", "..", b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_lock_entries_are_released() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new_local(temp_dir.path()).await.unwrap();
        store.create_bucket("b1").await.unwrap();
        store.create_blob("b1", "f").await.unwrap();

        store.append_blob("b1", "f", b"abc").await.unwrap();
        store.delete_blob("b1", "f").await.unwrap();
        assert_eq!(store.locks.len(), 0);
    }
}

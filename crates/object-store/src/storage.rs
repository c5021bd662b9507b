//! Filesystem byte store: one directory per bucket, one file per blob.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::error::Result;

/// Raw bytes of every blob, rooted at one directory.
///
/// A blob's file does not exist until its first append. Reads and deletes of
/// a missing file are IO errors; callers decide whether that is expected.
#[derive(Debug, Clone)]
pub struct ByteStore {
    root: PathBuf,
}

impl ByteStore {
    /// Open the store, creating the root directory if needed.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket_id: &str) -> PathBuf {
        self.root.join(bucket_id)
    }

    fn blob_path(&self, bucket_id: &str, blob_id: &str) -> PathBuf {
        self.bucket_path(bucket_id).join(blob_id)
    }

    /// Create the directory holding a bucket's blobs.
    pub async fn create_bucket_dir(&self, bucket_id: &str) -> Result<()> {
        fs::create_dir_all(self.bucket_path(bucket_id)).await?;
        Ok(())
    }

    /// Remove a bucket's directory and every blob file in it.
    pub async fn remove_bucket_dir(&self, bucket_id: &str) -> Result<()> {
        let path = self.bucket_path(bucket_id);
        match fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            // Already gone; the catalog row is still the caller's to remove
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append `chunk` to the end of the blob's file, creating it if absent.
    pub async fn append(&self, bucket_id: &str, blob_id: &str, chunk: &[u8]) -> Result<u64> {
        let path = self.blob_path(bucket_id, blob_id);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        file.write_all(chunk).await?;
        file.flush().await?;

        Ok(chunk.len() as u64)
    }

    /// The blob's full contents.
    pub async fn read_all(&self, bucket_id: &str, blob_id: &str) -> Result<Bytes> {
        let data = fs::read(self.blob_path(bucket_id, blob_id)).await?;
        Ok(Bytes::from(data))
    }

    /// Exactly `length` bytes starting at `offset`.
    pub async fn read_range(
        &self,
        bucket_id: &str,
        blob_id: &str,
        offset: u64,
        length: u64,
    ) -> Result<Bytes> {
        let mut file = fs::File::open(self.blob_path(bucket_id, blob_id)).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let length = usize::try_from(length).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "range length overflows usize")
        })?;
        let mut buf = vec![0u8; length];
        file.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }

    /// Remove the blob's file. A missing file is an error.
    pub async fn delete_file(&self, bucket_id: &str, blob_id: &str) -> Result<()> {
        fs::remove_file(self.blob_path(bucket_id, blob_id)).await?;
        Ok(())
    }

    /// Whether the blob has received at least one write.
    pub async fn has_file(&self, bucket_id: &str, blob_id: &str) -> Result<bool> {
        Ok(fs::try_exists(self.blob_path(bucket_id, blob_id)).await?)
    }
}

//! Error types for the object store.

use crate::range::RangeError;

/// Errors that can occur when working with the object store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Malformed or missing identifier
    #[error("invalid {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: String,
    },

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Entity already exists
    #[error("{0} already exists")]
    Conflict(String),

    /// Range specification rejected by the resolver
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Filesystem error from the byte store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog engine error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Grant key generator ran out of keys for the current millisecond
    #[error("grant key generation failed: {0}")]
    KeyGeneration(#[from] ulid::MonotonicError),
}

/// Coarse classification of a [`StoreError`], used by callers that only care
/// about how to answer a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    BadRange,
    RangeTooLarge,
    /// Filesystem or catalog fault, not attributable to the caller
    StorageIO,
}

impl StoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn bucket_not_found(bucket_id: &str) -> Self {
        StoreError::NotFound(format!("bucket '{}'", bucket_id))
    }

    pub(crate) fn blob_not_found(bucket_id: &str, blob_id: &str) -> Self {
        StoreError::NotFound(format!("blob '{}/{}'", bucket_id, blob_id))
    }

    pub(crate) fn grant_not_found(key: &str) -> Self {
        StoreError::NotFound(format!("access grant '{}'", key))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation { .. } => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Conflict(_) => ErrorKind::Conflict,
            StoreError::Range(RangeError::TooLarge { .. }) => ErrorKind::RangeTooLarge,
            StoreError::Range(_) => ErrorKind::BadRange,
            StoreError::Io(_)
            | StoreError::Database(_)
            | StoreError::Migration(_)
            | StoreError::KeyGeneration(_) => ErrorKind::StorageIO,
        }
    }
}

/// Result type alias for object store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

//! SQLite + Filesystem Object Store
//!
//! This crate provides bucket/blob storage with unauthenticated access grants.
//! Metadata (buckets, blobs, sizes, grants) lives in SQLite; blob bytes live in
//! one file per blob under a root directory.
//!
//! # Features
//!
//! - Append-only blobs whose recorded size tracks the bytes on disk
//! - Cascading deletes: bucket -> blobs -> access grants
//! - Time-ordered ULID grant keys
//! - Single-range `bytes=` downloads capped at a maximum chunk size
//!
//! # Example
//!
//! ```rust,no_run
//! use object_store::ObjectStore;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), object_store::StoreError> {
//! let store = ObjectStore::new_local(Path::new("/tmp/blobs")).await?;
//!
//! store.create_bucket("photos").await?;
//! store.create_blob("photos", "cat.jpg").await?;
//! store.append_blob("photos", "cat.jpg", b"...").await?;
//!
//! let grant = store.create_grant("photos", "cat.jpg").await?;
//! let download = store.download(&grant.key, Some("bytes=0-1")).await?;
//! assert_eq!(download.data.len(), 2);
//! # Ok(())
//! # }
//! ```

mod catalog;
mod error;
mod grants;
mod locks;
mod object_store;
pub mod range;
mod storage;
mod types;

pub use catalog::Catalog;
pub use error::{ErrorKind, Result, StoreError};
pub use grants::GrantIssuer;
pub use object_store::{ObjectStore, ObjectStoreConfig, DEFAULT_MAX_CHUNK_SIZE};
pub use range::{RangeError, ResolvedRange};
pub use storage::ByteStore;
pub use types::{Blob, Bucket, Download, Grant};

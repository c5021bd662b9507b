use std::sync::Arc;

use object_store::{ObjectStore, ObjectStoreConfig, StoreError};

use crate::ServiceConfig;

/// Shared handles every request handler sees.
#[derive(Clone)]
pub struct State {
    store: Arc<ObjectStore>,
    secret_key: Arc<str>,
}

impl State {
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        if config.secret_key.trim().is_empty() {
            return Err(StateSetupError::MissingSecretKey);
        }
        if config.max_chunk_size == 0 {
            return Err(StateSetupError::InvalidMaxChunkSize);
        }

        match &config.sqlite_path {
            Some(path) => tracing::info!(path = %path.display(), "opening catalog"),
            None => tracing::info!("using in-memory catalog"),
        }

        let store_config = ObjectStoreConfig::new(&config.blobs_path, config.sqlite_path.clone())
            .with_max_chunk_size(config.max_chunk_size);
        let store = ObjectStore::new(store_config).await?;

        tracing::info!(
            blobs_path = %config.blobs_path.display(),
            max_chunk_size = config.max_chunk_size,
            "object store ready"
        );

        Ok(Self::new(store, &config.secret_key))
    }

    pub fn new(store: ObjectStore, secret_key: &str) -> Self {
        Self {
            store: Arc::new(store),
            secret_key: Arc::from(secret_key),
        }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }

    pub fn max_chunk_size(&self) -> u64 {
        self.store.max_chunk_size()
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("store", &self.store)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("secret key is empty")]
    MissingSecretKey,
    #[error("max chunk size must be greater than zero")]
    InvalidMaxChunkSize,
    #[error("object store setup failed: {0}")]
    Store(#[from] StoreError),
}

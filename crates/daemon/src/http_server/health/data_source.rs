use std::sync::Arc;

use axum::extract::FromRef;

use crate::ServiceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DataSourceError {
    #[error("one or more dependencies aren't available")]
    DependencyFailure,
}

/// Something whose dependencies can be probed before taking traffic.
#[async_trait::async_trait]
pub trait DataSource: Send + Sync {
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[async_trait::async_trait]
impl DataSource for ServiceState {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.store().catalog().ping().await.map_err(|e| {
            tracing::warn!("catalog ping failed: {}", e);
            DataSourceError::DependencyFailure
        })
    }
}

#[derive(Clone)]
pub struct StateDataSource(Arc<dyn DataSource>);

impl StateDataSource {
    pub fn new(inner: Arc<dyn DataSource>) -> Self {
        Self(inner)
    }

    pub async fn is_ready(&self) -> Result<(), DataSourceError> {
        self.0.is_ready().await
    }
}

impl std::fmt::Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StateDataSource")
    }
}

impl FromRef<ServiceState> for StateDataSource {
    fn from_ref(state: &ServiceState) -> Self {
        Self::new(Arc::new(state.clone()))
    }
}

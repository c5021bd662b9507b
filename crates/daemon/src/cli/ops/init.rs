use std::net::SocketAddr;

use clap::Args;

use coffer_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// HTTP listen address (default: 0.0.0.0:3000)
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Largest append body and downloadable range in bytes (default: 1 MiB)
    #[arg(long)]
    pub max_chunk_size: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig::default();
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(size) = self.max_chunk_size {
            config.max_chunk_size = size;
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized coffer directory at: {}\n\
             - Catalog: {}\n\
             - Blobs: {}\n\
             - Config: {}\n\
             - Listen address: {}\n\
             - Max chunk size: {} bytes\n\
             - Secret key: {}",
            state.coffer_dir.display(),
            state.db_path.display(),
            state.blobs_path.display(),
            state.config_path.display(),
            state.config.listen_addr,
            state.config.max_chunk_size,
            state.config.secret_key,
        );

        Ok(output)
    }
}

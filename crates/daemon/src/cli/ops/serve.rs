use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use coffer_daemon::state::{AppState, StateError};
use coffer_daemon::{spawn_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Override the HTTP listen address (default from config)
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Override the max chunk size in bytes (default from config)
    #[arg(long)]
    pub max_chunk_size: Option<u64>,

    /// Override the bearer secret (default from config)
    #[arg(long, env = "COFFER_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("state error: {0}")]
    StateError(#[from] StateError),
}

impl Serve {
    /// Resolve the service config: flags and environment win over config.toml.
    fn service_config(&self, state: AppState) -> ServiceConfig {
        ServiceConfig {
            listen_addr: self.listen_addr.unwrap_or(state.config.listen_addr),
            secret_key: self
                .secret_key
                .clone()
                .unwrap_or(state.config.secret_key),
            max_chunk_size: self.max_chunk_size.unwrap_or(state.config.max_chunk_size),
            blobs_path: state.blobs_path,
            sqlite_path: Some(state.db_path),
            log_level: self.log_level,
            log_dir: self.log_dir.clone(),
        }
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let config = self.service_config(state);

        spawn_service(&config).await;
        Ok("daemon ended".to_string())
    }
}

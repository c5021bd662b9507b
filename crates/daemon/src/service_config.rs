use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Address the HTTP server binds
    pub listen_addr: SocketAddr,
    /// Bearer token required on management routes
    pub secret_key: String,
    /// Largest append body and downloadable range, in bytes
    pub max_chunk_size: u64,

    // data store configuration
    /// Directory holding one subdirectory per bucket
    pub blobs_path: PathBuf,
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

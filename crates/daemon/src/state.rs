use std::net::SocketAddr;
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use object_store::DEFAULT_MAX_CHUNK_SIZE;

pub const APP_NAME: &str = "coffer";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "metadata.sqlite";
pub const BLOBS_DIR_NAME: &str = "blobs";

/// Bytes of randomness behind a generated secret key
const SECRET_KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP server binds
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Bearer token every management request must present
    pub secret_key: String,
    /// Largest accepted append body and downloadable range, in bytes
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: u64,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_max_chunk_size() -> u64 {
    DEFAULT_MAX_CHUNK_SIZE
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            secret_key: generate_secret_key(),
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

/// A fresh hex-encoded random secret.
pub fn generate_secret_key() -> String {
    let bytes: [u8; SECRET_KEY_LEN] = rand::random();
    hex::encode(bytes)
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the coffer directory (~/.coffer)
    pub coffer_dir: PathBuf,
    /// Path to the SQLite catalog
    pub db_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the coffer directory path (custom or default ~/.coffer)
    pub fn coffer_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new coffer state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let coffer_dir = Self::coffer_dir(custom_path)?;

        if coffer_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&coffer_dir)?;

        let blobs_path = coffer_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;

        let config = config.unwrap_or_default();
        let config_path = coffer_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // Empty file; migrations run when the service opens it
        let db_path = coffer_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            coffer_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the coffer directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let coffer_dir = Self::coffer_dir(custom_path)?;

        if !coffer_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = coffer_dir.join(DB_FILE_NAME);
        let blobs_path = coffer_dir.join(BLOBS_DIR_NAME);
        let config_path = coffer_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !blobs_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOBS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            coffer_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("coffer directory not initialized. Run 'coffer init' first")]
    NotInitialized,

    #[error("coffer directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

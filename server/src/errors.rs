//! Error types for botdock

use thiserror::Error;

/// Main error type for botdock
#[derive(Error, Debug)]
pub enum HostError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Spawn error: {0}")]
    SpawnError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already terminal: {0}")]
    AlreadyTerminal(String),

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for HostError {
    fn from(err: anyhow::Error) -> Self {
        HostError::Internal(err.to_string())
    }
}

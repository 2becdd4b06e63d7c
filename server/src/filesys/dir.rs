//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::HostError;

/// A directory wrapper with path
#[derive(Debug, Clone)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    /// Create a new directory reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the directory exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Create the directory and any missing parents
    pub async fn create(&self) -> Result<(), HostError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Recursively delete the directory if it exists
    pub async fn delete(&self) -> Result<(), HostError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }
}

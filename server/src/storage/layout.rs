//! Storage layout configuration

use std::path::PathBuf;

use uuid::Uuid;

use crate::errors::HostError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Filesystem layout: one working directory and one output sink per
/// deployment id.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Directory holding all fetched source trees
    pub fn deployments_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("deployments"))
    }

    /// Working directory for one deployment (the fetched source tree)
    pub fn deployment_dir(&self, id: &Uuid) -> Dir {
        Dir::new(self.base_dir.join("deployments").join(id.to_string()))
    }

    /// Directory holding all output sinks
    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Output sink for one deployment
    pub fn log_file(&self, id: &Uuid) -> File {
        File::new(
            self.base_dir
                .join("logs")
                .join(format!("{}.log", id)),
        )
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), HostError> {
        self.deployments_dir().create().await?;
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        // Use /var/lib/botdock on Linux, or the user home directory elsewhere
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/var/lib/botdock");

        #[cfg(not(target_os = "linux"))]
        let base_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".botdock");

        Self::new(base_dir)
    }
}

#[cfg(not(target_os = "linux"))]
mod dirs {
    use std::path::PathBuf;

    pub fn home_dir() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}

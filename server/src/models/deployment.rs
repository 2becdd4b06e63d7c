//! Deployment models

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::deploy::fsm::DeploymentStatus;

/// Reference to a user-owned source repository. Immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSource {
    /// Repository owner (GitHub username or organization)
    pub owner: String,

    /// Repository name
    pub repository: String,

    /// Branch to fetch
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Entry point path inside the repository
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
}

pub fn default_branch() -> String {
    "main".to_string()
}

pub fn default_entry_point() -> String {
    "bot.py".to_string()
}

/// The durable deployment record kept in the status store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Unique deployment ID, assigned at creation
    pub id: Uuid,

    /// Source repository reference
    pub source: DeploymentSource,

    /// Current lifecycle status
    pub status: DeploymentStatus,

    /// OS process ID of the supervised child, when one is live
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Location of the output sink for this deployment
    pub log_path: PathBuf,

    /// Failure reason, recorded when the status is Failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Bumped on every status change
    pub updated_at: DateTime<Utc>,
}

impl DeploymentRecord {
    /// Create a new record in the initial Pending state
    pub fn new(id: Uuid, source: DeploymentSource, log_path: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            source,
            status: DeploymentStatus::Pending,
            pid: None,
            log_path,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

//! Status store backends.
//!
//! The status store holds the durable deployment record; live resources
//! (process handles, subscribers) live in the registry, never here. The
//! in-memory implementation is the reference backend and the test double;
//! a durable backend is an external concern behind the same trait.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::deploy::fsm::DeploymentStatus;
use crate::errors::HostError;
use crate::models::deployment::DeploymentRecord;

/// Backend for persisted deployment records.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Insert a new record.
    ///
    /// Returns an error if a record with the same id already exists.
    async fn insert(&self, record: &DeploymentRecord) -> Result<(), HostError>;

    /// Get a record by id. Returns `None` if the id is unknown.
    async fn get(&self, id: &Uuid) -> Result<Option<DeploymentRecord>, HostError>;

    /// Update a record's status, bumping `updated_at` and optionally
    /// recording a failure reason.
    async fn update_status(
        &self,
        id: &Uuid,
        status: DeploymentStatus,
        error: Option<&str>,
    ) -> Result<(), HostError>;

    /// Record or clear the supervised process id.
    async fn set_pid(&self, id: &Uuid, pid: Option<u32>) -> Result<(), HostError>;

    /// List all records, newest first.
    async fn list(&self) -> Result<Vec<DeploymentRecord>, HostError>;

    /// Delete a record. Returns `NotFound` if the id is unknown.
    async fn delete(&self, id: &Uuid) -> Result<(), HostError>;
}

//! In-memory status store

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::deploy::fsm::DeploymentStatus;
use crate::errors::HostError;
use crate::models::deployment::DeploymentRecord;

use super::StatusStore;

/// In-memory status store. Records are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Uuid, DeploymentRecord>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn insert(&self, record: &DeploymentRecord) -> Result<(), HostError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| HostError::StorageError("lock poisoned".to_string()))?;

        if records.contains_key(&record.id) {
            return Err(HostError::StorageError(format!(
                "deployment {} already exists",
                record.id
            )));
        }

        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<DeploymentRecord>, HostError> {
        let records = self
            .records
            .read()
            .map_err(|_| HostError::StorageError("lock poisoned".to_string()))?;

        Ok(records.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &Uuid,
        status: DeploymentStatus,
        error: Option<&str>,
    ) -> Result<(), HostError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| HostError::StorageError("lock poisoned".to_string()))?;

        let record = records
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;

        record.status = status;
        if error.is_some() {
            record.error = error.map(ToOwned::to_owned);
        }
        record.updated_at = chrono::Utc::now();

        Ok(())
    }

    async fn set_pid(&self, id: &Uuid, pid: Option<u32>) -> Result<(), HostError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| HostError::StorageError("lock poisoned".to_string()))?;

        let record = records
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;

        record.pid = pid;
        record.updated_at = chrono::Utc::now();

        Ok(())
    }

    async fn list(&self) -> Result<Vec<DeploymentRecord>, HostError> {
        let records = self
            .records
            .read()
            .map_err(|_| HostError::StorageError("lock poisoned".to_string()))?;

        let mut results: Vec<_> = records.values().cloned().collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(results)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), HostError> {
        let mut records = self
            .records
            .write()
            .map_err(|_| HostError::StorageError("lock poisoned".to_string()))?;

        if records.remove(id).is_none() {
            return Err(HostError::NotFound(id.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::deployment::DeploymentSource;
    use std::path::PathBuf;

    fn test_record() -> DeploymentRecord {
        let source = DeploymentSource {
            owner: "octocat".to_string(),
            repository: "hello-bot".to_string(),
            branch: "main".to_string(),
            entry_point: "bot.py".to_string(),
        };
        let id = Uuid::new_v4();
        DeploymentRecord::new(id, source, PathBuf::from(format!("/tmp/logs/{id}.log")))
    }

    #[tokio::test]
    async fn insert_and_get() {
        let store = MemoryStore::new();

        let record = test_record();
        store.insert(&record).await.expect("insert failed");

        let retrieved = store
            .get(&record.id)
            .await
            .expect("get failed")
            .expect("record not found");

        assert_eq!(retrieved.id, record.id);
        assert_eq!(retrieved.source.owner, "octocat");
        assert_eq!(retrieved.status, DeploymentStatus::Pending);
        assert!(retrieved.pid.is_none());
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let store = MemoryStore::new();

        let record = test_record();
        store.insert(&record).await.expect("first insert failed");
        assert!(store.insert(&record).await.is_err());
    }

    #[tokio::test]
    async fn update_status_records_reason_and_bumps_timestamp() {
        let store = MemoryStore::new();

        let record = test_record();
        let created_at = record.updated_at;
        store.insert(&record).await.expect("insert failed");

        store
            .update_status(&record.id, DeploymentStatus::Failed, Some("clone failed"))
            .await
            .expect("update failed");

        let retrieved = store
            .get(&record.id)
            .await
            .expect("get failed")
            .expect("not found");
        assert_eq!(retrieved.status, DeploymentStatus::Failed);
        assert_eq!(retrieved.error.as_deref(), Some("clone failed"));
        assert!(retrieved.updated_at >= created_at);
    }

    #[tokio::test]
    async fn update_nonexistent_fails() {
        let store = MemoryStore::new();

        let result = store
            .update_status(&Uuid::new_v4(), DeploymentStatus::Running, None)
            .await;
        assert!(matches!(result, Err(HostError::NotFound(_))));
    }

    #[tokio::test]
    async fn set_pid_roundtrip() {
        let store = MemoryStore::new();

        let record = test_record();
        store.insert(&record).await.expect("insert failed");

        store.set_pid(&record.id, Some(4242)).await.expect("set_pid failed");
        let retrieved = store.get(&record.id).await.unwrap().unwrap();
        assert_eq!(retrieved.pid, Some(4242));
    }

    #[tokio::test]
    async fn list_newest_first() {
        let store = MemoryStore::new();

        let first = test_record();
        store.insert(&first).await.expect("insert failed");
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        let second = test_record();
        store.insert(&second).await.expect("insert failed");

        let all = store.list().await.expect("list failed");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[tokio::test]
    async fn delete_twice_yields_not_found() {
        let store = MemoryStore::new();

        let record = test_record();
        store.insert(&record).await.expect("insert failed");

        store.delete(&record.id).await.expect("delete failed");
        assert!(matches!(
            store.delete(&record.id).await,
            Err(HostError::NotFound(_))
        ));
    }
}

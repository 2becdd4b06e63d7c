//! Deployment registry.
//!
//! Concurrency-safe directory of every deployment's live, non-persisted
//! resources: lifecycle FSM, process handle, log broker, pipeline task
//! handle, and filesystem paths. All mutations go through the write lock,
//! so register, status transitions, attach, take-for-stop, and unregister
//! are atomic with respect to concurrent callers. The durable record lives
//! in the status store, never here.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::broker::{LogBroker, Subscription};
use crate::deploy::fsm::{DeploymentEvent, DeploymentFsm, DeploymentStatus};
use crate::deploy::supervisor::ProcessHandle;
use crate::errors::HostError;

/// Live resources for one deployment
pub struct LiveDeployment {
    /// Lifecycle state machine
    pub fsm: DeploymentFsm,

    /// Fetched source tree location
    pub workdir: PathBuf,

    /// Output sink location
    pub sink: PathBuf,

    /// Supervised process, present iff the deployment is live
    pub process: Option<ProcessHandle>,

    /// Log broker, present from Fetching until teardown
    pub broker: Option<LogBroker>,

    /// Pipeline task handle, retained for deterministic cancellation
    pub pipeline: Option<JoinHandle<()>>,
}

/// Concurrency-safe map of deployment id to live resources
#[derive(Default)]
pub struct DeploymentRegistry {
    inner: RwLock<HashMap<Uuid, LiveDeployment>>,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new deployment. At most one set of live resources may
    /// exist per id; a duplicate registration is rejected.
    pub async fn register(
        &self,
        id: Uuid,
        workdir: PathBuf,
        sink: PathBuf,
    ) -> Result<(), HostError> {
        let mut inner = self.inner.write().await;
        if inner.contains_key(&id) {
            return Err(HostError::RegistryError(format!(
                "deployment {} is already registered",
                id
            )));
        }
        inner.insert(
            id,
            LiveDeployment {
                fsm: DeploymentFsm::new(),
                workdir,
                sink,
                process: None,
                broker: None,
                pipeline: None,
            },
        );
        Ok(())
    }

    /// Retain the pipeline task handle for later cancellation
    pub async fn set_pipeline(&self, id: &Uuid, handle: JoinHandle<()>) {
        if let Some(entry) = self.inner.write().await.get_mut(id) {
            entry.pipeline = Some(handle);
        }
    }

    /// Apply a lifecycle event and return the new status
    pub async fn apply(
        &self,
        id: &Uuid,
        event: DeploymentEvent,
    ) -> Result<DeploymentStatus, HostError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        entry.fsm.process(event).map_err(HostError::Internal)
    }

    /// Current status for an id, if registered
    pub async fn status(&self, id: &Uuid) -> Option<DeploymentStatus> {
        self.inner.read().await.get(id).map(|e| e.fsm.status())
    }

    /// Attach the supervised process handle
    pub async fn attach_process(&self, id: &Uuid, process: ProcessHandle) -> Result<(), HostError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        entry.process = Some(process);
        Ok(())
    }

    /// Attach the log broker. If the deployment was removed in the
    /// meantime the broker is closed here so its tail loop cannot leak.
    pub async fn attach_broker(&self, id: &Uuid, broker: LogBroker) -> Result<(), HostError> {
        {
            let mut inner = self.inner.write().await;
            if let Some(entry) = inner.get_mut(id) {
                entry.broker = Some(broker);
                return Ok(());
            }
        }
        broker.close().await;
        Err(HostError::NotFound(id.to_string()))
    }

    /// Atomically claim the live process handle for a stop. Of two
    /// concurrent callers exactly one receives the handle; the other
    /// observes `AlreadyTerminal` or `NotFound`.
    pub async fn begin_stop(&self, id: &Uuid) -> Result<ProcessHandle, HostError> {
        let mut inner = self.inner.write().await;
        let entry = inner
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;

        if entry.fsm.status().is_terminal() {
            return Err(HostError::AlreadyTerminal(format!(
                "deployment {} is {:?}",
                id,
                entry.fsm.status()
            )));
        }

        entry
            .process
            .take()
            .ok_or_else(|| HostError::NotFound(format!("deployment {} has no live process", id)))
    }

    /// Detach the process handle unconditionally. Used by the failure
    /// path, which has already marked the deployment terminal.
    pub async fn take_process(&self, id: &Uuid) -> Option<ProcessHandle> {
        self.inner
            .write()
            .await
            .get_mut(id)
            .and_then(|entry| entry.process.take())
    }

    /// Detach the log broker for teardown
    pub async fn take_broker(&self, id: &Uuid) -> Option<LogBroker> {
        self.inner
            .write()
            .await
            .get_mut(id)
            .and_then(|entry| entry.broker.take())
    }

    /// Subscribe to a deployment's live output
    pub async fn subscribe(&self, id: &Uuid) -> Result<Subscription, HostError> {
        let inner = self.inner.read().await;
        let entry = inner
            .get(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        let broker = entry
            .broker
            .as_ref()
            .ok_or_else(|| HostError::NotFound(format!("deployment {} has no live output", id)))?;
        Ok(broker.subscribe().await)
    }

    /// Detach one subscriber from a deployment's broker
    pub async fn unsubscribe(&self, id: &Uuid, subscriber_id: u64) {
        let inner = self.inner.read().await;
        if let Some(broker) = inner.get(id).and_then(|e| e.broker.as_ref()) {
            broker.unsubscribe(subscriber_id).await;
        }
    }

    /// Remove a deployment's entry, returning its remaining resources
    pub async fn unregister(&self, id: &Uuid) -> Result<LiveDeployment, HostError> {
        self.inner
            .write()
            .await
            .remove(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))
    }

    /// Remove and return every entry. Used at server shutdown.
    pub async fn drain(&self) -> Vec<(Uuid, LiveDeployment)> {
        self.inner.write().await.drain().collect()
    }
}

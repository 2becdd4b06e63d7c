//! Deployment orchestrator.
//!
//! Drives each deployment through its lifecycle: fetch the repository,
//! spawn the supervised process, attach the log broker, and mirror every
//! status transition to the registry and the status store. Failures are
//! terminal; the record always lands in a terminal state or Running, never
//! mid-transition.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::time::timeout;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::options::{BrokerOptions, PipelineOptions};
use crate::broker::LogBroker;
use crate::deploy::fetch;
use crate::deploy::fsm::{DeploymentEvent, DeploymentStatus};
use crate::deploy::supervisor;
use crate::errors::HostError;
use crate::models::deployment::{DeploymentRecord, DeploymentSource};
use crate::registry::DeploymentRegistry;
use crate::storage::layout::StorageLayout;
use crate::store::StatusStore;

/// Orchestrates deployment pipelines against the shared registry and store.
/// Cheap to clone; every pipeline task carries its own copy.
#[derive(Clone)]
pub struct Orchestrator {
    registry: Arc<DeploymentRegistry>,
    store: Arc<dyn StatusStore>,
    layout: StorageLayout,
    pipeline: PipelineOptions,
    broker: BrokerOptions,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<DeploymentRegistry>,
        store: Arc<dyn StatusStore>,
        layout: StorageLayout,
        pipeline: PipelineOptions,
        broker: BrokerOptions,
    ) -> Self {
        Self {
            registry,
            store,
            layout,
            pipeline,
            broker,
        }
    }

    /// Create a deployment and launch its pipeline. Returns the new id
    /// immediately; the pipeline runs as its own task.
    pub async fn start(
        &self,
        source: DeploymentSource,
        credential: SecretString,
    ) -> Result<Uuid, HostError> {
        let id = Uuid::new_v4();
        let workdir = self.layout.deployment_dir(&id);
        let sink = self.layout.log_file(&id);

        let record = DeploymentRecord::new(id, source.clone(), sink.path().to_path_buf());
        self.store.insert(&record).await?;
        self.registry
            .register(id, workdir.path().to_path_buf(), sink.path().to_path_buf())
            .await?;

        info!(
            "Deployment {} created for {}/{} (branch: {})",
            id, source.owner, source.repository, source.branch
        );

        let this = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = this.run_pipeline(id, source, credential).await {
                error!("Deployment {} failed: {}", id, e);
                this.fail(id, &e.to_string()).await;
            }
        });
        self.registry.set_pipeline(&id, handle).await;

        Ok(id)
    }

    async fn run_pipeline(
        &self,
        id: Uuid,
        source: DeploymentSource,
        credential: SecretString,
    ) -> Result<(), HostError> {
        // Fetching: create the output sink first so observers can attach to
        // the clone output, then bring up the tail loop.
        self.transition(&id, DeploymentEvent::Fetch).await?;

        let workdir = self.layout.deployment_dir(&id);
        let sink = self.layout.log_file(&id);
        sink.append_string("Starting deployment...\n").await?;

        let broker = LogBroker::tail(sink.path().to_path_buf(), self.broker.poll_interval);
        self.registry.attach_broker(&id, broker).await?;

        timeout(
            self.pipeline.fetch_timeout,
            fetch::fetch_repository(
                &self.pipeline.remote_base,
                &source,
                &credential,
                workdir.path(),
                &sink,
            ),
        )
        .await
        .map_err(|_| {
            HostError::FetchError(format!(
                "fetch timed out after {:?}",
                self.pipeline.fetch_timeout
            ))
        })??;

        // Starting
        self.transition(&id, DeploymentEvent::Spawn).await?;

        let runner = self.pipeline.runner.clone();
        let entry_point = source.entry_point.clone();
        let workdir_path = workdir.path().to_path_buf();
        let sink_path = sink.path().to_path_buf();
        let process = timeout(self.pipeline.spawn_timeout, async move {
            supervisor::spawn(&runner, &entry_point, &workdir_path, &sink_path)
        })
        .await
        .map_err(|_| {
            HostError::SpawnError(format!(
                "spawn timed out after {:?}",
                self.pipeline.spawn_timeout
            ))
        })??;

        let pid = process.pid();
        self.registry.attach_process(&id, process).await?;
        self.store.set_pid(&id, Some(pid)).await?;

        // Running
        self.transition(&id, DeploymentEvent::Started).await?;
        info!("Deployment {} is running (pid {})", id, pid);

        Ok(())
    }

    /// Gracefully stop a live deployment and tear down its broker
    pub async fn stop(&self, id: &Uuid) -> Result<(), HostError> {
        let process = self.registry.begin_stop(id).await?;
        let pid = process.pid();

        info!("Stopping deployment {} (pid {})", id, pid);
        if let Err(e) = process.terminate(self.pipeline.grace_period).await {
            warn!("Error terminating process {} for {}: {}", pid, id, e);
        }

        self.transition(id, DeploymentEvent::Stop).await?;

        if let Some(broker) = self.registry.take_broker(id).await {
            broker.close().await;
        }

        info!("Deployment {} stopped", id);
        Ok(())
    }

    /// Stop if live, then remove the deployment's record, working
    /// directory, and output sink. A second delete yields `NotFound`.
    pub async fn delete(&self, id: &Uuid) -> Result<(), HostError> {
        match self.stop(id).await {
            Ok(()) => {}
            Err(HostError::NotFound(_)) | Err(HostError::AlreadyTerminal(_)) => {}
            Err(e) => return Err(e),
        }

        if let Ok(mut live) = self.registry.unregister(id).await {
            let _ = live.fsm.process(DeploymentEvent::Delete);
            if let Some(handle) = live.pipeline.take() {
                handle.abort();
            }
            if let Some(broker) = live.broker.take() {
                broker.close().await;
            }
            if let Some(process) = live.process.take() {
                let _ = process.terminate(self.pipeline.grace_period).await;
            }
        }

        self.layout.deployment_dir(id).delete().await?;
        self.layout.log_file(id).delete().await?;

        self.store.delete(id).await?;
        info!("Deployment {} deleted", id);
        Ok(())
    }

    /// Stop every live deployment and release its resources. Used at
    /// server shutdown; durable records are left intact.
    pub async fn shutdown_all(&self) {
        for (id, mut live) in self.registry.drain().await {
            if let Some(handle) = live.pipeline.take() {
                handle.abort();
            }
            if let Some(process) = live.process.take() {
                info!("Stopping deployment {} for shutdown", id);
                if let Err(e) = process.terminate(self.pipeline.grace_period).await {
                    warn!("Error terminating process for {}: {}", id, e);
                }
                let _ = self
                    .store
                    .update_status(&id, DeploymentStatus::Stopped, None)
                    .await;
            }
            if let Some(broker) = live.broker.take() {
                broker.close().await;
            }
        }
    }

    /// Apply a lifecycle event to the registry and mirror the resulting
    /// status to the store
    async fn transition(&self, id: &Uuid, event: DeploymentEvent) -> Result<(), HostError> {
        let status = self.registry.apply(id, event).await?;
        self.store.update_status(id, status, None).await?;
        Ok(())
    }

    /// Terminal failure path: record the reason and release any partially
    /// acquired resources so the deployment never sits mid-transition.
    async fn fail(&self, id: Uuid, reason: &str) {
        if let Err(e) = self
            .registry
            .apply(&id, DeploymentEvent::Fail(reason.to_string()))
            .await
        {
            warn!("Could not mark {} failed in registry: {}", id, e);
        }
        if let Err(e) = self
            .store
            .update_status(&id, DeploymentStatus::Failed, Some(reason))
            .await
        {
            warn!("Could not mark {} failed in store: {}", id, e);
        }

        if let Some(process) = self.registry.take_process(&id).await {
            let _ = process.terminate(self.pipeline.grace_period).await;
        }
        if let Some(broker) = self.registry.take_broker(&id).await {
            broker.close().await;
        }
    }
}

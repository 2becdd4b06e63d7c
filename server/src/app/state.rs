//! Application state

use std::sync::Arc;

use crate::app::options::AppOptions;
use crate::deploy::orchestrator::Orchestrator;
use crate::errors::HostError;
use crate::registry::DeploymentRegistry;
use crate::store::{MemoryStore, StatusStore};

/// Shared application state: the registry of live resources, the status
/// store, and the orchestrator wired to both.
pub struct AppState {
    pub registry: Arc<DeploymentRegistry>,
    pub store: Arc<dyn StatusStore>,
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    /// Initialize the application state and prepare the storage layout
    pub async fn init(options: &AppOptions) -> Result<Arc<AppState>, HostError> {
        options.storage.layout.setup().await?;

        let registry = Arc::new(DeploymentRegistry::new());
        let store: Arc<dyn StatusStore> = Arc::new(MemoryStore::new());

        let orchestrator = Arc::new(Orchestrator::new(
            registry.clone(),
            store.clone(),
            options.storage.layout.clone(),
            options.pipeline.clone(),
            options.broker.clone(),
        ));

        Ok(Arc::new(AppState {
            registry,
            store,
            orchestrator,
        }))
    }

    /// Stop every live deployment and release its resources
    pub async fn shutdown(&self) {
        self.orchestrator.shutdown_all().await;
    }
}

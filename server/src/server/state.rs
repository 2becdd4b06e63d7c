//! Server state

use std::sync::Arc;

use crate::deploy::orchestrator::Orchestrator;
use crate::registry::DeploymentRegistry;
use crate::store::StatusStore;

/// Server state shared across handlers
pub struct ServerState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<DeploymentRegistry>,
    pub store: Arc<dyn StatusStore>,
}

impl ServerState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        registry: Arc<DeploymentRegistry>,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            orchestrator,
            registry,
            store,
        }
    }
}

//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::HostError;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the botdock server until the shutdown signal fires
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), HostError> {
    info!("Initializing botdock...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(options.lifecycle.clone());

    if let Err(e) = init(&options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start botdock: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    info!("botdock is ready");
    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    let _ = shutdown_tx.send(());
    shutdown_manager.shutdown().await
}

async fn init(
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<AppState>, HostError> {
    let app_state = AppState::init(options).await?;
    shutdown_manager.with_app_state(app_state.clone())?;

    let server_state = ServerState::new(
        app_state.orchestrator.clone(),
        app_state.registry.clone(),
        app_state.store.clone(),
    );

    let mut shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;
    shutdown_manager.with_server_handle(server_handle)?;

    Ok(app_state)
}

struct ShutdownManager {
    lifecycle_options: LifecycleOptions,
    app_state: Option<Arc<AppState>>,
    server_handle: Option<JoinHandle<Result<(), HostError>>>,
}

impl ShutdownManager {
    fn new(lifecycle_options: LifecycleOptions) -> Self {
        Self {
            lifecycle_options,
            app_state: None,
            server_handle: None,
        }
    }

    fn with_app_state(&mut self, state: Arc<AppState>) -> Result<(), HostError> {
        if self.app_state.is_some() {
            return Err(HostError::ShutdownError("app_state already set".to_string()));
        }
        self.app_state = Some(state);
        Ok(())
    }

    fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), HostError>>,
    ) -> Result<(), HostError> {
        if self.server_handle.is_some() {
            return Err(HostError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), HostError> {
        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), HostError> {
        info!("Shutting down botdock...");

        // 1. HTTP server (graceful shutdown already triggered)
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| HostError::ShutdownError(e.to_string()))??;
        }

        // 2. Live deployments
        if let Some(state) = self.app_state.take() {
            state.shutdown().await;
        }

        info!("Shutdown complete");
        Ok(())
    }
}

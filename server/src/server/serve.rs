//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::HostError;
use crate::server::handlers::{
    create_deployment_handler, delete_deployment_handler, get_deployment_handler, health_handler,
    list_deployments_handler, stop_deployment_handler,
};
use crate::server::state::ServerState;
use crate::server::ws::logs_handler;

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), HostError>>, HostError> {
    let app = Router::new()
        // Health
        .route("/health", get(health_handler))
        // Deployments
        .route("/deployments", post(create_deployment_handler))
        .route("/deployments", get(list_deployments_handler))
        .route("/deployments/{id}", get(get_deployment_handler))
        .route("/deployments/{id}", delete(delete_deployment_handler))
        .route("/deployments/{id}/stop", post(stop_deployment_handler))
        // Live log stream
        .route("/deployments/{id}/logs", get(logs_handler))
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| HostError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| HostError::ServerError(e.to_string()))
    });

    Ok(handle)
}

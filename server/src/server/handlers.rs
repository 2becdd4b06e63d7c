//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::HostError;
use crate::models::deployment::{
    default_branch, default_entry_point, DeploymentRecord, DeploymentSource,
};
use crate::server::state::ServerState;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: HostError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        HostError::NotFound(_) => StatusCode::NOT_FOUND,
        HostError::AlreadyTerminal(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "botdock".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create deployment request
#[derive(Debug, Deserialize)]
pub struct CreateDeploymentRequest {
    /// Repository owner
    pub owner: String,

    /// Repository name
    pub repository: String,

    /// Branch to fetch
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Entry point path inside the repository
    #[serde(default = "default_entry_point")]
    pub entry_point: String,

    /// Access token used only to authenticate the fetch; never persisted
    pub credential: SecretString,
}

/// Create deployment response
#[derive(Debug, Serialize)]
pub struct CreateDeploymentResponse {
    pub id: Uuid,
    pub message: String,
}

/// Create deployment handler. Acknowledges immediately; the pipeline runs
/// asynchronously.
pub async fn create_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<CreateDeploymentRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let source = DeploymentSource {
        owner: request.owner,
        repository: request.repository,
        branch: request.branch,
        entry_point: request.entry_point,
    };

    let id = state
        .orchestrator
        .start(source, request.credential)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateDeploymentResponse {
            id,
            message: "Deployment started".to_string(),
        }),
    ))
}

/// List deployments response
#[derive(Debug, Serialize)]
pub struct ListDeploymentsResponse {
    pub deployments: Vec<DeploymentRecord>,
    pub total: usize,
}

/// List deployments handler
pub async fn list_deployments_handler(
    State(state): State<Arc<ServerState>>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let deployments = state.store.list().await.map_err(error_response)?;
    let total = deployments.len();

    Ok(Json(ListDeploymentsResponse { deployments, total }))
}

/// Single deployment handler
pub async fn get_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let record = state
        .store
        .get(&id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| error_response(HostError::NotFound(id.to_string())))?;

    Ok(Json(record))
}

/// Operation acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Stop deployment handler
pub async fn stop_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    state
        .orchestrator
        .stop(&id)
        .await
        .map_err(error_response)?;

    Ok(Json(MessageResponse {
        message: "Deployment stopped".to_string(),
    }))
}

/// Delete deployment handler
pub async fn delete_deployment_handler(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    state
        .orchestrator
        .delete(&id)
        .await
        .map_err(error_response)?;

    Ok(Json(MessageResponse {
        message: "Deployment deleted".to_string(),
    }))
}

//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use http::header;
use openapi_server::models::{ApiReturn, HealthResponse, VersionResponse};
use tracing::{info, warn};

use crate::export;
use crate::models::deployment::DeploymentParams;
use crate::server::state::ServerState;
use crate::utils::version_info;

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "cloudbridge".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Deployment create handler
pub async fn deployment_create_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<DeploymentParams>, JsonRejection>,
) -> Json<ApiReturn> {
    match body {
        Ok(Json(params)) => Json(state.coordinator.create(params).await),
        Err(rejection) => Json(malformed_request(rejection)),
    }
}

/// Deployment delete handler
pub async fn deployment_delete_handler(
    State(state): State<Arc<ServerState>>,
    body: Result<Json<DeploymentParams>, JsonRejection>,
) -> Json<ApiReturn> {
    match body {
        Ok(Json(params)) => Json(state.coordinator.delete(params).await),
        Err(rejection) => Json(malformed_request(rejection)),
    }
}

fn malformed_request(rejection: JsonRejection) -> ApiReturn {
    let message = rejection.body_text();
    warn!("Rejected deployment request body: {}", message);
    ApiReturn::error(message)
}

/// Deployment status handler
pub async fn deployment_status_handler(State(state): State<Arc<ServerState>>) -> Json<ApiReturn> {
    Json(state.coordinator.status().await)
}

/// Deployment logs download handler
pub async fn deployment_logs_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    info!("Received logs request");
    let archive = export::export(&state.coordinator.layout().log_entries()).await;
    info!("Logs request finalized");

    (
        [
            (header::CONTENT_TYPE, "application/zip"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"logs.zip\""),
        ],
        archive,
    )
}

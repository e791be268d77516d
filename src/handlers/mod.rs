//! # API Handlers
//!
//! HTTP endpoint handlers for the Reports service.

use axum::extract::State;
use axum::response::Json;

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod history;
pub mod runs;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe that verifies database connectivity
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    db::health_check(&state.db).await.map_err(|e| {
        tracing::error!(error = %e, "Health check failed");
        ApiError::internal("Database unreachable")
    })?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

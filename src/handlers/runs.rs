//! # Manual Run Handlers
//!
//! Handler for triggering one connector's report pipeline outside its
//! schedule. The run claims the same ledger key as the scheduled path, so a
//! manual run and the scheduled run of the same minute cannot double-send.

use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dispatch::RunOutcome;
use crate::error::ApiError;
use crate::repositories::ConnectorRepository;
use crate::schedule::ReportSchedule;
use crate::server::AppState;

/// Response payload for a manual run
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RunResponse {
    /// Occurrence minute the run was recorded under
    #[schema(example = "2024-01-15T07:30:00Z")]
    pub occurrence_at: String,
    /// Terminal outcome of the run
    #[schema(example = "sent")]
    pub outcome: String,
}

/// Trigger one connector's report pipeline immediately
#[utoipa::path(
    post,
    path = "/tenants/{tenant_id}/connectors/{connector_id}/runs",
    params(
        ("tenant_id" = String, Path, description = "Tenant ID (UUID)"),
        ("connector_id" = String, Path, description = "Connector ID (UUID)")
    ),
    responses(
        (status = 200, description = "Run finished", body = RunResponse),
        (status = 404, description = "Connector not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "runs"
)]
pub async fn trigger_run(
    State(state): State<AppState>,
    Path((tenant_id, connector_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RunResponse>, ApiError> {
    let connectors = ConnectorRepository::new(state.db.clone());
    let connector = connectors
        .find_by_tenant(tenant_id, connector_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Connector not found"))?;

    let occurrence = ReportSchedule::occurrence_for(Utc::now());
    let outcome = state.dispatcher.run_connector(connector, occurrence).await;

    let outcome = match outcome {
        RunOutcome::Sent => "sent",
        RunOutcome::Skipped => "skipped",
        RunOutcome::Failed => "failed",
    };

    Ok(Json(RunResponse {
        occurrence_at: occurrence.to_rfc3339(),
        outcome: outcome.to_string(),
    }))
}

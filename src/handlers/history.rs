//! # History API Handlers
//!
//! Handlers exposing the report history ledger for the admin view.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, validation_error};
use crate::models::report_history;
use crate::repositories::ReportHistoryRepository;
use crate::server::AppState;

const DEFAULT_LIMIT: u64 = 50;
const MAX_LIMIT: u64 = 100;

/// Query parameters for listing report history
#[derive(Debug, Deserialize)]
pub struct ListHistoryQuery {
    /// Maximum number of rows to return (default: 50, max: 100)
    pub limit: Option<u64>,
}

/// One ledger row in the history response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    /// Unique identifier of the ledger row
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Scheduled occurrence this row records
    #[schema(example = "2024-01-15T07:30:00Z")]
    pub occurrence_at: String,
    /// Current status of the occurrence
    #[schema(example = "sent")]
    pub status: String,
    /// Error classification for failed occurrences
    #[schema(example = "fetch")]
    pub error_class: Option<String>,
    /// Human-readable error message for failed occurrences
    pub error_message: Option<String>,
    /// Truncated plain-text preview of the delivered artifact
    pub preview: Option<String>,
    /// Timestamp when delivery completed
    #[schema(example = "2024-01-15T07:30:04Z")]
    pub sent_at: Option<String>,
    /// Timestamp when the row expires from retention
    #[schema(example = "2024-04-14T07:30:00Z")]
    pub expires_at: String,
}

/// Response payload for the history listing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    /// Ledger rows, newest occurrence first
    pub entries: Vec<HistoryEntry>,
}

impl From<report_history::Model> for HistoryEntry {
    fn from(model: report_history::Model) -> Self {
        Self {
            id: model.id.to_string(),
            occurrence_at: model.occurrence_at.to_rfc3339(),
            status: model.status,
            error_class: model.error_class,
            error_message: model.error_message,
            preview: model.preview,
            sent_at: model.sent_at.map(|dt| dt.to_rfc3339()),
            expires_at: model.expires_at.to_rfc3339(),
        }
    }
}

/// List report history for one connector within a tenant
#[utoipa::path(
    get,
    path = "/tenants/{tenant_id}/connectors/{connector_id}/history",
    params(
        ("tenant_id" = String, Path, description = "Tenant ID (UUID)"),
        ("connector_id" = String, Path, description = "Connector ID (UUID)"),
        ("limit" = Option<u64>, Query, description = "Maximum number of rows to return (default 50, max 100)")
    ),
    responses(
        (status = 200, description = "Ledger rows for the connector", body = HistoryResponse),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 404, description = "Connector not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "history"
)]
pub async fn list_history(
    State(state): State<AppState>,
    Path((tenant_id, connector_id)): Path<(Uuid, Uuid)>,
    Query(params): Query<ListHistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = match params.limit {
        Some(0) => return Err(validation_error("limit", "Minimum allowed limit is 1")),
        Some(l) if l > MAX_LIMIT => {
            return Err(validation_error("limit", "Maximum allowed limit is 100"));
        }
        Some(l) => l,
        None => DEFAULT_LIMIT,
    };

    let connectors = crate::repositories::ConnectorRepository::new(state.db.clone());
    if connectors
        .find_by_tenant(tenant_id, connector_id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found("Connector not found"));
    }

    let history = ReportHistoryRepository::new(state.db.clone(), state.history_retention_days);
    let rows = history
        .list_by_connector(tenant_id, connector_id, limit)
        .await?;

    Ok(Json(HistoryResponse {
        entries: rows.into_iter().map(HistoryEntry::from).collect(),
    }))
}

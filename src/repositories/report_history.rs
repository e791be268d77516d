//! # ReportHistory Repository
//!
//! Repository operations for the report_history ledger. The unique index on
//! (connector_id, occurrence_at) is the idempotency guarantee: whichever
//! writer inserts the `processing` row first owns the occurrence, every
//! other writer observes a unique violation and backs off.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::error::{ApiError, is_unique_violation, map_db_err};
use crate::models::report_history::{ActiveModel, Column, Entity, Model, status};

/// Outcome of attempting to claim an occurrence.
#[derive(Debug)]
pub enum ClaimOutcome {
    /// This writer owns the occurrence; run the pipeline.
    Claimed(Model),
    /// Another row already exists for (connector, occurrence); skip.
    AlreadyHandled,
}

/// Repository for report history ledger operations
pub struct ReportHistoryRepository {
    db: DatabaseConnection,
    retention_days: i64,
}

impl ReportHistoryRepository {
    pub fn new(db: DatabaseConnection, retention_days: i64) -> Self {
        Self { db, retention_days }
    }

    /// Claim an occurrence by inserting its `processing` row. Exactly one
    /// caller per (connector, occurrence) wins; the rest get
    /// [`ClaimOutcome::AlreadyHandled`].
    pub async fn record_processing(
        &self,
        connector_id: Uuid,
        tenant_id: Uuid,
        occurrence_at: DateTime<Utc>,
    ) -> Result<ClaimOutcome, ApiError> {
        let now = Utc::now().fixed_offset();
        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            connector_id: Set(connector_id),
            tenant_id: Set(tenant_id),
            occurrence_at: Set(occurrence_at.fixed_offset()),
            status: Set(status::PROCESSING.to_string()),
            error_class: Set(None),
            error_message: Set(None),
            preview: Set(None),
            sent_at: Set(None),
            created_at: Set(now),
            expires_at: Set((Utc::now() + Duration::days(self.retention_days)).fixed_offset()),
        };

        match row.insert(&self.db).await {
            Ok(model) => Ok(ClaimOutcome::Claimed(model)),
            Err(e) if is_unique_violation(&e) => {
                tracing::debug!(
                    connector_id = %connector_id,
                    occurrence_at = %occurrence_at,
                    "Occurrence already claimed, skipping"
                );
                Ok(ClaimOutcome::AlreadyHandled)
            }
            Err(e) => Err(map_db_err("Failed to claim report occurrence", e)),
        }
    }

    /// Mark an occurrence as delivered, storing the artifact preview.
    pub async fn record_sent(&self, row_id: Uuid, preview: &str) -> Result<Model, ApiError> {
        let row = self.require(row_id).await?;
        let mut active: ActiveModel = row.into();
        active.status = Set(status::SENT.to_string());
        active.preview = Set(Some(preview.to_string()));
        active.sent_at = Set(Some(Utc::now().fixed_offset()));

        active
            .update(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to record sent outcome", e))
    }

    /// Mark an occurrence as failed with its error class and a message that
    /// must already be credential-free.
    pub async fn record_failed(
        &self,
        row_id: Uuid,
        error_class: &str,
        error_message: &str,
    ) -> Result<Model, ApiError> {
        let row = self.require(row_id).await?;
        let mut active: ActiveModel = row.into();
        active.status = Set(status::FAILED.to_string());
        active.error_class = Set(Some(error_class.to_string()));
        active.error_message = Set(Some(error_message.to_string()));

        active
            .update(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to record failed outcome", e))
    }

    /// Whether a ledger row already exists for (connector, occurrence).
    pub async fn is_already_handled(
        &self,
        connector_id: Uuid,
        occurrence_at: DateTime<Utc>,
    ) -> Result<bool, ApiError> {
        let existing = Entity::find()
            .filter(Column::ConnectorId.eq(connector_id))
            .filter(Column::OccurrenceAt.eq(occurrence_at.fixed_offset()))
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to check report occurrence", e))?;
        Ok(existing.is_some())
    }

    /// List ledger rows for one connector within a tenant, newest first.
    pub async fn list_by_connector(
        &self,
        tenant_id: Uuid,
        connector_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Model>, ApiError> {
        Entity::find()
            .filter(Column::TenantId.eq(tenant_id))
            .filter(Column::ConnectorId.eq(connector_id))
            .order_by_desc(Column::OccurrenceAt)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to list report history", e))
    }

    /// Delete rows whose expiry has passed. Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, ApiError> {
        let result = Entity::delete_many()
            .filter(Column::ExpiresAt.lte(now.fixed_offset()))
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to purge expired report history", e))?;
        Ok(result.rows_affected)
    }

    async fn require(&self, row_id: Uuid) -> Result<Model, ApiError> {
        Entity::find_by_id(row_id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to load report history row", e))?
            .ok_or_else(|| {
                tracing::error!(row_id = %row_id, "Report history row not found");
                ApiError::not_found("Report history row not found")
            })
    }
}

//! # Connector Repository
//!
//! Repository operations for the connectors table.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::error::{ApiError, map_db_err};
use crate::models::connector::{Column, Entity, Model};

/// Repository for connector database operations
pub struct ConnectorRepository {
    db: DatabaseConnection,
}

impl ConnectorRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// List every enabled connector, for the scheduler tick.
    pub async fn list_enabled(&self) -> Result<Vec<Model>, ApiError> {
        Entity::find()
            .filter(Column::Enabled.eq(true))
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to list enabled connectors", e))
    }

    /// Find a connector by ID, ensuring it belongs to the specified tenant
    pub async fn find_by_tenant(
        &self,
        tenant_id: Uuid,
        connector_id: Uuid,
    ) -> Result<Option<Model>, ApiError> {
        Entity::find_by_id(connector_id)
            .filter(Column::TenantId.eq(tenant_id))
            .one(&self.db)
            .await
            .map_err(|e| map_db_err("Failed to find connector", e))
    }
}

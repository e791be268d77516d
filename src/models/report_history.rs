//! ReportHistory entity model
//!
//! This module contains the SeaORM entity model for the report_history table,
//! the audit and idempotency ledger for report occurrences. Rows are created
//! in `processing` state, move to exactly one terminal state (`sent` or
//! `failed`), and are deleted by the retention sweep once expired.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

use super::connector::Entity as Connector;

/// One ledger row per (connector, scheduled occurrence)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "report_history")]
pub struct Model {
    /// Unique identifier for the ledger row (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Connector this occurrence belongs to
    pub connector_id: Uuid,

    /// Tenant identifier for scoped listings
    pub tenant_id: Uuid,

    /// The scheduled occurrence timestamp (minute precision, UTC); the
    /// dedup key together with connector_id
    pub occurrence_at: DateTimeWithTimeZone,

    /// Current status: processing, sent or failed
    pub status: String,

    /// Error classification for failed occurrences (e.g. "fetch", "parse")
    pub error_class: Option<String>,

    /// Human-readable error message, never containing credentials
    pub error_message: Option<String>,

    /// Truncated plain-text preview of the delivered artifact
    pub preview: Option<String>,

    /// Timestamp when delivery completed
    pub sent_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the row was created
    pub created_at: DateTimeWithTimeZone,

    /// Expiry marker; rows past this instant are removed by the sweep
    pub expires_at: DateTimeWithTimeZone,
}

/// Ledger row statuses.
pub mod status {
    pub const PROCESSING: &str = "processing";
    pub const SENT: &str = "sent";
    pub const FAILED: &str = "failed";
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Connector",
        from = "Column::ConnectorId",
        to = "super::connector::Column::Id"
    )]
    Connector,
}

impl Related<Connector> for Entity {
    fn to() -> RelationDef {
        Relation::Connector.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Connector entity model
//!
//! This module contains the SeaORM entity model for the connectors table.
//! A connector is one report subscription: a telemetry source, an optional
//! credential, a delivery address and a schedule, owned by a tenant user.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

use super::tenant::Entity as Tenant;

/// Connector entity representing one scheduled report subscription
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "connectors")]
pub struct Model {
    /// Unique identifier for the connector (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Tenant identifier for multi-tenancy
    pub tenant_id: Uuid,

    /// Identifier of the owning user account
    pub user_id: Uuid,

    /// Display name for the subscription
    pub name: String,

    /// Telemetry source endpoint URL
    pub endpoint_url: String,

    /// Optional bearer credential sent with source fetches
    pub bearer_token: Option<String>,

    /// Explicit delivery address; falls back to the account email when unset
    pub report_email: Option<String>,

    /// Email of the owning account, used as the delivery fallback
    pub account_email: String,

    /// Recipient locale for narrative and subject formatting (e.g. "it", "en")
    pub locale: String,

    /// Schedule frequency: daily, weekly or monthly
    pub frequency: String,

    /// Scheduled delivery time as "HH:MM" in UTC
    pub send_time: String,

    /// Day of week (0 = Sunday .. 6 = Saturday), required for weekly schedules
    pub day_of_week: Option<i16>,

    /// Day of month (1..=28), required for monthly schedules
    pub day_of_month: Option<i16>,

    /// Whether the subscription is active
    pub enabled: bool,

    /// Timestamp when the connector was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the connector was last updated
    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Address reports for this connector are delivered to.
    pub fn delivery_address(&self) -> &str {
        match self.report_email.as_deref() {
            Some(addr) if !addr.trim().is_empty() => addr,
            _ => &self.account_email,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Tenant",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<Tenant> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

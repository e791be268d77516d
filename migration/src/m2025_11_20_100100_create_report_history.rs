//! Migration to create the report_history table.
//!
//! One row per (connector, scheduled occurrence). The unique index on that
//! pair is the idempotency anchor: a second attempt at the same occurrence
//! hits a unique violation instead of producing a duplicate send.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReportHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReportHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReportHistory::ConnectorId).uuid().not_null())
                    .col(ColumnDef::new(ReportHistory::TenantId).uuid().not_null())
                    .col(
                        ColumnDef::new(ReportHistory::OccurrenceAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReportHistory::Status)
                            .text()
                            .not_null()
                            .default("processing"),
                    )
                    .col(ColumnDef::new(ReportHistory::ErrorClass).text().null())
                    .col(ColumnDef::new(ReportHistory::ErrorMessage).text().null())
                    .col(ColumnDef::new(ReportHistory::Preview).text().null())
                    .col(
                        ColumnDef::new(ReportHistory::SentAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ReportHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ReportHistory::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_history_connector_id")
                            .from(ReportHistory::Table, ReportHistory::ConnectorId)
                            .to(Connectors::Table, Connectors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The idempotency key: one row per connector occurrence
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE UNIQUE INDEX IF NOT EXISTS uq_report_history_connector_occurrence ON report_history (connector_id, occurrence_at)".to_string(),
            ))
            .await?;

        // Index for the retention sweep
        manager
            .create_index(
                Index::create()
                    .name("idx_report_history_expires_at")
                    .table(ReportHistory::Table)
                    .col(ReportHistory::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        // Index for tenant history listings, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_report_history_tenant_connector_occurrence")
                    .table(ReportHistory::Table)
                    .col(ReportHistory::TenantId)
                    .col(ReportHistory::ConnectorId)
                    .col(ReportHistory::OccurrenceAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("uq_report_history_connector_occurrence")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_report_history_expires_at")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_report_history_tenant_connector_occurrence")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ReportHistory::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReportHistory {
    Table,
    Id,
    ConnectorId,
    TenantId,
    OccurrenceAt,
    Status,
    ErrorClass,
    ErrorMessage,
    Preview,
    SentAt,
    CreatedAt,
    ExpiresAt,
}

#[derive(DeriveIden)]
enum Connectors {
    Table,
    Id,
}

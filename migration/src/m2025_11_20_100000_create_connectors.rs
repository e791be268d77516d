//! Migration to create the connectors table.
//!
//! A connector is one report subscription: a telemetry source endpoint, an
//! optional bearer credential, a destination address and a delivery schedule,
//! owned by a tenant user.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Connectors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Connectors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Connectors::TenantId).uuid().not_null())
                    .col(ColumnDef::new(Connectors::UserId).uuid().not_null())
                    .col(ColumnDef::new(Connectors::Name).text().not_null())
                    .col(ColumnDef::new(Connectors::EndpointUrl).text().not_null())
                    .col(ColumnDef::new(Connectors::BearerToken).text().null())
                    .col(ColumnDef::new(Connectors::ReportEmail).text().null())
                    .col(ColumnDef::new(Connectors::AccountEmail).text().not_null())
                    .col(
                        ColumnDef::new(Connectors::Locale)
                            .text()
                            .not_null()
                            .default("it"),
                    )
                    .col(ColumnDef::new(Connectors::Frequency).text().not_null())
                    .col(ColumnDef::new(Connectors::SendTime).text().not_null())
                    .col(
                        ColumnDef::new(Connectors::DayOfWeek)
                            .small_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Connectors::DayOfMonth)
                            .small_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Connectors::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Connectors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Connectors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_connectors_tenant_id")
                            .from(Connectors::Table, Connectors::TenantId)
                            .to(Tenants::Table, Tenants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for the per-minute scan of enabled subscriptions
        manager
            .create_index(
                Index::create()
                    .name("idx_connectors_enabled")
                    .table(Connectors::Table)
                    .col(Connectors::Enabled)
                    .to_owned(),
            )
            .await?;

        // Index for tenant-scoped listings
        manager
            .create_index(
                Index::create()
                    .name("idx_connectors_tenant_user")
                    .table(Connectors::Table)
                    .col(Connectors::TenantId)
                    .col(Connectors::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_connectors_enabled").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_connectors_tenant_user").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Connectors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Connectors {
    Table,
    Id,
    TenantId,
    UserId,
    Name,
    EndpointUrl,
    BearerToken,
    ReportEmail,
    AccountEmail,
    Locale,
    Frequency,
    SendTime,
    DayOfWeek,
    DayOfMonth,
    Enabled,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Tenants {
    Table,
    Id,
}

//! Database migrations for the Reports service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2024_01_01_000001_create_tenants;
mod m2025_11_20_100000_create_connectors;
mod m2025_11_20_100100_create_report_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2024_01_01_000001_create_tenants::Migration),
            Box::new(m2025_11_20_100000_create_connectors::Migration),
            Box::new(m2025_11_20_100100_create_report_history::Migration),
        ]
    }
}

//! Database connection and pool management for the Reports service.
//!
//! Initializes a SeaORM connection pool with configurable parameters and
//! retry-with-backoff on startup.

use anyhow::{Context, Result};
use rand::Rng;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::AppConfig;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("failed to connect to database: {source}")]
    ConnectionFailed {
        #[from]
        source: sea_orm::DbErr,
    },
    #[error("invalid database configuration: {message}")]
    InvalidConfiguration { message: String },
}

/// Initializes the connection pool, retrying transient startup failures with
/// exponential backoff.
pub async fn init_pool(cfg: &AppConfig) -> Result<DatabaseConnection> {
    if cfg.database_url.is_empty() {
        return Err(DatabaseError::InvalidConfiguration {
            message: "database URL cannot be empty".to_string(),
        }
        .into());
    }

    let mut opt = ConnectOptions::new(&cfg.database_url);
    opt.max_connections(cfg.db_max_connections)
        .acquire_timeout(Duration::from_millis(cfg.db_acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let max_retries = 5;
    let mut retry_delay = Duration::from_millis(100);

    for attempt in 1..=max_retries {
        match Database::connect(opt.clone()).await {
            Ok(conn) => {
                tracing::info!(attempt, "connected to database");
                return Ok(conn);
            }
            Err(e) => {
                if attempt == max_retries {
                    tracing::error!(attempts = max_retries, error = %e, "giving up on database connection");
                    return Err(DatabaseError::ConnectionFailed { source: e }.into());
                }

                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=50));
                tracing::warn!(attempt, error = %e, delay_ms = retry_delay.as_millis() as u64, "database connection failed, retrying");
                sleep(retry_delay + jitter).await;
                retry_delay *= 2;
            }
        }
    }

    unreachable!("retry loop returns on final attempt")
}

/// Health check for the database connection.
pub async fn health_check(db: &DatabaseConnection) -> Result<()> {
    use sea_orm::Statement;

    let stmt = Statement::from_string(db.get_database_backend(), "SELECT 1".to_string());
    db.query_one(stmt)
        .await
        .context("database health check failed")?;

    Ok(())
}

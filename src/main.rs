//! # Reports Service Main Entry Point

use std::sync::Arc;
use std::time::Duration;

use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;

use reports::config::ConfigLoader;
use reports::dispatch::DispatchCoordinator;
use reports::fetch::SourceFetcher;
use reports::mail::HttpRelayMailer;
use reports::narrative::NarrativeClient;
use reports::repositories::{ConnectorRepository, ReportHistoryRepository};
use reports::scheduler::ReportScheduler;
use reports::server::{AppState, run_server};
use reports::{db, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;
    config.validate()?;

    telemetry::init_tracing(&config)?;
    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let pool = db::init_pool(&config).await?;
    migration::Migrator::up(&pool, None).await?;

    let dispatcher = Arc::new(DispatchCoordinator::new(
        ReportHistoryRepository::new(pool.clone(), config.history.retention_days),
        SourceFetcher::new(
            Duration::from_secs(config.fetch.timeout_seconds),
            config.fetch.max_body_kb,
        ),
        NarrativeClient::new(&config.narrative),
        Arc::new(HttpRelayMailer::new(&config.mail)),
        config.dispatch.clone(),
    ));

    let scheduler = ReportScheduler::new(
        ConnectorRepository::new(pool.clone()),
        ReportHistoryRepository::new(pool.clone(), config.history.retention_days),
        Arc::clone(&dispatcher),
        config.scheduler.clone(),
    );

    let shutdown = CancellationToken::new();
    let scheduler_shutdown = shutdown.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    let state = AppState {
        db: pool,
        dispatcher,
        history_retention_days: config.history.retention_days,
    };

    let server = run_server(config, state);
    tokio::select! {
        result = server => {
            shutdown.cancel();
            let _ = scheduler_task.await;
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
            let _ = scheduler_task.await;
        }
    }

    Ok(())
}

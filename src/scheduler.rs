//! Minute-boundary scheduler.
//!
//! Wakes once per minute, evaluates every enabled connector's schedule
//! against the current UTC minute, and hands the due set to the dispatch
//! coordinator. Each tick also sweeps expired ledger rows. Missed minutes
//! are not replayed; the matcher only ever fires for the current minute.

use chrono::{DateTime, Timelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::SchedulerConfig;
use crate::dispatch::{DispatchCoordinator, DueReport, RunStats};
use crate::repositories::{ConnectorRepository, ReportHistoryRepository};
use crate::schedule::ReportSchedule;

/// Counters for one scheduler tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    /// Enabled connectors evaluated
    pub evaluated: usize,
    /// Connectors skipped because their stored schedule failed validation
    pub invalid: usize,
    /// Connectors whose schedule matched this minute
    pub due: usize,
    pub dispatch: RunStats,
    /// Expired ledger rows removed by the sweep
    pub purged: u64,
}

/// Drives schedule evaluation and dispatch once per minute.
pub struct ReportScheduler {
    connectors: ConnectorRepository,
    history: ReportHistoryRepository,
    dispatcher: Arc<DispatchCoordinator>,
    config: SchedulerConfig,
}

impl ReportScheduler {
    pub fn new(
        connectors: ConnectorRepository,
        history: ReportHistoryRepository,
        dispatcher: Arc<DispatchCoordinator>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            connectors,
            history,
            dispatcher,
            config,
        }
    }

    /// Run until cancelled, ticking on minute boundaries.
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            tick_interval_seconds = self.config.tick_interval_seconds,
            "Report scheduler started"
        );

        loop {
            let pause = self.until_next_tick(Utc::now());
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Report scheduler shutting down");
                    return;
                }
                _ = tokio::time::sleep(pause) => {}
            }

            let now = Utc::now();
            let stats = self.tick(now).await;
            tracing::info!(
                evaluated = stats.evaluated,
                invalid = stats.invalid,
                due = stats.due,
                sent = stats.dispatch.sent,
                skipped = stats.dispatch.skipped,
                failed = stats.dispatch.failed,
                purged = stats.purged,
                "Scheduler tick complete"
            );
        }
    }

    /// Evaluate all enabled connectors against `now` and dispatch the due
    /// set. Public for the integration tests, which drive ticks directly.
    pub async fn tick(&self, now: DateTime<Utc>) -> TickStats {
        let mut stats = TickStats::default();

        let enabled = match self.connectors.list_enabled().await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e.message, "Could not load connectors for tick");
                return stats;
            }
        };
        stats.evaluated = enabled.len();

        let occurrence = ReportSchedule::occurrence_for(now);
        let mut due = Vec::new();
        for connector in enabled {
            match ReportSchedule::from_connector(&connector) {
                Ok(schedule) => {
                    if schedule.is_due(now) {
                        due.push(DueReport {
                            connector,
                            occurrence,
                        });
                    }
                }
                Err(e) => {
                    stats.invalid += 1;
                    tracing::warn!(
                        connector_id = %connector.id,
                        error = %e,
                        "Connector schedule invalid, skipping"
                    );
                }
            }
        }
        stats.due = due.len();
        metrics::gauge!("scheduler_due_connectors").set(stats.due as f64);

        if !due.is_empty() {
            stats.dispatch = self.dispatcher.run_batch(due).await;
        }

        match self.history.purge_expired(now).await {
            Ok(purged) => {
                stats.purged = purged;
                if purged > 0 {
                    tracing::info!(purged, "Expired report history purged");
                }
            }
            Err(e) => {
                tracing::error!(error = %e.message, "Retention sweep failed");
            }
        }

        stats
    }

    /// Time to sleep so the next tick lands on a minute boundary.
    fn until_next_tick(&self, now: DateTime<Utc>) -> Duration {
        let interval = self.config.tick_interval_seconds.max(1);
        let into_minute = u64::from(now.second());
        let remaining = interval.saturating_sub(into_minute % interval).max(1);
        Duration::from_secs(remaining)
    }
}

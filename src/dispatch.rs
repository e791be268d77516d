//! Dispatch coordination.
//!
//! Runs the full pipeline for every report occurrence due in one scheduler
//! tick: claim the ledger row, fetch, classify, aggregate, render, narrate,
//! compose, deliver, record the outcome. Recipients are isolated from each
//! other; one failure never aborts the batch. A wall-clock budget bounds the
//! whole invocation so a tick can never bleed into the next minute.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::aggregate::{self, Thresholds};
use crate::charts;
use crate::compose::{self, ChartSet};
use crate::config::DispatchConfig;
use crate::fetch::{FetchError, SourceFetcher};
use crate::mail::{DeliveryError, ReportMailer};
use crate::models::connector;
use crate::narrative::NarrativeClient;
use crate::parser::{self, ParseError};
use crate::repositories::report_history::ClaimOutcome;
use crate::repositories::ReportHistoryRepository;

/// One unit of work: a connector whose schedule matched this occurrence.
#[derive(Debug, Clone)]
pub struct DueReport {
    pub connector: connector::Model,
    pub occurrence: DateTime<Utc>,
}

/// Terminal result of one occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Sent,
    /// Another writer already owns the ledger row for this occurrence.
    Skipped,
    Failed,
}

/// Counters for one dispatch invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub attempted: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunStats {
    fn absorb(&mut self, outcome: RunOutcome) {
        self.attempted += 1;
        match outcome {
            RunOutcome::Sent => self.sent += 1,
            RunOutcome::Skipped => self.skipped += 1,
            RunOutcome::Failed => self.failed += 1,
        }
    }
}

/// Pipeline stages, used for tracing and for the error class recorded on a
/// failed ledger row.
#[derive(Debug, Clone, Copy)]
pub enum Stage {
    Fetching,
    Parsing,
    Delivering,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Parsing => "parsing",
            Stage::Delivering => "delivering",
        }
    }
}

/// A fatal pipeline error. Rendering and narrative failures are not here;
/// those degrade the artifact instead of failing the occurrence.
#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl PipelineError {
    fn classification(&self) -> &'static str {
        match self {
            PipelineError::Fetch(e) => e.classification(),
            PipelineError::Parse(e) => e.classification(),
            PipelineError::Delivery(e) => e.classification(),
        }
    }

    fn stage(&self) -> Stage {
        match self {
            PipelineError::Fetch(_) => Stage::Fetching,
            PipelineError::Parse(_) => Stage::Parsing,
            PipelineError::Delivery(_) => Stage::Delivering,
        }
    }
}

const BUDGET_EXCEEDED: &str = "budget-exceeded";

/// Coordinates pipeline execution for due report occurrences.
pub struct DispatchCoordinator {
    history: ReportHistoryRepository,
    fetcher: SourceFetcher,
    narrative: NarrativeClient,
    mailer: Arc<dyn ReportMailer>,
    config: DispatchConfig,
}

impl DispatchCoordinator {
    pub fn new(
        history: ReportHistoryRepository,
        fetcher: SourceFetcher,
        narrative: NarrativeClient,
        mailer: Arc<dyn ReportMailer>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            history,
            fetcher,
            narrative,
            mailer,
            config,
        }
    }

    /// Run every due occurrence, bounded by the concurrency limit and the
    /// wall-clock budget. Occurrences that cannot start before the budget
    /// runs out are recorded as failed with class `budget-exceeded`.
    pub async fn run_batch(self: &Arc<Self>, due: Vec<DueReport>) -> RunStats {
        let effective_budget = Duration::from_secs(
            self.config
                .budget_seconds
                .saturating_sub(self.config.budget_margin_seconds)
                .max(1),
        );
        let deadline = Instant::now() + effective_budget;
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let mut tasks = JoinSet::new();
        for item in due {
            let coordinator = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                // A closed semaphore is unreachable here; treat it as skip.
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return RunOutcome::Skipped,
                };
                coordinator.run_one_within(item, deadline).await
            });
        }

        let mut stats = RunStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => stats.absorb(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Dispatch task panicked");
                    stats.absorb(RunOutcome::Failed);
                }
            }
        }

        metrics::counter!("reports_dispatched_total").increment(stats.attempted as u64);
        metrics::counter!("reports_sent_total").increment(stats.sent as u64);
        metrics::counter!("reports_failed_total").increment(stats.failed as u64);

        stats
    }

    /// Run a single occurrence with no batch deadline, for manual triggers.
    /// The ledger claim still applies, so a manual run and the scheduled run
    /// of the same occurrence cannot double-send.
    pub async fn run_connector(
        &self,
        connector: connector::Model,
        occurrence: DateTime<Utc>,
    ) -> RunOutcome {
        self.run_claimed(
            DueReport {
                connector,
                occurrence,
            },
            None,
        )
        .await
    }

    async fn run_one_within(&self, item: DueReport, deadline: Instant) -> RunOutcome {
        self.run_claimed(item, Some(deadline)).await
    }

    async fn run_claimed(&self, item: DueReport, deadline: Option<Instant>) -> RunOutcome {
        let connector_id = item.connector.id;
        let row = match self
            .history
            .record_processing(connector_id, item.connector.tenant_id, item.occurrence)
            .await
        {
            Ok(ClaimOutcome::Claimed(row)) => row,
            Ok(ClaimOutcome::AlreadyHandled) => {
                tracing::info!(
                    connector_id = %connector_id,
                    occurrence = %item.occurrence,
                    "Occurrence already handled, skipping"
                );
                return RunOutcome::Skipped;
            }
            Err(e) => {
                tracing::error!(
                    connector_id = %connector_id,
                    error = %e.message,
                    "Could not claim occurrence"
                );
                return RunOutcome::Failed;
            }
        };

        let pipeline = self.pipeline(&item.connector, item.occurrence);
        let result = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return self
                        .record_failure(row.id, connector_id, BUDGET_EXCEEDED, "invocation budget exhausted before start")
                        .await;
                }
                match tokio::time::timeout(remaining, pipeline).await {
                    Ok(result) => result,
                    Err(_) => {
                        return self
                            .record_failure(row.id, connector_id, BUDGET_EXCEEDED, "invocation budget exhausted mid-pipeline")
                            .await;
                    }
                }
            }
            None => pipeline.await,
        };

        match result {
            Ok(preview) => match self.history.record_sent(row.id, &preview).await {
                Ok(_) => {
                    tracing::info!(
                        connector_id = %connector_id,
                        occurrence = %item.occurrence,
                        "Report delivered"
                    );
                    RunOutcome::Sent
                }
                Err(e) => {
                    tracing::error!(
                        connector_id = %connector_id,
                        error = %e.message,
                        "Delivered but could not record sent outcome"
                    );
                    RunOutcome::Failed
                }
            },
            Err(pipeline_err) => {
                tracing::warn!(
                    connector_id = %connector_id,
                    stage = pipeline_err.stage().as_str(),
                    error = %pipeline_err,
                    "Report pipeline failed"
                );
                self.record_failure(
                    row.id,
                    connector_id,
                    pipeline_err.classification(),
                    &pipeline_err.to_string(),
                )
                .await
            }
        }
    }

    async fn record_failure(
        &self,
        row_id: uuid::Uuid,
        connector_id: uuid::Uuid,
        class: &str,
        message: &str,
    ) -> RunOutcome {
        if let Err(e) = self.history.record_failed(row_id, class, message).await {
            tracing::error!(
                connector_id = %connector_id,
                error = %e.message,
                "Could not record failed outcome"
            );
        }
        RunOutcome::Failed
    }

    /// The fetch-to-delivery pipeline for one connector. Returns the stored
    /// preview on success. Chart and narrative failures degrade the artifact
    /// rather than failing the run.
    async fn pipeline(
        &self,
        connector: &connector::Model,
        occurrence: DateTime<Utc>,
    ) -> Result<String, PipelineError> {
        let body = self
            .fetcher
            .fetch(&connector.endpoint_url, connector.bearer_token.as_deref())
            .await?;

        let metrics_model = parser::classify_and_parse(&body)?;
        let summary = aggregate::summarize(
            &metrics_model,
            Thresholds {
                abandon_rate: self.config.abandon_rate_threshold,
            },
        );

        let mut chart_set = ChartSet::default();
        match charts::render_trend(&metrics_model.daily) {
            Ok(png) => chart_set.trend_png = Some(png),
            Err(e) => tracing::debug!(connector_id = %connector.id, error = %e, "Trend chart skipped"),
        }
        match charts::render_hourly(&metrics_model.hourly) {
            Ok(png) => chart_set.hourly_png = Some(png),
            Err(e) => tracing::debug!(connector_id = %connector.id, error = %e, "Hourly chart skipped"),
        }

        let narrative_text = match self
            .narrative
            .generate(&metrics_model, &summary, &connector.locale)
            .await
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(
                    connector_id = %connector.id,
                    class = e.classification(),
                    error = %e,
                    "Narrative generation failed, using fallback"
                );
                metrics::counter!("reports_narrative_fallback_total").increment(1);
                None
            }
        };

        let artifact = compose::compose(
            &metrics_model,
            &summary,
            narrative_text.as_deref(),
            &chart_set,
            occurrence.date_naive(),
            &connector.locale,
        );

        self.mailer
            .send(
                connector.delivery_address(),
                &artifact.subject,
                &artifact.html,
            )
            .await?;

        Ok(artifact.preview)
    }
}

//! Metrics aggregation.
//!
//! Pure transformation from [`NormalizedMetrics`] into the summary the
//! renderer, narrative generator and composer consume: derived rates, trend
//! deltas against the prior comparable period, top entity rankings and
//! threshold-based attention flags. No I/O, fully deterministic.

use crate::parser::{NormalizedMetrics, rate};

/// Thresholds controlling attention flags.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Abandonment rate (0.0..=1.0) above which a flag is raised
    pub abandon_rate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { abandon_rate: 0.25 }
    }
}

/// One point of the daily trend series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub period: String,
    pub total: u64,
    pub answered: u64,
    pub abandoned: u64,
    /// Difference in volume against the comparable prior period: the same
    /// weekday one week earlier when the series is long enough, otherwise
    /// the previous point. None for the first point.
    pub delta_vs_prior: Option<i64>,
}

/// Conditions worth calling out in the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttentionFlag {
    HighAbandonRate { rate_pct: u32 },
    NoTraffic,
    OverflowPresent { count: u64 },
    FailuresPresent { count: u64 },
}

impl AttentionFlag {
    /// Short human-readable form embedded in artifacts and prompts.
    pub fn describe(&self, locale: &str) -> String {
        let italian = locale.starts_with("it");
        match self {
            AttentionFlag::HighAbandonRate { rate_pct } => {
                if italian {
                    format!("Tasso di abbandono elevato: {rate_pct}%")
                } else {
                    format!("High abandonment rate: {rate_pct}%")
                }
            }
            AttentionFlag::NoTraffic => {
                if italian {
                    "Nessuna chiamata nel periodo".to_string()
                } else {
                    "No calls in the period".to_string()
                }
            }
            AttentionFlag::OverflowPresent { count } => {
                if italian {
                    format!("{count} chiamate in overflow")
                } else {
                    format!("{count} calls overflowed")
                }
            }
            AttentionFlag::FailuresPresent { count } => {
                if italian {
                    format!("{count} errori di sistema")
                } else {
                    format!("{count} system failures")
                }
            }
        }
    }
}

/// Aggregated view of one report, ready for rendering and narration.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    pub answer_rate: f64,
    pub abandon_rate: f64,
    pub trend: Vec<TrendPoint>,
    /// Entities ranked by volume, highest first, capped at `TOP_ENTITIES`
    pub top_entities: Vec<(String, u64)>,
    pub flags: Vec<AttentionFlag>,
    /// Hour (0..=23) with the highest volume, if any hourly data exists
    pub busiest_hour: Option<u8>,
}

const TOP_ENTITIES: usize = 5;

/// Build the summary for a parsed report.
pub fn summarize(metrics: &NormalizedMetrics, thresholds: Thresholds) -> ReportSummary {
    let answer_rate = metrics.answer_rate();
    let abandon_rate = metrics.abandon_rate();

    ReportSummary {
        answer_rate,
        abandon_rate,
        trend: build_trend(metrics),
        top_entities: rank_entities(metrics),
        flags: build_flags(metrics, abandon_rate, thresholds),
        busiest_hour: metrics
            .hourly
            .iter()
            .max_by_key(|h| h.total)
            .filter(|h| h.total > 0)
            .map(|h| h.hour),
    }
}

fn build_trend(metrics: &NormalizedMetrics) -> Vec<TrendPoint> {
    let daily = &metrics.daily;
    daily
        .iter()
        .enumerate()
        .map(|(i, bucket)| {
            // Compare against the same weekday last week when the lookback
            // reaches that far, else against yesterday.
            let prior = if i >= 7 {
                Some(&daily[i - 7])
            } else if i >= 1 {
                Some(&daily[i - 1])
            } else {
                None
            };
            TrendPoint {
                period: bucket.period.clone(),
                total: bucket.total,
                answered: bucket.answered,
                abandoned: bucket.abandoned,
                delta_vs_prior: prior.map(|p| bucket.total as i64 - p.total as i64),
            }
        })
        .collect()
}

fn rank_entities(metrics: &NormalizedMetrics) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = metrics
        .entities
        .iter()
        .filter(|e| !e.name.is_empty() || !e.grouping_name.is_empty())
        .map(|e| {
            let name = if e.name.is_empty() {
                e.grouping_name.clone()
            } else {
                e.name.clone()
            };
            (name, e.total)
        })
        .collect();

    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_ENTITIES);
    ranked
}

fn build_flags(
    metrics: &NormalizedMetrics,
    abandon_rate: f64,
    thresholds: Thresholds,
) -> Vec<AttentionFlag> {
    let mut flags = Vec::new();

    if metrics.totals.total == 0 {
        flags.push(AttentionFlag::NoTraffic);
        return flags;
    }

    if abandon_rate > thresholds.abandon_rate {
        flags.push(AttentionFlag::HighAbandonRate {
            rate_pct: (abandon_rate * 100.0).round() as u32,
        });
    }
    if metrics.totals.overflowed > 0 {
        flags.push(AttentionFlag::OverflowPresent {
            count: metrics.totals.overflowed,
        });
    }
    if metrics.totals.failures > 0 {
        flags.push(AttentionFlag::FailuresPresent {
            count: metrics.totals.failures,
        });
    }

    flags
}

/// Percentage with the same zero-guard as [`rate`], rounded to one decimal.
pub fn percentage(numerator: u64, denominator: u64) -> f64 {
    (rate(numerator, denominator) * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{DailyBucket, HourlyBucket, NormalizedMetrics, ReportType, Totals};
    use std::collections::BTreeMap;

    fn metrics_with(totals: Totals) -> NormalizedMetrics {
        NormalizedMetrics {
            report_type: ReportType::Acd,
            totals,
            entities: Vec::new(),
            daily: Vec::new(),
            hourly: Vec::new(),
            transfers: BTreeMap::new(),
        }
    }

    fn day(period: &str, total: u64) -> DailyBucket {
        DailyBucket {
            period: period.to_string(),
            total,
            answered: total,
            abandoned: 0,
        }
    }

    #[test]
    fn zero_traffic_yields_zero_rates_and_flag() {
        let summary = summarize(&metrics_with(Totals::default()), Thresholds::default());
        assert_eq!(summary.answer_rate, 0.0);
        assert_eq!(summary.abandon_rate, 0.0);
        assert_eq!(summary.flags, vec![AttentionFlag::NoTraffic]);
    }

    #[test]
    fn abandon_rate_above_threshold_is_flagged() {
        let mut metrics = metrics_with(Totals {
            total: 100,
            answered: 60,
            abandoned: 40,
            ..Totals::default()
        });
        metrics.daily.push(day("2024-01-15", 100));

        let summary = summarize(&metrics, Thresholds { abandon_rate: 0.25 });
        assert_eq!(
            summary.flags,
            vec![AttentionFlag::HighAbandonRate { rate_pct: 40 }]
        );
        assert!((summary.abandon_rate - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn trend_deltas_prefer_week_over_week() {
        let mut metrics = metrics_with(Totals {
            total: 1,
            answered: 1,
            ..Totals::default()
        });
        for (i, total) in (0..9).map(|i| (i, 10 + i as u64)) {
            metrics.daily.push(day(&format!("2024-01-{:02}", i + 8), total));
        }

        let summary = summarize(&metrics, Thresholds::default());
        assert_eq!(summary.trend[0].delta_vs_prior, None);
        // day 1 vs day 0
        assert_eq!(summary.trend[1].delta_vs_prior, Some(1));
        // day 7 vs day 0, a week earlier
        assert_eq!(summary.trend[7].delta_vs_prior, Some(7));
        assert_eq!(summary.trend[8].delta_vs_prior, Some(7));
    }

    #[test]
    fn top_entities_rank_by_volume_with_stable_ties() {
        let mut metrics = metrics_with(Totals {
            total: 30,
            answered: 30,
            ..Totals::default()
        });
        for (name, total) in [("b", 10u64), ("a", 10), ("c", 25)] {
            metrics.entities.push(crate::parser::EntityBreakdown {
                name: name.to_string(),
                total,
                ..Default::default()
            });
        }

        let summary = summarize(&metrics, Thresholds::default());
        assert_eq!(
            summary.top_entities,
            vec![
                ("c".to_string(), 25),
                ("a".to_string(), 10),
                ("b".to_string(), 10)
            ]
        );
    }

    #[test]
    fn busiest_hour_ignores_empty_series() {
        let mut metrics = metrics_with(Totals {
            total: 5,
            answered: 5,
            ..Totals::default()
        });
        assert_eq!(
            summarize(&metrics, Thresholds::default()).busiest_hour,
            None
        );

        metrics.hourly = vec![
            HourlyBucket {
                hour: 9,
                total: 3,
                ..Default::default()
            },
            HourlyBucket {
                hour: 15,
                total: 8,
                ..Default::default()
            },
        ];
        assert_eq!(
            summarize(&metrics, Thresholds::default()).busiest_hour,
            Some(15)
        );
    }

    #[test]
    fn percentage_rounds_to_one_decimal() {
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(0, 0), 0.0);
    }
}

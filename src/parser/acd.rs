//! Queue (ACD) report parser.
//!
//! Distinguishing counters: queue timing (`*_queue_time`), service level and
//! the redirect family (no-agents overflow, queue timeout, night mode).

use super::{Element, NormalizedMetrics, ReportType, RowCounts, collect_metrics};

pub(super) fn parse(root: &Element) -> NormalizedMetrics {
    collect_metrics(
        root,
        ReportType::Acd,
        |row| RowCounts {
            total: row.int_of("incoming_total"),
            answered: row.int_of("incoming_answered"),
            abandoned: row.int_of("incoming_unanswered"),
            overflowed: row.int_of("incoming_redirected_no_agents_owerflow")
                + row.int_of("incoming_redirected_queue_timeout")
                + row.int_of("incoming_redirected_nightmode"),
            failures: 0,
            avg_wait_secs: row.seconds_of("incoming_answered_average_queue_time"),
            avg_duration_secs: row.seconds_of("incoming_answered_average_call_duration"),
            total_duration_secs: row.seconds_of("incoming_answered_total_call_duration"),
        },
        None,
    )
}

//! Rule-based routing report parser.
//!
//! Distinguishing counters: `incoming_total_handled_by_rulebase` and the
//! `incoming_transferred_to_specification` destination columns.

use super::{Element, NormalizedMetrics, ReportType, RowCounts, collect_metrics};

pub(super) fn parse(root: &Element) -> NormalizedMetrics {
    collect_metrics(
        root,
        ReportType::Rulebased,
        |row| RowCounts {
            total: row.int_of("incoming_total_handled_by_rulebase"),
            answered: row.int_of("incoming_connected"),
            abandoned: row.int_of("incoming_not_connected"),
            overflowed: 0,
            failures: row.int_of("incoming_failure"),
            avg_wait_secs: 0,
            avg_duration_secs: 0,
            total_duration_secs: 0,
        },
        Some("incoming_transferred_to_specification"),
    )
}

//! Hunt group report parser.
//!
//! Distinguishing counters: the `*_by_huntgroup_members` family and the
//! overflow number redirect.

use super::{Element, NormalizedMetrics, ReportType, RowCounts, collect_metrics};

pub(super) fn parse(root: &Element) -> NormalizedMetrics {
    collect_metrics(
        root,
        ReportType::Huntgroup,
        |row| RowCounts {
            total: row.int_of("incoming_total"),
            answered: row.int_of("incoming_answered_by_huntgroup_members"),
            abandoned: row.int_of("incoming_unanswered_by_huntgroup_members"),
            overflowed: row.int_of("incoming_sent_to_overflow_number"),
            failures: 0,
            avg_wait_secs: row
                .seconds_of("incoming_answered_by_huntgroup_members_average_speed_of_answer"),
            avg_duration_secs: row
                .seconds_of("incoming_answered_by_huntgroup_members_average_call_duration"),
            total_duration_secs: row
                .seconds_of("incoming_answered_by_huntgroup_members_total_call_duration"),
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use crate::parser::{ReportType, classify_and_parse};

    const SAMPLE: &str = r#"<?xml version="1.0"?>
        <root><data><report>
            <date__groupsobjects>
                <period>Total</period>
                <type>total</type>
                <incoming_total>80</incoming_total>
                <incoming_answered_by_huntgroup_members>70</incoming_answered_by_huntgroup_members>
                <incoming_unanswered_by_huntgroup_members>10</incoming_unanswered_by_huntgroup_members>
                <incoming_sent_to_overflow_number>4</incoming_sent_to_overflow_number>
                <incoming_answered_by_huntgroup_members_average_speed_of_answer>00:12</incoming_answered_by_huntgroup_members_average_speed_of_answer>
            </date__groupsobjects>
            <date__groupsobjects>
                <period>2024-01-15</period>
                <type>group</type>
                <name>Night Desk</name>
                <incoming_total>80</incoming_total>
                <incoming_answered_by_huntgroup_members>70</incoming_answered_by_huntgroup_members>
                <incoming_unanswered_by_huntgroup_members>10</incoming_unanswered_by_huntgroup_members>
            </date__groupsobjects>
        </report></data></root>"#;

    #[test]
    fn classifies_and_normalizes_huntgroup_report() {
        let metrics = classify_and_parse(SAMPLE).unwrap();
        assert_eq!(metrics.report_type, ReportType::Huntgroup);
        assert_eq!(metrics.totals.total, 80);
        assert_eq!(metrics.totals.answered, 70);
        assert_eq!(metrics.totals.abandoned, 10);
        assert_eq!(metrics.totals.overflowed, 4);
        assert_eq!(metrics.totals.avg_wait_secs, 12);
        assert!(metrics.totals.answered + metrics.totals.abandoned <= metrics.totals.total);
        assert_eq!(metrics.entity_names(), vec!["Night Desk"]);
    }
}

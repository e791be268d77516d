//! Per-agent report parser.
//!
//! Distinguishing shape: the incoming/outgoing split with external, internal
//! and queue origins. Only the incoming side feeds the common counters; the
//! outgoing side has no answered/abandoned semantics at the report level.

use super::{Element, NormalizedMetrics, ReportType, RowCounts, collect_metrics};

pub(super) fn parse(root: &Element) -> NormalizedMetrics {
    collect_metrics(
        root,
        ReportType::User,
        |row| RowCounts {
            total: row.int_of("incoming_total"),
            answered: row.int_of("incoming_answered"),
            abandoned: row.int_of("incoming_unanswered"),
            overflowed: row.int_of("incoming_total_redirected"),
            failures: row.int_of("failures"),
            avg_wait_secs: row.seconds_of("incoming_answered_average_speed_of_answer"),
            avg_duration_secs: row.seconds_of("incoming_answered_average_duration"),
            total_duration_secs: row.seconds_of("incoming_total_duration"),
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
                <incoming_total>60</incoming_total>
                <incoming_from_external>45</incoming_from_external>
                <incoming_from_internal>15</incoming_from_internal>
                <incoming_answered>50</incoming_answered>
                <incoming_unanswered>10</incoming_unanswered>
                <incoming_answered_average_speed_of_answer>00:08</incoming_answered_average_speed_of_answer>
                <incoming_answered_average_duration>02:15</incoming_answered_average_duration>
                <outgoing_total>25</outgoing_total>
                <outgoing_answered>20</outgoing_answered>
            </date__groupsobjects>
            <date__groupsobjects>
                <period>2024-01-15</period>
                <type>object</type>
                <name>Others/j.doe - Jane Doe</name>
                <object_identifier>usr-17</object_identifier>
                <incoming_total>60</incoming_total>
                <incoming_answered>50</incoming_answered>
                <incoming_unanswered>10</incoming_unanswered>
            </date__groupsobjects>
            <time__groupsobjects>
                <period>14:00</period>
                <type>object</type>
                <incoming_total>12</incoming_total>
                <incoming_answered>11</incoming_answered>
                <incoming_unanswered>1</incoming_unanswered>
            </time__groupsobjects>
        </report></data></root>"#;

    #[test]
    fn classifies_and_normalizes_agent_report() {
        let metrics = classify_and_parse(SAMPLE).unwrap();
        assert_eq!(metrics.report_type, ReportType::User);
        assert_eq!(metrics.totals.total, 60);
        assert_eq!(metrics.totals.answered, 50);
        assert_eq!(metrics.totals.abandoned, 10);
        assert_eq!(metrics.totals.avg_wait_secs, 8);
        assert_eq!(metrics.totals.avg_duration_secs, 135);
        assert!(metrics.totals.answered + metrics.totals.abandoned <= metrics.totals.total);

        assert_eq!(metrics.entity_names(), vec!["Others/j.doe - Jane Doe"]);
        assert_eq!(metrics.hourly[0].hour, 14);
    }
}

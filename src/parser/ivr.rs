//! IVR report parser.
//!
//! Distinguishing counters: the `*_by_ivr` family plus termination failures.
//! Transfer destinations come from `transferred_to_specification` columns.

use super::{Element, NormalizedMetrics, ReportType, RowCounts, collect_metrics};

pub(super) fn parse(root: &Element) -> NormalizedMetrics {
    collect_metrics(
        root,
        ReportType::Ivr,
        |row| RowCounts {
            total: row.int_of("incoming_total_handled_by_ivr"),
            answered: row.int_of("incoming_connected"),
            abandoned: row.int_of("incoming_not_connected"),
            overflowed: 0,
            failures: row.int_of("incoming_terminated_because_of_failure"),
            avg_wait_secs: 0,
            avg_duration_secs: row.seconds_of("incoming_average_call_duration_for_ivr"),
            total_duration_secs: row.seconds_of("incoming_total_call_duration_for_ivr"),
        },
        Some("transferred_to_specification"),
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
                <incoming_total_handled_by_ivr>100</incoming_total_handled_by_ivr>
                <incoming_connected>85</incoming_connected>
                <incoming_not_connected>15</incoming_not_connected>
                <incoming_average_call_duration_for_ivr>25</incoming_average_call_duration_for_ivr>
                <incoming_terminated_because_of_failure>2</incoming_terminated_because_of_failure>
            </date__groupsobjects>
            <date__groupsobjects>
                <period>2024-01-15</period>
                <type>object</type>
                <name>Main Menu - Reception</name>
                <grouping_name>Reception IVR</grouping_name>
                <object_identifier>ivr-001</object_identifier>
                <incoming_total_handled_by_ivr>100</incoming_total_handled_by_ivr>
                <incoming_connected>85</incoming_connected>
                <incoming_not_connected>15</incoming_not_connected>
                <transferred_to_specification>
                    <dynamic_column>
                        <column_name>Connected to Support Queue</column_name>
                        <column_value>40</column_value>
                    </dynamic_column>
                    <dynamic_column>
                        <column_name>Connected to Sales</column_name>
                        <column_value>45</column_value>
                    </dynamic_column>
                </transferred_to_specification>
            </date__groupsobjects>
            <time__groupsobjects>
                <period>10:00</period>
                <type>object</type>
                <incoming_total_handled_by_ivr>20</incoming_total_handled_by_ivr>
                <incoming_connected>18</incoming_connected>
                <incoming_not_connected>2</incoming_not_connected>
            </time__groupsobjects>
        </report></data></root>"#;

    #[test]
    fn classifies_and_normalizes_ivr_report() {
        let metrics = classify_and_parse(SAMPLE).unwrap();
        assert_eq!(metrics.report_type, ReportType::Ivr);
        assert_eq!(metrics.totals.total, 100);
        assert_eq!(metrics.totals.answered, 85);
        assert_eq!(metrics.totals.abandoned, 15);
        assert_eq!(metrics.totals.failures, 2);
        assert!(metrics.totals.answered + metrics.totals.abandoned <= metrics.totals.total);

        assert_eq!(metrics.entities.len(), 1);
        assert_eq!(metrics.entities[0].object_identifier, "ivr-001");
        assert_eq!(metrics.entity_names(), vec!["Main Menu - Reception"]);

        // "Connected to " prefix stripped from destinations
        assert_eq!(metrics.transfers.get("Support Queue"), Some(&40));
        assert_eq!(metrics.transfers.get("Sales"), Some(&45));

        assert_eq!(metrics.hourly.len(), 1);
        assert_eq!(metrics.hourly[0].hour, 10);
    }

    // Hourly rows re-slice the same calls the daily rows count; only the
    // date rows feed the destination aggregate.
    #[test]
    fn transfer_totals_ignore_hourly_rows() {
        let xml = r#"<?xml version="1.0"?>
            <root><data><report>
                <date__groupsobjects>
                    <period>2024-01-15</period>
                    <type>object</type>
                    <name>Main Menu</name>
                    <incoming_total_handled_by_ivr>40</incoming_total_handled_by_ivr>
                    <incoming_connected>40</incoming_connected>
                    <incoming_not_connected>0</incoming_not_connected>
                    <transferred_to_specification>
                        <dynamic_column>
                            <column_name>Connected to Support</column_name>
                            <column_value>40</column_value>
                        </dynamic_column>
                    </transferred_to_specification>
                </date__groupsobjects>
                <time__groupsobjects>
                    <period>10:00</period>
                    <type>object</type>
                    <incoming_total_handled_by_ivr>40</incoming_total_handled_by_ivr>
                    <incoming_connected>40</incoming_connected>
                    <incoming_not_connected>0</incoming_not_connected>
                    <transferred_to_specification>
                        <dynamic_column>
                            <column_name>Connected to Support</column_name>
                            <column_value>40</column_value>
                        </dynamic_column>
                    </transferred_to_specification>
                </time__groupsobjects>
            </report></data></root>"#;

        let metrics = classify_and_parse(xml).unwrap();
        assert_eq!(metrics.transfers.get("Support"), Some(&40));
        assert_eq!(metrics.hourly.len(), 1);
    }
}

//! Report classification and parsing.
//!
//! Telemetry documents arrive in one of five structurally different XML
//! families (queue/ACD, IVR, per-agent, hunt group, rule-based routing).
//! [`classify_and_parse`] detects the family from indicator elements and
//! normalizes the document into a single [`NormalizedMetrics`] model.
//!
//! All five families share the same grouping skeleton: repeated
//! `date__groupsobjects` / `time__groupsobjects` elements carrying a
//! `period`, a `type` (total / group / object) and family-specific counter
//! tags. The per-family modules supply the counter mapping; the walking
//! logic lives here.

mod acd;
mod huntgroup;
mod ivr;
mod rulebased;
mod tree;
mod user;

use std::collections::BTreeMap;

use thiserror::Error;

pub use tree::{Element, parse_document};

/// Errors raised while classifying or parsing a telemetry document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("empty document")]
    Empty,
    #[error("unrecognized report structure")]
    UnsupportedFormat,
}

impl ParseError {
    /// Stable classification stored in the history ledger.
    pub fn classification(&self) -> &'static str {
        match self {
            ParseError::Malformed(_) | ParseError::Empty => "parse",
            ParseError::UnsupportedFormat => "unsupported-format",
        }
    }
}

/// The five supported report families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    Acd,
    Ivr,
    User,
    Huntgroup,
    Rulebased,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::Acd => "acd",
            ReportType::Ivr => "ivr",
            ReportType::User => "user",
            ReportType::Huntgroup => "huntgroup",
            ReportType::Rulebased => "rulebased",
        }
    }

    /// Uppercase display form used in delivery subjects.
    pub fn display(self) -> &'static str {
        match self {
            ReportType::Acd => "ACD",
            ReportType::Ivr => "IVR",
            ReportType::User => "USER",
            ReportType::Huntgroup => "HUNTGROUP",
            ReportType::Rulebased => "RULEBASED",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counters for one report, all durations in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub total: u64,
    pub answered: u64,
    pub abandoned: u64,
    pub overflowed: u64,
    pub failures: u64,
    pub avg_wait_secs: u64,
    pub avg_duration_secs: u64,
    pub total_duration_secs: u64,
}

/// Per-entity breakdown (queue, IVR node, agent, hunt group or rule).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityBreakdown {
    /// Full name from the document (e.g. "Others/j.doe - Jane Doe")
    pub name: String,
    /// Name of the grouping the entity belongs to
    pub grouping_name: String,
    /// Opaque unique identifier
    pub object_identifier: String,
    /// Names of parent groups
    pub group_names: String,
    pub total: u64,
    pub answered: u64,
    pub abandoned: u64,
}

/// One day's counters, labelled with the period string from the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyBucket {
    pub period: String,
    pub total: u64,
    pub answered: u64,
    pub abandoned: u64,
}

/// One hour's counters; `hour` parsed from labels like "09:00".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyBucket {
    pub hour: u8,
    pub total: u64,
    pub answered: u64,
    pub abandoned: u64,
    pub avg_duration_secs: u64,
}

/// Common metrics model all five parser families normalize into.
///
/// Counts are unsigned by construction; rates are always derived from their
/// numerator and denominator, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetrics {
    pub report_type: ReportType,
    pub totals: Totals,
    pub entities: Vec<EntityBreakdown>,
    pub daily: Vec<DailyBucket>,
    pub hourly: Vec<HourlyBucket>,
    /// Transfer destination name -> count, prefixes already stripped
    pub transfers: BTreeMap<String, u64>,
}

impl NormalizedMetrics {
    pub fn answer_rate(&self) -> f64 {
        rate(self.totals.answered, self.totals.total)
    }

    pub fn abandon_rate(&self) -> f64 {
        rate(self.totals.abandoned, self.totals.total)
    }

    /// Distinct entity names, document order, for subject lines.
    pub fn entity_names(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for entity in &self.entities {
            let name = if entity.name.is_empty() {
                entity.grouping_name.as_str()
            } else {
                entity.name.as_str()
            };
            if !name.is_empty() && name != "Total" && !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }
}

/// Fraction with explicit zero-guard: 0/0 is 0, not NaN.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Detect the report family from indicator elements, most specific first.
///
/// Detection searches the whole tree, so documents containing several queues,
/// agents or IVR nodes of the same family still classify correctly. Mixed
/// families in one document are not supported.
pub fn detect_report_type(root: &Element) -> Option<ReportType> {
    const ACD_INDICATORS: &[&str] = &[
        "incoming_queue_closed",
        "incoming_service_level",
        "incoming_answered_within_service_time",
        "incoming_unanswered_within_service_time",
        "incoming_callbacks_requested",
        "outgoing_callbacks_resolved",
        "incoming_answered_by_member_specification",
        "incoming_answered_average_queue_time",
        "incoming_unanswered_average_queue_time",
        "incoming_redirected_no_agents_owerflow",
        "incoming_redirected_queue_timeout",
        "incoming_redirected_nightmode",
    ];
    const HUNTGROUP_INDICATORS: &[&str] = &[
        "incoming_answered_by_huntgroup_members",
        "incoming_unanswered_by_huntgroup_members",
        "incoming_sent_to_overflow_number",
        "incoming_answered_by_huntgroup_members_average_speed_of_answer",
    ];
    const RULEBASED_INDICATORS: &[&str] = &[
        "incoming_total_handled_by_rulebase",
        "incoming_transferred_to_specification",
        "incoming_failure",
    ];
    const IVR_INDICATORS: &[&str] = &[
        "incoming_total_handled_by_ivr",
        "incoming_average_call_duration_for_ivr",
        "incoming_total_call_duration_for_ivr",
        "incoming_terminated_because_of_failure",
    ];
    const USER_INDICATORS: &[&str] = &[
        "incoming_from_external",
        "incoming_from_internal",
        "incoming_from_queues",
        "outgoing_to_external",
        "outgoing_to_internal",
        "outgoing_transferred_out",
        "total_calls",
        "total_calls_duration",
    ];

    let any = |tags: &[&str]| tags.iter().any(|t| root.contains(t));

    if any(ACD_INDICATORS) {
        return Some(ReportType::Acd);
    }
    if any(HUNTGROUP_INDICATORS) {
        return Some(ReportType::Huntgroup);
    }
    if any(RULEBASED_INDICATORS) {
        return Some(ReportType::Rulebased);
    }
    if any(IVR_INDICATORS) {
        return Some(ReportType::Ivr);
    }
    if any(USER_INDICATORS) {
        return Some(ReportType::User);
    }

    // Bare incoming/outgoing structure with answered counters on both sides
    // is the per-agent shape without its optional columns.
    if (root.contains("incoming_total") || root.contains("outgoing_total"))
        && root.contains("incoming_answered")
        && root.contains("outgoing_answered")
    {
        return Some(ReportType::User);
    }

    None
}

/// Classify a raw document and normalize it through the matching parser.
pub fn classify_and_parse(raw: &str) -> Result<NormalizedMetrics, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let root = parse_document(raw)?;
    let report_type = detect_report_type(&root).ok_or(ParseError::UnsupportedFormat)?;

    let metrics = match report_type {
        ReportType::Acd => acd::parse(&root),
        ReportType::Ivr => ivr::parse(&root),
        ReportType::User => user::parse(&root),
        ReportType::Huntgroup => huntgroup::parse(&root),
        ReportType::Rulebased => rulebased::parse(&root),
    };

    Ok(metrics)
}

/// Counters extracted from one grouping row by a family-specific mapping.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct RowCounts {
    pub total: u64,
    pub answered: u64,
    pub abandoned: u64,
    pub overflowed: u64,
    pub failures: u64,
    pub avg_wait_secs: u64,
    pub avg_duration_secs: u64,
    pub total_duration_secs: u64,
}

/// Walk the shared grouping skeleton, applying a family-specific counter
/// extractor to every row.
///
/// `transfer_spec_tag` names the element holding dynamic transfer-destination
/// columns for families that have one. Destinations are aggregated from date
/// rows only; time rows re-slice the same calls.
pub(super) fn collect_metrics(
    root: &Element,
    report_type: ReportType,
    extract: impl Fn(&Element) -> RowCounts,
    transfer_spec_tag: Option<&str>,
) -> NormalizedMetrics {
    let mut totals = Totals::default();
    let mut entities: Vec<EntityBreakdown> = Vec::new();
    let mut daily = Vec::new();
    let mut transfers = BTreeMap::new();

    for row in root.find_all("date__groupsobjects") {
        let period = row.text_of("period");
        let row_type = row.text_of("type");
        if period.is_empty() || row_type.is_empty() {
            continue;
        }

        let counts = extract(row);

        if let Some(tag) = transfer_spec_tag {
            merge_transfers(&mut transfers, row, tag);
        }

        match row_type {
            "total" => {
                totals = Totals {
                    total: counts.total,
                    answered: counts.answered,
                    abandoned: counts.abandoned,
                    overflowed: counts.overflowed,
                    failures: counts.failures,
                    avg_wait_secs: counts.avg_wait_secs,
                    avg_duration_secs: counts.avg_duration_secs,
                    total_duration_secs: counts.total_duration_secs,
                };
            }
            "group" | "object" if period != "Total" => {
                daily.push(DailyBucket {
                    period: period.to_string(),
                    total: counts.total,
                    answered: counts.answered,
                    abandoned: counts.abandoned,
                });

                let name = row.text_of("name");
                let grouping_name = row.text_of("grouping_name");
                if !name.is_empty() || !grouping_name.is_empty() {
                    merge_entity(&mut entities, row, &counts);
                }
            }
            _ => {}
        }
    }

    let mut hourly = Vec::new();
    for row in root.find_all("time__groupsobjects") {
        let period = row.text_of("period");
        let row_type = row.text_of("type");
        if period == "Total" || !matches!(row_type, "group" | "object") {
            continue;
        }
        let Some(hour) = parse_hour_label(period) else {
            continue;
        };

        let counts = extract(row);

        hourly.push(HourlyBucket {
            hour,
            total: counts.total,
            answered: counts.answered,
            abandoned: counts.abandoned,
            avg_duration_secs: counts.avg_duration_secs,
        });
    }

    NormalizedMetrics {
        report_type,
        totals,
        entities,
        daily,
        hourly,
        transfers,
    }
}

/// Accumulate a row into the per-entity breakdown, keyed by identifier
/// falling back to name.
fn merge_entity(entities: &mut Vec<EntityBreakdown>, row: &Element, counts: &RowCounts) {
    let name = row.text_of("name").to_string();
    let object_identifier = row.text_of("object_identifier").to_string();

    let key_matches = |e: &EntityBreakdown| {
        if !object_identifier.is_empty() {
            e.object_identifier == object_identifier
        } else {
            e.name == name
        }
    };

    if let Some(existing) = entities.iter_mut().find(|e| key_matches(e)) {
        existing.total += counts.total;
        existing.answered += counts.answered;
        existing.abandoned += counts.abandoned;
    } else {
        entities.push(EntityBreakdown {
            name,
            grouping_name: row.text_of("grouping_name").to_string(),
            object_identifier,
            group_names: row.text_of("group_names").to_string(),
            total: counts.total,
            answered: counts.answered,
            abandoned: counts.abandoned,
        });
    }
}

/// Collect dynamic transfer-destination columns, stripping the descriptive
/// prefixes the source prepends to destination names.
fn merge_transfers(transfers: &mut BTreeMap<String, u64>, row: &Element, spec_tag: &str) {
    let Some(spec) = row.child(spec_tag) else {
        return;
    };

    for column in spec.find_all("dynamic_column") {
        let Some(raw_name) = column.child_text("column_name") else {
            continue;
        };
        let Some(count) = column.child_text("column_value").and_then(|v| v.parse::<u64>().ok())
        else {
            continue;
        };

        let name = raw_name
            .strip_prefix("Connected to ")
            .or_else(|| raw_name.strip_prefix("Transferred to "))
            .unwrap_or(raw_name)
            .trim();
        if name.is_empty() {
            continue;
        }

        *transfers.entry(name.to_string()).or_insert(0) += count;
    }
}

/// Parse an hour label like "09:00" (or bare "9") into 0..=23.
fn parse_hour_label(label: &str) -> Option<u8> {
    let hour_part = label.split(':').next()?.trim();
    let hour: u8 = hour_part.parse().ok()?;
    (hour <= 23).then_some(hour)
}

//! Report artifact composition.
//!
//! Pure assembly of the final deliverable: subject line, self-contained HTML
//! body with base64-embedded charts, and the truncated plain-text preview
//! stored alongside the ledger row. No I/O happens here.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;

use crate::aggregate::ReportSummary;
use crate::narrative;
use crate::parser::NormalizedMetrics;

/// Maximum plain-text preview length persisted with a ledger row.
pub const PREVIEW_MAX_CHARS: usize = 500;

const SUBJECT_MAX_NAMES: usize = 3;

/// The composed deliverable for one report occurrence.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub subject: String,
    pub html: String,
    pub preview: String,
}

/// Chart images rendered for the artifact. Either may be absent when its
/// series was empty or rendering degraded.
#[derive(Debug, Clone, Default)]
pub struct ChartSet {
    pub trend_png: Option<Vec<u8>>,
    pub hourly_png: Option<Vec<u8>>,
}

/// Assemble the artifact. `narrative_text` is `None` when generation failed;
/// the composer then embeds the deterministic fallback commentary.
pub fn compose(
    metrics: &NormalizedMetrics,
    summary: &ReportSummary,
    narrative_text: Option<&str>,
    charts: &ChartSet,
    report_date: NaiveDate,
    locale: &str,
) -> Artifact {
    let subject = build_subject(metrics, report_date);
    let commentary = match narrative_text {
        Some(text) if !text.trim().is_empty() => text.trim().to_string(),
        _ => narrative::fallback_narrative(metrics, summary, locale),
    };
    let html = build_html(metrics, summary, &commentary, charts, locale);
    let preview = build_preview(&subject, &commentary, metrics);

    Artifact {
        subject,
        html,
        preview,
    }
}

fn build_subject(metrics: &NormalizedMetrics, report_date: NaiveDate) -> String {
    let mut subject = format!(
        "Report Automatico del {}",
        report_date.format("%d/%m/%Y")
    );

    let names = display_names(metrics);
    if !names.is_empty() {
        let shown: Vec<&str> = names
            .iter()
            .take(SUBJECT_MAX_NAMES)
            .map(String::as_str)
            .collect();
        let mut entities = shown.join(", ");
        let extra = names.len().saturating_sub(SUBJECT_MAX_NAMES);
        if extra > 0 {
            entities.push_str(&format!(" e altri {extra}"));
        }
        subject.push_str(&format!(
            " - {} '{}'",
            metrics.report_type.display(),
            entities
        ));
    }

    subject
}

/// Entity names shortened for the subject line. Names of the form
/// "Others/j.doe - Jane Doe" keep only the part after the dash.
fn display_names(metrics: &NormalizedMetrics) -> Vec<String> {
    let mut names = Vec::new();
    for raw in metrics.entity_names() {
        let display = match raw.split_once(" - ") {
            Some((_, after)) => after.trim().to_string(),
            None => raw.to_string(),
        };
        if !display.is_empty() && !names.contains(&display) {
            names.push(display);
        }
    }
    names
}

fn build_html(
    metrics: &NormalizedMetrics,
    summary: &ReportSummary,
    commentary: &str,
    charts: &ChartSet,
    locale: &str,
) -> String {
    let italian = locale.starts_with("it");
    let t = metrics.totals;

    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head>");
    html.push_str("<body style=\"font-family:Arial,sans-serif;color:#222;max-width:760px;margin:auto\">");

    html.push_str(&format!(
        "<h1 style=\"font-size:20px\">{}</h1>",
        escape_html(&if italian {
            format!("Report {}", metrics.report_type.display())
        } else {
            format!("{} Report", metrics.report_type.display())
        })
    ));

    // Commentary
    html.push_str("<div style=\"background:#f5f7fa;padding:12px;border-radius:6px\">");
    for paragraph in commentary.split("\n\n") {
        html.push_str("<p>");
        html.push_str(&escape_html(paragraph));
        html.push_str("</p>");
    }
    html.push_str("</div>");

    // Headline numbers
    let (h_total, h_answered, h_abandoned, h_rate) = if italian {
        ("Totale", "Risposte", "Abbandonate", "Tasso di risposta")
    } else {
        ("Total", "Answered", "Abandoned", "Answer rate")
    };
    html.push_str("<table style=\"border-collapse:collapse;margin-top:16px\" border=\"1\" cellpadding=\"6\">");
    html.push_str(&format!(
        "<tr><th>{h_total}</th><th>{h_answered}</th><th>{h_abandoned}</th><th>{h_rate}</th></tr>"
    ));
    html.push_str(&format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
        t.total,
        t.answered,
        t.abandoned,
        summary.answer_rate * 100.0
    ));
    html.push_str("</table>");

    if !summary.flags.is_empty() {
        html.push_str("<ul>");
        for flag in &summary.flags {
            html.push_str(&format!("<li>{}</li>", escape_html(&flag.describe(locale))));
        }
        html.push_str("</ul>");
    }

    if let Some(png) = &charts.trend_png {
        embed_chart(&mut html, png, if italian { "Andamento" } else { "Trend" });
    }
    if let Some(png) = &charts.hourly_png {
        embed_chart(
            &mut html,
            png,
            if italian {
                "Distribuzione oraria"
            } else {
                "Hourly distribution"
            },
        );
    }

    if !summary.top_entities.is_empty() {
        html.push_str(&format!(
            "<h2 style=\"font-size:16px\">{}</h2>",
            if italian { "Dettaglio" } else { "Breakdown" }
        ));
        html.push_str("<table style=\"border-collapse:collapse\" border=\"1\" cellpadding=\"6\">");
        for (name, total) in &summary.top_entities {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{total}</td></tr>",
                escape_html(name)
            ));
        }
        html.push_str("</table>");
    }

    if !metrics.transfers.is_empty() {
        html.push_str(&format!(
            "<h2 style=\"font-size:16px\">{}</h2>",
            if italian { "Trasferimenti" } else { "Transfers" }
        ));
        html.push_str("<table style=\"border-collapse:collapse\" border=\"1\" cellpadding=\"6\">");
        for (dest, count) in &metrics.transfers {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{count}</td></tr>",
                escape_html(dest)
            ));
        }
        html.push_str("</table>");
    }

    html.push_str("</body></html>");
    html
}

fn embed_chart(html: &mut String, png: &[u8], alt: &str) {
    html.push_str(&format!(
        "<p><img src=\"data:image/png;base64,{}\" alt=\"{}\" style=\"max-width:100%\"/></p>",
        BASE64.encode(png),
        escape_html(alt)
    ));
}

fn build_preview(subject: &str, commentary: &str, metrics: &NormalizedMetrics) -> String {
    let t = metrics.totals;
    let text = format!(
        "{subject}\n{commentary}\ntotal={} answered={} abandoned={}",
        t.total, t.answered, t.abandoned
    );
    if text.chars().count() <= PREVIEW_MAX_CHARS {
        text
    } else {
        text.chars().take(PREVIEW_MAX_CHARS).collect()
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

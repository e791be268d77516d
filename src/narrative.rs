//! AI narrative generation.
//!
//! Produces the prose commentary for a report by calling a chat-completion
//! endpoint. Failures here are never fatal for the pipeline; callers fall
//! back to [`fallback_narrative`] and deliver a degraded artifact.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::aggregate::ReportSummary;
use crate::config::NarrativeConfig;
use crate::parser::{NormalizedMetrics, ReportType};

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("narrative provider did not answer within the configured timeout")]
    Timeout,
    #[error("narrative provider failure: {0}")]
    Provider(String),
}

impl NarrativeError {
    pub fn classification(&self) -> &'static str {
        match self {
            NarrativeError::Timeout => "narrative-timeout",
            NarrativeError::Provider(_) => "narrative-provider",
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Chat-completion client for narrative generation.
pub struct NarrativeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    max_chars: usize,
}

impl NarrativeClient {
    pub fn new(config: &NarrativeConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("reports/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature as f32,
            timeout: Duration::from_secs(config.timeout_seconds),
            max_chars: config.max_chars,
        }
    }

    /// Generate the narrative for one report. A single attempt; the timeout
    /// bounds the whole call so a slow provider cannot eat the run budget.
    pub async fn generate(
        &self,
        metrics: &NormalizedMetrics,
        summary: &ReportSummary,
        locale: &str,
    ) -> Result<String, NarrativeError> {
        let prompt = build_prompt(metrics, summary, locale);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instruction(locale),
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .timeout(self.timeout)
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NarrativeError::Timeout
            } else {
                NarrativeError::Provider(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrativeError::Provider(format!(
                "provider returned status {}",
                status.as_u16()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| NarrativeError::Provider(e.to_string()))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(NarrativeError::Provider(
                "provider returned an empty completion".to_string(),
            ));
        }

        Ok(truncate_chars(content.trim(), self.max_chars))
    }
}

fn system_instruction(locale: &str) -> &'static str {
    if locale.starts_with("it") {
        "Sei un analista di contact center. Scrivi un commento conciso e \
         professionale sui dati del report, in italiano, senza inventare \
         numeri non presenti nei dati."
    } else {
        "You are a contact center analyst. Write a concise, professional \
         commentary on the report data, in English, without inventing \
         numbers not present in the data."
    }
}

fn build_prompt(metrics: &NormalizedMetrics, summary: &ReportSummary, locale: &str) -> String {
    let italian = locale.starts_with("it");
    let mut lines = Vec::new();

    let kind = report_kind_label(metrics.report_type, italian);
    if italian {
        lines.push(format!("Tipo di report: {kind}"));
        lines.push(format!(
            "Chiamate totali: {}, risposte: {}, abbandonate: {} (tasso di risposta {:.1}%)",
            metrics.totals.total,
            metrics.totals.answered,
            metrics.totals.abandoned,
            summary.answer_rate * 100.0
        ));
    } else {
        lines.push(format!("Report type: {kind}"));
        lines.push(format!(
            "Total calls: {}, answered: {}, abandoned: {} (answer rate {:.1}%)",
            metrics.totals.total,
            metrics.totals.answered,
            metrics.totals.abandoned,
            summary.answer_rate * 100.0
        ));
    }

    if let Some(hour) = summary.busiest_hour {
        lines.push(if italian {
            format!("Fascia oraria piu' trafficata: {hour:02}:00")
        } else {
            format!("Busiest hour: {hour:02}:00")
        });
    }

    if !summary.top_entities.is_empty() {
        let ranked: Vec<String> = summary
            .top_entities
            .iter()
            .map(|(name, total)| format!("{name} ({total})"))
            .collect();
        lines.push(if italian {
            format!("Volumi principali: {}", ranked.join(", "))
        } else {
            format!("Top volumes: {}", ranked.join(", "))
        });
    }

    if !metrics.transfers.is_empty() {
        let transfers: Vec<String> = metrics
            .transfers
            .iter()
            .map(|(dest, count)| format!("{dest}: {count}"))
            .collect();
        lines.push(if italian {
            format!("Trasferimenti: {}", transfers.join(", "))
        } else {
            format!("Transfers: {}", transfers.join(", "))
        });
    }

    for flag in &summary.flags {
        lines.push(flag.describe(locale));
    }

    lines.join("\n")
}

fn report_kind_label(report_type: ReportType, italian: bool) -> &'static str {
    match (report_type, italian) {
        (ReportType::Acd, true) => "coda ACD",
        (ReportType::Acd, false) => "ACD queue",
        (ReportType::Huntgroup, true) => "gruppo di risposta",
        (ReportType::Huntgroup, false) => "hunt group",
        (ReportType::Ivr, true) => "risponditore IVR",
        (ReportType::Ivr, false) => "IVR menu",
        (ReportType::Rulebased, true) => "instradamento a regole",
        (ReportType::Rulebased, false) => "rule-based routing",
        (ReportType::User, true) => "operatore",
        (ReportType::User, false) => "agent",
    }
}

/// Deterministic commentary used when the provider is unavailable. Built
/// entirely from the aggregated numbers so the artifact stays truthful.
pub fn fallback_narrative(
    metrics: &NormalizedMetrics,
    summary: &ReportSummary,
    locale: &str,
) -> String {
    let italian = locale.starts_with("it");
    let kind = report_kind_label(metrics.report_type, italian);
    let mut out = if italian {
        format!(
            "Nel periodo il report {kind} registra {} chiamate totali, di cui {} \
             risposte ({:.1}%) e {} abbandonate.",
            metrics.totals.total,
            metrics.totals.answered,
            summary.answer_rate * 100.0,
            metrics.totals.abandoned
        )
    } else {
        format!(
            "The {kind} report records {} total calls, {} answered ({:.1}%) and {} \
             abandoned over the period.",
            metrics.totals.total,
            metrics.totals.answered,
            summary.answer_rate * 100.0,
            metrics.totals.abandoned
        )
    };

    if let Some(hour) = summary.busiest_hour {
        out.push(' ');
        out.push_str(&if italian {
            format!("La fascia oraria piu' trafficata e' {hour:02}:00.")
        } else {
            format!("The busiest hour is {hour:02}:00.")
        });
    }

    for flag in &summary.flags {
        out.push(' ');
        out.push_str(&flag.describe(locale));
        out.push('.');
    }

    out
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

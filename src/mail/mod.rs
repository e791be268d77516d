//! Outbound mail delivery.
//!
//! Artifacts leave the service through a [`ReportMailer`]. The production
//! implementation posts to an HTTP relay; tests swap in wiremock behind the
//! same trait.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::MailConfig;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("mail relay unreachable: {0}")]
    Transport(String),
    #[error("mail relay rejected the message with status {0}")]
    Rejected(u16),
}

impl DeliveryError {
    pub fn classification(&self) -> &'static str {
        "delivery"
    }
}

/// Delivers one composed report to a recipient.
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mailer posting JSON messages to an HTTP relay endpoint.
pub struct HttpRelayMailer {
    client: reqwest::Client,
    relay_url: String,
    relay_token: Option<String>,
}

impl HttpRelayMailer {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("reports/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(15))
                .build()
                .unwrap_or_default(),
            relay_url: config.relay_url.clone(),
            relay_token: config.relay_token.clone(),
        }
    }
}

#[async_trait]
impl ReportMailer for HttpRelayMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), DeliveryError> {
        let mut builder = self
            .client
            .post(&self.relay_url)
            .json(&RelayMessage { to, subject, html });
        if let Some(token) = &self.relay_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected(status.as_u16()))
        }
    }
}

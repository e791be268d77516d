//! Source telemetry fetching.
//!
//! One authenticated GET against the connector's endpoint. Retry policy is
//! deliberately absent here: a failed fetch fails the occurrence and the next
//! scheduled occurrence is the retry vector.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while fetching source telemetry.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error contacting source: {0}")]
    Network(String),
    #[error("source rejected credentials (status {0})")]
    Auth(u16),
    #[error("timeout contacting source")]
    Timeout,
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("empty response from source")]
    Empty,
}

impl FetchError {
    /// Stable classification stored in the history ledger.
    pub fn classification(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Auth(_) => "auth",
            FetchError::Timeout => "timeout",
            FetchError::TooLarge { .. } => "network",
            FetchError::Empty => "network",
        }
    }
}

/// Fetches raw telemetry documents over HTTP.
#[derive(Clone)]
pub struct SourceFetcher {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl SourceFetcher {
    pub fn new(timeout: Duration, max_body_kb: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("reports/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            client,
            max_body_bytes: max_body_kb * 1024,
        }
    }

    /// GET the endpoint, attaching the credential when present.
    ///
    /// Stored credentials may carry an explicit `Bearer ` or `Basic ` scheme
    /// prefix; bare tokens are sent as Bearer.
    pub async fn fetch(&self, endpoint: &str, token: Option<&str>) -> Result<String, FetchError> {
        let mut request = self.client.get(endpoint);
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            let header = if token.starts_with("Bearer ") || token.starts_with("Basic ") {
                token.to_string()
            } else {
                format!("Bearer {token}")
            };
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(FetchError::Auth(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Network(format!("status {status}")));
        }

        if let Some(length) = response.content_length() {
            if length as usize > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        if body.len() > self.max_body_bytes {
            return Err(FetchError::TooLarge {
                limit: self.max_body_bytes,
            });
        }
        if body.trim().is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifications_are_stable() {
        assert_eq!(FetchError::Timeout.classification(), "timeout");
        assert_eq!(FetchError::Auth(401).classification(), "auth");
        assert_eq!(
            FetchError::Network("reset".into()).classification(),
            "network"
        );
        assert_eq!(FetchError::TooLarge { limit: 1 }.classification(), "network");
    }
}

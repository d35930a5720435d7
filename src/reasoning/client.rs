// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP client for the remote reasoning service

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tracing::{debug, warn};

use super::types::{
    parse_generate_response, GenerateRequest, ReasoningConfig, ReasoningError,
    FALLBACK_EXPLANATION,
};

/// Client for fetching per-instrument explanations
///
/// Issues exactly one POST per label, sequentially, with no batching and no
/// retry.
pub struct ReasoningClient {
    client: Client,
    endpoint: String,
    api_key: String,
    timeout_ms: u64,
}

impl ReasoningClient {
    /// Create a new reasoning client
    pub fn new(config: ReasoningConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        debug!("Reasoning client configured: endpoint={}", endpoint);

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            timeout_ms: config.timeout_ms,
        })
    }

    /// Fetch an explanation for one instrument, surfacing the failure reason
    ///
    /// # Errors
    /// Returns a tagged [`ReasoningError`] for timeouts, transport failures,
    /// non-2xx statuses, malformed bodies and candidate-less responses.
    pub async fn explain_checked(&self, label: &str) -> Result<String, ReasoningError> {
        let request = GenerateRequest::single_prompt(build_prompt(label));

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    ReasoningError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ReasoningError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ReasoningError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                ReasoningError::Transport(e.to_string())
            }
        })?;

        parse_generate_response(&body)
    }

    /// Fetch an explanation, degrading to the fixed fallback string
    ///
    /// This is the rendering-path entry point: it never fails. Failures are
    /// logged with their tagged reason before being absorbed.
    pub async fn explain(&self, label: &str) -> String {
        match self.explain_checked(label).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Reasoning lookup failed for '{}': {}", label, e);
                FALLBACK_EXPLANATION.to_string()
            }
        }
    }
}

/// Build the single natural-language prompt for one instrument
fn build_prompt(label: &str) -> String {
    format!(
        "Explain what '{}' is, how it works, and its purpose in physics \
         laboratories. Write a clean, concise 3-line paragraph.",
        label
    )
}

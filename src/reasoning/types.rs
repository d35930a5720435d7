// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wire types and errors for the reasoning service

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed string rendered when a reasoning lookup fails
pub const FALLBACK_EXPLANATION: &str = "Reasoning unavailable.";

/// Configuration for the reasoning client
#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    /// Full URL of the generate-content endpoint
    pub endpoint: String,
    /// API key, supplied as a query parameter
    pub api_key: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

/// Errors that can occur during a reasoning lookup
///
/// Never surfaces past [`crate::reasoning::ReasoningClient::explain`];
/// tagged so failures stay diagnosable in the logs.
#[derive(Debug, Error)]
pub enum ReasoningError {
    /// Request exceeded the configured timeout
    #[error("Reasoning request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// Transport-level failure before a response arrived
    #[error("Reasoning transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from the service
    #[error("Reasoning API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// Response body was not valid JSON of the expected shape
    #[error("Malformed reasoning response: {0}")]
    MalformedResponse(String),

    /// Response parsed but carried no text candidate
    #[error("Reasoning response missing text candidates")]
    MissingCandidates,
}

// --- Generate-content wire shapes ---

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: CandidateContent,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl GenerateRequest {
    /// Wrap a single prompt in the nested request shape
    pub fn single_prompt(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        }
    }
}

/// Parse a response body and extract the first candidate's text
///
/// Distinguishes an unparseable body from a parseable one that simply has
/// no candidates, so operators can tell the two failure modes apart.
pub fn parse_generate_response(body: &str) -> Result<String, ReasoningError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ReasoningError::MalformedResponse(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or(ReasoningError::MissingCandidates)
}

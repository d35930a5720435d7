// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Node configuration loaded from environment variables

use std::env;

use crate::reasoning::ReasoningConfig;

/// Default path of the detection weights artifact
const DEFAULT_MODEL_PATH: &str = "./models/best.onnx";

/// Default endpoint of the remote reasoning service
const DEFAULT_REASONING_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent";

/// Top-level configuration for the node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port the HTTP API listens on
    pub api_port: u16,
    /// Path to the ONNX detection model artifact
    pub model_path: String,
    /// Remote reasoning service configuration
    pub reasoning: ReasoningConfig,
}

impl NodeConfig {
    /// Load configuration from environment variables
    ///
    /// The reasoning API key is only ever read from the environment
    /// (`REASONING_API_KEY`); there is no compiled-in default.
    pub fn from_env() -> Self {
        Self {
            api_port: env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            model_path: env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string()),
            reasoning: ReasoningConfig {
                endpoint: env::var("REASONING_API_URL")
                    .unwrap_or_else(|_| DEFAULT_REASONING_URL.to_string()),
                api_key: env::var("REASONING_API_KEY").unwrap_or_default(),
                timeout_ms: env::var("REASONING_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model_path.is_empty() {
            return Err("MODEL_PATH must not be empty".to_string());
        }
        if self.reasoning.api_key.is_empty() {
            return Err(
                "REASONING_API_KEY must be set (reasoning requires a credential)".to_string(),
            );
        }
        if !self.reasoning.endpoint.starts_with("http") {
            return Err(format!(
                "REASONING_API_URL must be an http(s) URL, got '{}'",
                self.reasoning.endpoint
            ));
        }
        if self.reasoning.timeout_ms == 0 {
            return Err("REASONING_TIMEOUT_MS must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            api_port: 8080,
            model_path: DEFAULT_MODEL_PATH.to_string(),
            reasoning: ReasoningConfig {
                endpoint: DEFAULT_REASONING_URL.to_string(),
                api_key: String::new(),
                timeout_ms: 10_000,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.reasoning.api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.model_path, DEFAULT_MODEL_PATH);
        assert_eq!(config.reasoning.timeout_ms, 10_000);
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = NodeConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.contains("REASONING_API_KEY"));
    }

    #[test]
    fn test_validation_with_key() {
        assert!(config_with_key().validate().is_ok());
    }

    #[test]
    fn test_validation_bad_endpoint() {
        let mut config = config_with_key();
        config.reasoning.endpoint = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_model_path() {
        let mut config = config_with_key();
        config.model_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut config = config_with_key();
        config.reasoning.timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}

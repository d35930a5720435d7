// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload request type and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;

/// Maximum accepted base64 payload (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Request for uploading an image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Base64-encoded JPEG or PNG data
    #[serde(default)]
    pub image: Option<String>,
}

impl UploadRequest {
    /// Validate the upload request
    pub fn validate(&self) -> Result<(), ApiError> {
        let image = match self.image.as_ref() {
            Some(image) if !image.is_empty() => image,
            _ => {
                return Err(ApiError::ValidationError {
                    field: "image".to_string(),
                    message: "image is required".to_string(),
                })
            }
        };

        if image.len() > MAX_IMAGE_SIZE {
            return Err(ApiError::ValidationError {
                field: "image".to_string(),
                message: format!("image exceeds maximum size of {} bytes", MAX_IMAGE_SIZE),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_missing_image() {
        let request = UploadRequest { image: None };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validation_empty_image() {
        let request = UploadRequest {
            image: Some(String::new()),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validation_oversized_image() {
        let request = UploadRequest {
            image: Some("a".repeat(MAX_IMAGE_SIZE + 1)),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validation_valid_request() {
        let request = UploadRequest {
            image: Some("dGVzdA==".to_string()),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_deserialization_defaults() {
        let request: UploadRequest = serde_json::from_str("{}").unwrap();
        assert!(request.image.is_none());
    }
}

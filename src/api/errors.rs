// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::collections::HashMap;
use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// JSON error envelope returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    /// Detection requested before any image was uploaded
    NoImage,
    /// A detected class id fell outside the label table
    LabelTableMismatch {
        class_id: usize,
        table_size: usize,
    },
    InternalError(String),
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::NoImage => (
                "no_image",
                "No image uploaded; upload an image before requesting detection".to_string(),
                None,
            ),
            ApiError::LabelTableMismatch {
                class_id,
                table_size,
            } => {
                let mut details = HashMap::new();
                details.insert(
                    "class_id".to_string(),
                    serde_json::Value::Number((*class_id).into()),
                );
                details.insert(
                    "table_size".to_string(),
                    serde_json::Value::Number((*table_size).into()),
                );
                (
                    "label_table_mismatch",
                    format!(
                        "Detected class id {} outside the {}-entry label table; \
                         model and label table are out of step",
                        class_id, table_size
                    ),
                    Some(details),
                )
            }
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::NoImage => 400,
            ApiError::LabelTableMismatch { .. } | ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::NoImage => write!(f, "No image uploaded"),
            ApiError::LabelTableMismatch {
                class_id,
                table_size,
            } => write!(
                f,
                "Class id {} outside label table of {} entries",
                class_id, table_size
            ),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::response::Json(self.to_response())).into_response()
    }
}

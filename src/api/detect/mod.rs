// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload / detect / reset endpoint module
//!
//! Provides POST /v1/upload, POST /v1/detect and POST /v1/reset.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{detect_handler, explain_labels, reset_handler, upload_handler};
pub use request::UploadRequest;
pub use response::{DetectResponse, ResetResponse, UploadResponse};

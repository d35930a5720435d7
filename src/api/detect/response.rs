// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload / detect / reset response types

use serde::Serialize;

use crate::session::{InstrumentReport, SessionPhase};
use crate::vision::{PREVIEW_HEIGHT, PREVIEW_WIDTH};

/// Response from a successful upload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Original image width in pixels
    pub width: u32,
    /// Original image height in pixels
    pub height: u32,
    /// Detected source format ("jpg" or "png")
    pub format: String,
    /// Base64 PNG preview, resized for display only
    pub preview: String,
    /// Preview width in pixels
    pub preview_width: u32,
    /// Preview height in pixels
    pub preview_height: u32,
    /// Session phase after the upload
    pub phase: SessionPhase,
}

impl UploadResponse {
    pub fn new(width: u32, height: u32, format: &str, preview: String) -> Self {
        Self {
            width,
            height,
            format: format.to_string(),
            preview,
            preview_width: PREVIEW_WIDTH,
            preview_height: PREVIEW_HEIGHT,
            phase: SessionPhase::ImageLoaded,
        }
    }
}

/// Response from a detection pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    /// Whether any instrument was detected
    pub detected: bool,
    /// One entry per unique instrument, with its explanation
    pub instruments: Vec<InstrumentReport>,
    /// Human-readable outcome line
    pub message: String,
    /// Processing time in milliseconds (inference + reasoning)
    pub processing_time_ms: u64,
    /// Session phase after the pass
    pub phase: SessionPhase,
}

impl DetectResponse {
    /// Outcome when the model reported no boxes at all
    pub fn nothing_detected(processing_time_ms: u64) -> Self {
        Self {
            detected: false,
            instruments: vec![],
            message: "No instruments detected.".to_string(),
            processing_time_ms,
            phase: SessionPhase::ImageLoaded,
        }
    }

    /// Outcome carrying at least one resolved instrument
    pub fn detected(instruments: Vec<InstrumentReport>, processing_time_ms: u64) -> Self {
        Self {
            detected: true,
            instruments,
            message: "Instrument(s) detected.".to_string(),
            processing_time_ms,
            phase: SessionPhase::Detected,
        }
    }
}

/// Response from a reset
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    /// Always `idle` after a reset
    pub phase: SessionPhase,
}

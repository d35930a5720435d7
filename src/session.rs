// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Transient per-session state for the detection page
//!
//! The node keeps exactly one in-memory session. Its phase is derived from
//! what the user has done so far:
//!
//! `Idle` (no image) → `ImageLoaded` (uploaded, not yet detected) →
//! `Detected` (labels + explanations available) → `Idle` again on reset.
//!
//! Every transition is user-initiated; nothing moves on a timer. Reset
//! unconditionally discards the image, labels and explanations. A detection
//! pass that finds nothing leaves the session in `ImageLoaded`.

use image::DynamicImage;
use serde::Serialize;

/// Phase of the single UI session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    ImageLoaded,
    Detected,
}

/// One detected instrument with its fetched explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentReport {
    /// Resolved instrument name
    pub label: String,
    /// Explanation text (or the fixed fallback)
    pub explanation: String,
}

/// The single in-memory session
#[derive(Debug, Default)]
pub struct Session {
    image: Option<DynamicImage>,
    reports: Vec<InstrumentReport>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase, derived from held state
    pub fn phase(&self) -> SessionPhase {
        match (&self.image, self.reports.is_empty()) {
            (None, _) => SessionPhase::Idle,
            (Some(_), true) => SessionPhase::ImageLoaded,
            (Some(_), false) => SessionPhase::Detected,
        }
    }

    /// Store a freshly uploaded image, discarding any previous results
    pub fn load_image(&mut self, image: DynamicImage) {
        self.image = Some(image);
        self.reports.clear();
    }

    /// The uploaded image, if any
    pub fn image(&self) -> Option<&DynamicImage> {
        self.image.as_ref()
    }

    /// Record the outcome of a detection pass
    ///
    /// An empty report list is a valid outcome ("nothing detected") and
    /// keeps the session in `ImageLoaded`.
    pub fn record_detection(&mut self, reports: Vec<InstrumentReport>) {
        self.reports = reports;
    }

    /// Detection results from the last pass
    pub fn reports(&self) -> &[InstrumentReport] {
        &self.reports
    }

    /// Clear all transient state, returning to `Idle`
    pub fn reset(&mut self) {
        self.image = None;
        self.reports.clear();
    }
}

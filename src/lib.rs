// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod reasoning;
pub mod session;
pub mod vision;

// Re-export main types
pub use config::NodeConfig;
pub use reasoning::{ReasoningClient, ReasoningConfig, ReasoningError, FALLBACK_EXPLANATION};
pub use session::{InstrumentReport, Session, SessionPhase};
pub use vision::{
    resolve_labels, DetectError, DetectedBox, InstrumentDetector, LabelError, INSTRUMENT_CLASSES,
};

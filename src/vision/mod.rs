// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module
//!
//! Provides image decoding, the instrument detector, and class label
//! resolution.

pub mod detector;
pub mod image_utils;
pub mod labels;

pub use detector::{DetectError, DetectedBox, InstrumentDetector};
pub use image_utils::{
    decode_base64_image, decode_image_bytes, render_preview, ImageError, ImageInfo, PREVIEW_HEIGHT,
    PREVIEW_WIDTH,
};
pub use labels::{resolve_labels, LabelError, INSTRUMENT_CLASSES};

// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Instrument detector backed by an ONNX object-detection model
//!
//! Wraps a single ONNX Runtime session around the exported detection
//! weights (`best.onnx`). The session is created once at startup and shared
//! for the lifetime of the process; a missing or unreadable artifact is a
//! startup failure, not a per-request one.
//!
//! The forward pass follows the usual single-image YOLO layout: letterbox
//! the bitmap to the model's input square, run inference, decode the
//! `[1, 4 + classes, anchors]` output and apply the predictor's stock
//! confidence/NMS thresholds. No additional filtering is applied on top.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array2, Array4, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::labels::INSTRUMENT_CLASSES;

/// Side length of the square model input
const INPUT_SIZE: u32 = 640;

/// Output features per anchor: 4 box coordinates + one score per class
const NUM_FEATURES: usize = 4 + INSTRUMENT_CLASSES.len();

// Stock predictor thresholds; nothing stricter is applied.
const CONF_THRESHOLD: f32 = 0.25;
const IOU_THRESHOLD: f32 = 0.7;

/// Letterbox padding fill, as a fraction of full brightness
const PAD_FILL: f32 = 114.0 / 255.0;

/// Errors that can occur while loading the model or running detection
#[derive(Debug, Error)]
pub enum DetectError {
    /// The weights artifact does not exist
    #[error("Detection model artifact not found: {0}")]
    ModelNotFound(PathBuf),

    /// ONNX Runtime failed to load the model or run inference
    #[error("Model load or inference error: {0}")]
    Session(#[from] ort::Error),

    /// The model produced an output tensor of an unexpected shape
    #[error("Invalid model output shape: expected [1, features, anchors], got {0:?}")]
    InvalidOutputShape(Vec<usize>),

    /// The inference session lock was poisoned by a panicking thread
    #[error("Inference session lock poisoned")]
    LockPoisoned,
}

/// A single detection: class id, confidence and a normalized corner box
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBox {
    /// Class id assigned by the model (index into the label table)
    pub class_id: usize,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// `[x1, y1, x2, y2]` normalized to the original image
    pub bbox: [f32; 4],
}

/// Scaling parameters recorded during letterbox preprocessing
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
    orig_w: u32,
    orig_h: u32,
}

/// ONNX-backed instrument detector
///
/// Constructed once in `main` and injected wherever detection is needed;
/// the wrapped session is the only shared mutable resource in the process,
/// written at load time and serialized behind a mutex afterwards.
pub struct InstrumentDetector {
    session: Arc<Mutex<Session>>,
    model_path: PathBuf,
}

impl std::fmt::Debug for InstrumentDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentDetector")
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl InstrumentDetector {
    /// Load the detection model from disk
    ///
    /// Performed exactly once, at startup. Failure here is fatal for the
    /// node; there is no fallback model.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, DetectError> {
        let model_path = model_path.as_ref().to_path_buf();

        if !model_path.exists() {
            return Err(DetectError::ModelNotFound(model_path));
        }

        let session = Session::builder()?
            .with_execution_providers([CPUExecutionProvider::default().build()])?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)?;

        info!("✅ Detection model loaded from {}", model_path.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            model_path,
        })
    }

    /// Path the model was loaded from
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Run detection on a decoded image
    ///
    /// Returns every box the model reports at its stock thresholds; an
    /// empty vector means "nothing detected" and is not an error.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<DetectedBox>, DetectError> {
        let (input, letterbox) = preprocess(image);

        let mut session = self.session.lock().map_err(|_| DetectError::LockPoisoned)?;
        let outputs = session.run(ort::inputs!["images" => Value::from_array(input)?])?;

        let output = outputs[0].try_extract_array::<f32>()?;
        let shape: Vec<usize> = output.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(DetectError::InvalidOutputShape(shape));
        }

        // Normalize to [anchors, features]; exporters disagree on orientation.
        let view = output.index_axis(Axis(0), 0);
        let predictions: Array2<f32> = if view.shape()[0] == NUM_FEATURES {
            view.t()
                .to_owned()
                .into_dimensionality::<Ix2>()
                .map_err(|_| DetectError::InvalidOutputShape(shape.clone()))?
        } else if view.shape()[1] == NUM_FEATURES {
            view.to_owned()
                .into_dimensionality::<Ix2>()
                .map_err(|_| DetectError::InvalidOutputShape(shape.clone()))?
        } else {
            return Err(DetectError::InvalidOutputShape(shape));
        };

        let candidates = decode_predictions(&predictions, &letterbox);
        let detections = non_max_suppression(candidates);

        debug!(
            detections = detections.len(),
            "Detection pass completed on {}x{} image", letterbox.orig_w, letterbox.orig_h
        );

        Ok(detections)
    }
}

/// Letterbox the image into a `[1, 3, S, S]` float tensor
///
/// Aspect ratio is preserved; the remainder of the canvas is filled with
/// the conventional gray value the model was trained against.
fn preprocess(image: &DynamicImage) -> (Array4<f32>, Letterbox) {
    let orig_w = image.width().max(1);
    let orig_h = image.height().max(1);

    let scale = (INPUT_SIZE as f32 / orig_w as f32).min(INPUT_SIZE as f32 / orig_h as f32);
    let new_w = ((orig_w as f32) * scale).round().clamp(1.0, INPUT_SIZE as f32) as u32;
    let new_h = ((orig_h as f32) * scale).round().clamp(1.0, INPUT_SIZE as f32) as u32;

    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let pad_x = (INPUT_SIZE - new_w) as f32 / 2.0;
    let pad_y = (INPUT_SIZE - new_h) as f32 / 2.0;

    let mut canvas = Array4::<f32>::from_elem(
        (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        PAD_FILL,
    );

    let offset_x = pad_x.floor() as usize;
    let offset_y = pad_y.floor() as usize;
    let raw = rgb.as_raw();
    let row_w = new_w as usize;

    for y in 0..new_h as usize {
        for x in 0..row_w {
            let src = (y * row_w + x) * 3;
            canvas[[0, 0, offset_y + y, offset_x + x]] = raw[src] as f32 / 255.0;
            canvas[[0, 1, offset_y + y, offset_x + x]] = raw[src + 1] as f32 / 255.0;
            canvas[[0, 2, offset_y + y, offset_x + x]] = raw[src + 2] as f32 / 255.0;
        }
    }

    (
        canvas,
        Letterbox {
            scale,
            pad_x,
            pad_y,
            orig_w,
            orig_h,
        },
    )
}

/// Decode `[anchors, features]` predictions into candidate boxes
fn decode_predictions(predictions: &Array2<f32>, lb: &Letterbox) -> Vec<DetectedBox> {
    let mut candidates = Vec::new();

    for row in predictions.rows() {
        let (best_class, best_score) = row
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |(bi, bs), (i, &s)| {
                if s > bs {
                    (i, s)
                } else {
                    (bi, bs)
                }
            });

        if !best_score.is_finite() || best_score < CONF_THRESHOLD {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
            continue;
        }
        if w <= 0.0 || h <= 0.0 || lb.scale <= f32::EPSILON {
            continue;
        }

        // Undo the letterbox transform, then normalize to the original image
        let x1 = ((cx - w / 2.0) - lb.pad_x) / lb.scale;
        let y1 = ((cy - h / 2.0) - lb.pad_y) / lb.scale;
        let x2 = ((cx + w / 2.0) - lb.pad_x) / lb.scale;
        let y2 = ((cy + h / 2.0) - lb.pad_y) / lb.scale;

        let bbox = [
            (x1 / lb.orig_w as f32).clamp(0.0, 1.0),
            (y1 / lb.orig_h as f32).clamp(0.0, 1.0),
            (x2 / lb.orig_w as f32).clamp(0.0, 1.0),
            (y2 / lb.orig_h as f32).clamp(0.0, 1.0),
        ];

        if (bbox[2] - bbox[0]) < 1e-4 || (bbox[3] - bbox[1]) < 1e-4 {
            continue;
        }

        candidates.push(DetectedBox {
            class_id: best_class,
            confidence: best_score,
            bbox,
        });
    }

    candidates
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter + 1e-6)
}

/// Per-class non-maximum suppression at the stock IoU threshold
fn non_max_suppression(mut candidates: Vec<DetectedBox>) -> Vec<DetectedBox> {
    candidates.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<DetectedBox> = Vec::with_capacity(candidates.len());
    'outer: for c in candidates {
        for k in &keep {
            if k.class_id == c.class_id && iou(&c.bbox, &k.bbox) > IOU_THRESHOLD {
                continue 'outer;
            }
        }
        keep.push(c);
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn square_letterbox() -> Letterbox {
        Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 0.0,
            orig_w: INPUT_SIZE,
            orig_h: INPUT_SIZE,
        }
    }

    #[test]
    fn test_load_missing_model() {
        let err = InstrumentDetector::load("/definitely/not/here/best.onnx").unwrap_err();
        assert!(matches!(err, DetectError::ModelNotFound(_)));
    }

    #[test]
    fn test_load_corrupt_model() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not an onnx graph").unwrap();

        let err = InstrumentDetector::load(file.path());
        assert!(matches!(err, Err(DetectError::Session(_))));
    }

    #[test]
    fn test_preprocess_shape_and_padding() {
        // Wide image: vertical padding expected
        let img = DynamicImage::new_rgb8(640, 320);
        let (tensor, lb) = preprocess(&img);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((lb.scale - 1.0).abs() < 1e-6);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 160.0);

        // Padding rows keep the fill value, image rows are black
        assert!((tensor[[0, 0, 0, 0]] - PAD_FILL).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 320, 320]], 0.0);
    }

    #[test]
    fn test_decode_predictions_threshold_and_coords() {
        let mut preds = Array2::<f32>::zeros((2, NUM_FEATURES));
        // Anchor 0: confident class 2 detection centered at (100, 100)
        preds[[0, 0]] = 100.0;
        preds[[0, 1]] = 100.0;
        preds[[0, 2]] = 50.0;
        preds[[0, 3]] = 50.0;
        preds[[0, 4 + 2]] = 0.9;
        // Anchor 1: everything below threshold
        preds[[1, 0]] = 300.0;
        preds[[1, 1]] = 300.0;
        preds[[1, 2]] = 40.0;
        preds[[1, 3]] = 40.0;
        preds[[1, 4 + 5]] = 0.1;

        let boxes = decode_predictions(&preds, &square_letterbox());
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, 2);
        assert!((boxes[0].confidence - 0.9).abs() < 1e-6);
        assert!((boxes[0].bbox[0] - 75.0 / 640.0).abs() < 1e-5);
        assert!((boxes[0].bbox[2] - 125.0 / 640.0).abs() < 1e-5);
    }

    #[test]
    fn test_decode_predictions_skips_degenerate() {
        let mut preds = Array2::<f32>::zeros((1, NUM_FEATURES));
        preds[[0, 0]] = 10.0;
        preds[[0, 1]] = 10.0;
        preds[[0, 2]] = 0.0; // zero-width box
        preds[[0, 3]] = 20.0;
        preds[[0, 4]] = 0.95;

        let boxes = decode_predictions(&preds, &square_letterbox());
        assert!(boxes.is_empty());
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let a = DetectedBox {
            class_id: 1,
            confidence: 0.9,
            bbox: [0.1, 0.1, 0.5, 0.5],
        };
        let b = DetectedBox {
            class_id: 1,
            confidence: 0.8,
            bbox: [0.11, 0.11, 0.51, 0.51],
        };
        let kept = non_max_suppression(vec![a.clone(), b]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0], a);
    }

    #[test]
    fn test_nms_keeps_different_classes() {
        let a = DetectedBox {
            class_id: 1,
            confidence: 0.9,
            bbox: [0.1, 0.1, 0.5, 0.5],
        };
        let b = DetectedBox {
            class_id: 2,
            confidence: 0.8,
            bbox: [0.1, 0.1, 0.5, 0.5],
        };
        let kept = non_max_suppression(vec![a, b]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let a = DetectedBox {
            class_id: 1,
            confidence: 0.9,
            bbox: [0.0, 0.0, 0.2, 0.2],
        };
        let b = DetectedBox {
            class_id: 1,
            confidence: 0.8,
            bbox: [0.6, 0.6, 0.9, 0.9],
        };
        let kept = non_max_suppression(vec![a, b]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_iou_identical_boxes() {
        let b = [0.1, 0.1, 0.5, 0.5];
        assert!((iou(&b, &b) - 1.0).abs() < 1e-3);
    }
}

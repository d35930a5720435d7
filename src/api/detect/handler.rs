// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload / detect / reset endpoint handlers

use std::time::Instant;

use axum::{extract::State, Json};
use tracing::{debug, info, warn};

use super::request::UploadRequest;
use super::response::{DetectResponse, ResetResponse, UploadResponse};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::reasoning::ReasoningClient;
use crate::session::InstrumentReport;
use crate::vision::image_utils::format_to_extension;
use crate::vision::{decode_base64_image, render_preview, resolve_labels, LabelError};

/// POST /v1/upload - Store an uploaded image in the session
///
/// Accepts a base64-encoded JPEG or PNG, decodes it, and returns image
/// metadata plus a fixed-size display preview. No inference happens here.
///
/// # Errors
/// - 400 Bad Request: missing/oversized payload, undecodable image,
///   unsupported format
pub async fn upload_handler(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, ApiError> {
    request.validate()?;

    let image_data = request
        .image
        .as_ref()
        .ok_or_else(|| ApiError::InvalidRequest("image is required".to_string()))?;

    let (image, image_info) = decode_base64_image(image_data).map_err(|e| {
        warn!("Failed to decode uploaded image: {}", e);
        ApiError::InvalidRequest(format!("Invalid image: {}", e))
    })?;

    debug!(
        "Decoded upload: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );

    let preview = render_preview(&image)
        .map_err(|e| ApiError::InternalError(format!("Preview rendering failed: {}", e)))?;

    let response = UploadResponse::new(
        image_info.width,
        image_info.height,
        format_to_extension(image_info.format),
        preview,
    );

    state.session.write().await.load_image(image);
    info!(
        "Image uploaded: {}x{} {}",
        image_info.width, image_info.height, response.format
    );

    Ok(Json(response))
}

/// POST /v1/detect - Run the detection-to-explanation pipeline
///
/// Runs the model on the uploaded image, resolves class ids to instrument
/// names (duplicates collapsed), then fetches one explanation per unique
/// label, sequentially. Zero boxes is a normal outcome, not an error.
///
/// # Errors
/// - 400 Bad Request: no image uploaded yet
/// - 500 Internal Server Error: inference failure, or a class id outside
///   the label table (`label_table_mismatch`)
pub async fn detect_handler(
    State(state): State<AppState>,
) -> Result<Json<DetectResponse>, ApiError> {
    let started = Instant::now();

    // Clone the bitmap out so the session lock is not held across inference
    let image = state
        .session
        .read()
        .await
        .image()
        .cloned()
        .ok_or(ApiError::NoImage)?;

    let boxes = state.detector.detect(&image).map_err(|e| {
        warn!("Detection failed: {}", e);
        ApiError::InternalError(format!("Detection failed: {}", e))
    })?;

    let labels = resolve_labels(&boxes).map_err(|e| match e {
        LabelError::TableMismatch {
            class_id,
            table_size,
        } => {
            warn!("Label table mismatch: class id {} of {}", class_id, table_size);
            ApiError::LabelTableMismatch {
                class_id,
                table_size,
            }
        }
    })?;

    if labels.is_empty() {
        info!("Detection pass found no instruments");
        state.session.write().await.record_detection(vec![]);
        return Ok(Json(DetectResponse::nothing_detected(
            started.elapsed().as_millis() as u64,
        )));
    }

    info!("Detected {} unique instrument(s): {:?}", labels.len(), labels);

    let reports = explain_labels(&labels, &state.reasoning).await;
    state
        .session
        .write()
        .await
        .record_detection(reports.clone());

    Ok(Json(DetectResponse::detected(
        reports,
        started.elapsed().as_millis() as u64,
    )))
}

/// POST /v1/reset - Discard the session image, labels and explanations
pub async fn reset_handler(State(state): State<AppState>) -> Json<ResetResponse> {
    state.session.write().await.reset();
    info!("Session reset");
    Json(ResetResponse {
        phase: crate::session::SessionPhase::Idle,
    })
}

/// Fetch one explanation per label, in order, one request at a time
///
/// Lookups are best-effort: a failed lookup yields the fallback string for
/// that label and the loop continues.
pub async fn explain_labels(labels: &[String], reasoning: &ReasoningClient) -> Vec<InstrumentReport> {
    let mut reports = Vec::with_capacity(labels.len());
    for label in labels {
        let explanation = reasoning.explain(label).await;
        reports.push(InstrumentReport {
            label: label.clone(),
            explanation,
        });
    }
    reports
}

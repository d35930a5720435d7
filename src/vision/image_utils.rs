// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image loading and utility functions for instrument detection

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use thiserror::Error;

/// Maximum image size (10MB)
const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// Fixed preview dimensions shown on the page; display only, never fed to
/// the detector.
pub const PREVIEW_WIDTH: u32 = 800;
pub const PREVIEW_HEIGHT: u32 = 600;

/// Custom error types for image processing
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),

    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Unsupported image format (expected JPEG or PNG)")]
    UnsupportedFormat,

    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    #[error("Failed to encode preview: {0}")]
    EncodeFailed(String),

    #[error("Image data is empty")]
    EmptyData,
}

/// Image information extracted during loading
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Detected format
    pub format: ImageFormat,
    /// Size in bytes
    pub size_bytes: usize,
}

/// Decode a base64-encoded upload into a bitmap
///
/// # Returns
/// * `Ok((DynamicImage, ImageInfo))` - The decoded image and metadata
/// * `Err(ImageError)` - If decoding fails
pub fn decode_base64_image(base64_str: &str) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if base64_str.is_empty() {
        return Err(ImageError::EmptyData);
    }

    let bytes = STANDARD.decode(base64_str)?;
    decode_image_bytes(&bytes)
}

/// Decode raw image bytes
pub fn decode_image_bytes(bytes: &[u8]) -> Result<(DynamicImage, ImageInfo), ImageError> {
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(bytes.len(), MAX_IMAGE_SIZE));
    }

    if bytes.is_empty() {
        return Err(ImageError::EmptyData);
    }

    // Detect format from magic bytes
    let format = detect_format(bytes)?;

    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::DecodeFailed(e.to_string()))?;

    let info = ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        size_bytes: bytes.len(),
    };

    Ok((img, info))
}

/// Detect image format from magic bytes
///
/// Uploads are restricted to the formats the page accepts: JPEG and PNG.
pub fn detect_format(bytes: &[u8]) -> Result<ImageFormat, ImageError> {
    if bytes.len() < 4 {
        return Err(ImageError::UnsupportedFormat);
    }

    match bytes {
        // PNG: 89 50 4E 47 (0x89 P N G)
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok(ImageFormat::Png),

        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Ok(ImageFormat::Jpeg),

        _ => Err(ImageError::UnsupportedFormat),
    }
}

/// Render the fixed-size display preview as a base64 PNG
///
/// The resize is purely cosmetic; detection always runs on the original
/// bitmap.
pub fn render_preview(image: &DynamicImage) -> Result<String, ImageError> {
    let preview = image.resize_exact(PREVIEW_WIDTH, PREVIEW_HEIGHT, FilterType::Triangle);

    let mut buf = Cursor::new(Vec::new());
    preview
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ImageError::EncodeFailed(e.to_string()))?;

    Ok(STANDARD.encode(buf.into_inner()))
}

/// Get the format extension as a string
pub fn format_to_extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "png",
        ImageFormat::Jpeg => "jpg",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 red PNG image (base64)
    const TINY_PNG_BASE64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn test_decode_base64_image_png() {
        let result = decode_base64_image(TINY_PNG_BASE64);
        assert!(result.is_ok(), "Failed to decode PNG: {:?}", result.err());

        let (img, info) = result.unwrap();
        assert_eq!(info.width, 1);
        assert_eq!(info.height, 1);
        assert_eq!(info.format, ImageFormat::Png);
        assert!(img.width() == 1 && img.height() == 1);
    }

    #[test]
    fn test_decode_base64_image_invalid_base64() {
        let result = decode_base64_image("not-valid-base64!!!");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ImageError::InvalidBase64(_)));
    }

    #[test]
    fn test_decode_base64_image_empty() {
        let result = decode_base64_image("");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ImageError::EmptyData));
    }

    #[test]
    fn test_decode_base64_image_unsupported_format() {
        // Valid base64 but not an accepted image format
        let random_bytes = STANDARD.encode([0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
        let result = decode_base64_image(&random_bytes);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ImageError::UnsupportedFormat));
    }

    #[test]
    fn test_gif_rejected() {
        // GIF89a header decodes as base64 fine but is not JPEG/PNG
        let gif_header = STANDARD.encode([0x47, 0x49, 0x46, 0x38, 0x39, 0x61]);
        let result = decode_base64_image(&gif_header);
        assert!(matches!(result.unwrap_err(), ImageError::UnsupportedFormat));
    }

    #[test]
    fn test_decode_base64_image_corrupted() {
        // PNG header but corrupted data
        let corrupted = STANDARD.encode([0x89, 0x50, 0x4E, 0x47, 0x00, 0x00, 0x00, 0x00]);
        let result = decode_base64_image(&corrupted);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ImageError::DecodeFailed(_)));
    }

    #[test]
    fn test_detect_format_png() {
        let png_header = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(detect_format(&png_header).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_format_jpeg() {
        let jpeg_header = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        assert_eq!(detect_format(&jpeg_header).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_decode_image_bytes_too_large() {
        let large_bytes = vec![0u8; MAX_IMAGE_SIZE + 1];
        let result = decode_image_bytes(&large_bytes);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ImageError::TooLarge(_, _)));
    }

    #[test]
    fn test_render_preview_dimensions() {
        let img = DynamicImage::new_rgb8(32, 16);
        let preview_b64 = render_preview(&img).unwrap();

        let bytes = STANDARD.decode(preview_b64).unwrap();
        let preview = image::load_from_memory(&bytes).unwrap();
        assert_eq!(preview.width(), PREVIEW_WIDTH);
        assert_eq!(preview.height(), PREVIEW_HEIGHT);
    }

    #[test]
    fn test_format_to_extension() {
        assert_eq!(format_to_extension(ImageFormat::Png), "png");
        assert_eq!(format_to_extension(ImageFormat::Jpeg), "jpg");
    }
}

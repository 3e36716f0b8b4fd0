use std::path::Path;

use anyhow::{Context, Result};
use flashtrans_types::CapturedImage;
use image::imageops::{self, FilterType};
use image::{ImageEncoder, RgbaImage};

use crate::engine::OcrError;

/// Validate a captured buffer and prepare it for recognition
///
/// Small captures are upscaled 2x, recognizers lose accuracy on tiny glyphs.
pub fn normalize_capture(image: &CapturedImage, upscale_below_px: u32) -> Result<RgbaImage, OcrError> {
    if !image.is_valid() {
        return Err(OcrError::InvalidImage(format!(
            "{}x{} with {} bytes",
            image.width,
            image.height,
            image.pixels.len()
        )));
    }

    let buffer = RgbaImage::from_raw(image.width, image.height, image.pixels.to_vec())
        .ok_or_else(|| OcrError::InvalidImage("buffer does not match dimensions".to_string()))?;

    let longest = buffer.width().max(buffer.height());
    if upscale_below_px > 0 && longest < upscale_below_px {
        tracing::debug!(
            ">>> [OCR] Upscaling {}x{} capture",
            buffer.width(),
            buffer.height()
        );
        return Ok(imageops::resize(
            &buffer,
            buffer.width() * 2,
            buffer.height() * 2,
            FilterType::Triangle,
        ));
    }

    Ok(buffer)
}

/// Load an image file as a capture (PNG, JPEG, ...)
pub fn load_capture(path: &Path) -> Result<CapturedImage> {
    let image = image::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .to_rgba8();
    Ok(into_capture(image))
}

/// Decode encoded image bytes as a capture
pub fn capture_from_encoded(bytes: &[u8]) -> Result<CapturedImage> {
    let image = image::load_from_memory(bytes)
        .context("Failed to decode image")?
        .to_rgba8();
    Ok(into_capture(image))
}

fn into_capture(image: RgbaImage) -> CapturedImage {
    let (width, height) = image.dimensions();
    CapturedImage::new(width, height, image.into_raw())
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buffer)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgba8,
        )
        .context("Failed to encode PNG")?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn test_small_capture_is_upscaled() {
        let capture = CapturedImage::new(10, 5, vec![7; 10 * 5 * 4]);
        let normalized = normalize_capture(&capture, 900).unwrap();
        assert_eq!(normalized.dimensions(), (20, 10));
    }

    #[test]
    fn test_upscale_can_be_disabled() {
        let capture = CapturedImage::new(10, 5, vec![7; 10 * 5 * 4]);
        let normalized = normalize_capture(&capture, 0).unwrap();
        assert_eq!(normalized.dimensions(), (10, 5));
    }

    #[test]
    fn test_mismatched_buffer_is_rejected() {
        let capture = CapturedImage::new(10, 5, vec![0; 12]);
        assert!(matches!(
            normalize_capture(&capture, 0),
            Err(OcrError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_png_bytes_decode_into_capture() {
        let mut image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255]));
        image.put_pixel(0, 0, Rgba([9, 9, 9, 255]));

        let png = encode_png(&image).unwrap();
        let capture = capture_from_encoded(&png).unwrap();

        assert!(capture.is_valid());
        assert_eq!((capture.width, capture.height), (3, 2));
        assert_eq!(&capture.pixels[..4], &[9, 9, 9, 255]);
    }
}

//! Raster encoding for export.
//!
//! The export raster format is the only externally-visible artifact of this
//! engine: PNG when alpha must survive (transparent matte), JPEG otherwise.
//! Both encoders come from the `image` crate.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use thiserror::Error;

/// Default JPEG export quality (maps the reference 0.92 quality factor).
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Errors that can occur during raster encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 4), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Encoding failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
}

/// Mime type of an encoded raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
}

impl ImageMime {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageMime::Jpeg => "image/jpeg",
            ImageMime::Png => "image/png",
        }
    }
}

/// An encoded export raster: bytes plus the mime type the host hands to its
/// output consumer.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: ImageMime,
    pub width: u32,
    pub height: u32,
}

/// Encode RGBA pixel data to JPEG bytes.
///
/// JPEG has no alpha channel; pixels are flattened to RGB, dropping alpha.
/// Quality is clamped to 1-100.
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height)?;

    let quality = quality.clamp(1, 100);

    // Flatten RGBA to RGB
    let mut rgb = Vec::with_capacity((width as usize) * (height as usize) * 3);
    for px in pixels.chunks_exact(4) {
        rgb.extend_from_slice(&px[0..3]);
    }

    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// Encode RGBA pixel data to PNG bytes, preserving alpha.
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height)?;

    let mut buffer = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut buffer);
    encoder
        .write_image(pixels, width, height, ExtendedColorType::Rgba8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// Encode to the given mime type, tagging the result.
pub fn encode(
    pixels: &[u8],
    width: u32,
    height: u32,
    mime: ImageMime,
    quality: u8,
) -> Result<EncodedImage, EncodeError> {
    let bytes = match mime {
        ImageMime::Jpeg => encode_jpeg(pixels, width, height, quality)?,
        ImageMime::Png => encode_png(pixels, width, height)?,
    };
    Ok(EncodedImage {
        bytes,
        mime,
        width,
        height,
    })
}

fn validate(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }
    let expected = (width as usize) * (height as usize) * 4;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_basic() {
        let width = 100u32;
        let height = 100u32;
        let pixels = vec![128u8; (width * height * 4) as usize];

        let jpeg = encode_jpeg(&pixels, width, height, DEFAULT_JPEG_QUALITY).unwrap();

        // Check JPEG magic bytes (SOI marker)
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        // Check JPEG ends with EOI marker
        let len = jpeg.len();
        assert_eq!(&jpeg[len - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_png_basic() {
        let pixels = vec![200u8; 10 * 10 * 4];
        let png = encode_png(&pixels, 10, 10).unwrap();

        // PNG signature
        assert_eq!(&png[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_encode_rejects_zero_dimensions() {
        let result = encode_jpeg(&[], 0, 10, 90);
        assert!(matches!(
            result,
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_encode_rejects_wrong_buffer_size() {
        let pixels = vec![0u8; 10];
        let result = encode_png(&pixels, 10, 10);
        assert!(matches!(result, Err(EncodeError::InvalidPixelData { .. })));
    }

    #[test]
    fn test_quality_clamped() {
        let pixels = vec![128u8; 8 * 8 * 4];
        // Out-of-range quality must not panic, just clamp
        assert!(encode_jpeg(&pixels, 8, 8, 0).is_ok());
        assert!(encode_jpeg(&pixels, 8, 8, 255).is_ok());
    }

    #[test]
    fn test_encode_tags_mime() {
        let pixels = vec![128u8; 4 * 4 * 4];

        let jpeg = encode(&pixels, 4, 4, ImageMime::Jpeg, 90).unwrap();
        assert_eq!(jpeg.mime.as_str(), "image/jpeg");
        assert_eq!((jpeg.width, jpeg.height), (4, 4));

        let png = encode(&pixels, 4, 4, ImageMime::Png, 90).unwrap();
        assert_eq!(png.mime.as_str(), "image/png");
    }
}

//! Source bitmap decoding and pixel storage.
//!
//! The editing session works on a single decoded source photo. Decoding
//! happens at most once per session: [`SourceImage`] keeps the raw bytes and
//! resolves them into a shared [`Bitmap`] on first use. EXIF orientation is
//! applied during decoding so that the rest of the pipeline always sees
//! upright natural dimensions.
//!
//! Pixel data is RGBA (4 bytes per pixel, row-major). The compositor path is
//! alpha-preserving, so alpha is carried from the source all the way to the
//! encoded output.

use std::io::Cursor;
use std::sync::Arc;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};
use thiserror::Error;

/// Error types for source bitmap decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The bytes are not a recognized or supported image format.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// A decoded source photo with RGBA pixel data.
#[derive(Debug, Clone)]
pub struct Bitmap {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGBA pixel data in row-major order (4 bytes per pixel).
    /// Length should be width * height * 4.
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Create a new Bitmap with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width * height * 4) as usize,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create an opaque single-color bitmap. Mostly useful in tests and as
    /// a flat matte fill.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgba);
        }
        Self::new(width, height, pixels)
    }

    /// Create a Bitmap from an image::RgbaImage.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to an image::RgbaImage for further processing.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

/// Decode a source photo from bytes, applying EXIF orientation correction.
///
/// JPEG and PNG are supported. The orientation tag, if present, is baked into
/// the pixel data so callers never have to reason about it again.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the bytes cannot be decoded.
pub fn decode_image(bytes: &[u8]) -> Result<Bitmap, DecodeError> {
    // Extract EXIF orientation before decoding
    let orientation = extract_orientation(bytes);

    let cursor = Cursor::new(bytes);
    let reader = ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let oriented = apply_orientation(img, orientation);

    Ok(Bitmap::from_rgba_image(oriented.into_rgba8()))
}

/// Extract EXIF orientation from image bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let exif_reader = Reader::new();
    let mut cursor = Cursor::new(bytes);

    match exif_reader.read_from_container(&mut cursor) {
        Ok(exif) => {
            if let Some(field) = exif.get_field(Tag::Orientation, In::PRIMARY) {
                if let Some(value) = field.value.get_uint(0) {
                    return Orientation::from(value);
                }
            }
            Orientation::Normal
        }
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation transformation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

/// A lazily-decoded source photo, owned by the editing session.
///
/// The decode runs at most once; the result is shared by reference between
/// the compositor and crop exporter and across repeated preview renders.
#[derive(Debug)]
pub enum SourceImage {
    /// Raw bytes, not decoded yet.
    Pending(Vec<u8>),
    /// Decoded and memoized.
    Ready(Arc<Bitmap>),
}

impl SourceImage {
    /// Wrap raw encoded bytes; decoding is deferred until first use.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        SourceImage::Pending(bytes)
    }

    /// Wrap an already-decoded bitmap.
    pub fn from_bitmap(bitmap: Arc<Bitmap>) -> Self {
        SourceImage::Ready(bitmap)
    }

    /// Resolve the decoded bitmap, decoding on first call.
    pub fn resolve(&mut self) -> Result<Arc<Bitmap>, DecodeError> {
        match self {
            SourceImage::Ready(bitmap) => Ok(Arc::clone(bitmap)),
            SourceImage::Pending(bytes) => {
                let bitmap = Arc::new(decode_image(bytes)?);
                *self = SourceImage::Ready(Arc::clone(&bitmap));
                Ok(bitmap)
            }
        }
    }

    /// The decoded natural dimensions, if the decode already ran.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        match self {
            SourceImage::Ready(bitmap) => Some((bitmap.width, bitmap.height)),
            SourceImage::Pending(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1x1 opaque red PNG, produced by this crate's own encoder.
    fn red_pixel_png() -> Vec<u8> {
        crate::encode::encode_png(&[255, 0, 0, 255], 1, 1).expect("valid buffer")
    }

    #[test]
    fn test_bitmap_creation() {
        let pixels = vec![0u8; 100 * 50 * 4];
        let bmp = Bitmap::new(100, 50, pixels);

        assert_eq!(bmp.width, 100);
        assert_eq!(bmp.height, 50);
        assert_eq!(bmp.pixel_count(), 5000);
        assert!(!bmp.is_empty());
    }

    #[test]
    fn test_bitmap_empty() {
        let bmp = Bitmap::new(0, 0, vec![]);
        assert!(bmp.is_empty());
    }

    #[test]
    fn test_bitmap_filled() {
        let bmp = Bitmap::filled(2, 2, [10, 20, 30, 255]);
        assert_eq!(bmp.pixels.len(), 16);
        assert_eq!(&bmp.pixels[0..4], &[10, 20, 30, 255]);
        assert_eq!(&bmp.pixels[12..16], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_bitmap_rgba_roundtrip() {
        let bmp = Bitmap::filled(3, 2, [1, 2, 3, 4]);
        let img = bmp.to_rgba_image().expect("valid buffer");
        let back = Bitmap::from_rgba_image(img);

        assert_eq!(back.width, 3);
        assert_eq!(back.height, 2);
        assert_eq!(back.pixels, bmp.pixels);
    }

    #[test]
    fn test_orientation_from_u32() {
        assert_eq!(Orientation::from(1), Orientation::Normal);
        assert_eq!(Orientation::from(6), Orientation::Rotate90CW);
        assert_eq!(Orientation::from(99), Orientation::Normal); // Invalid defaults to Normal
    }

    #[test]
    fn test_decode_png_roundtrip() {
        let bmp = decode_image(&red_pixel_png()).expect("valid png");
        assert_eq!(bmp.width, 1);
        assert_eq!(bmp.height, 1);
        assert_eq!(bmp.pixels, vec![255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_image(&[0, 1, 2, 3, 4, 5]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_image_memoizes() {
        let mut source = SourceImage::from_bytes(red_pixel_png());
        assert_eq!(source.natural_size(), None, "not decoded yet");

        let first = source.resolve().expect("decodes");
        let second = source.resolve().expect("memoized");
        assert!(Arc::ptr_eq(&first, &second), "decode should run once");
        assert_eq!(source.natural_size(), Some((1, 1)));
    }

    #[test]
    fn test_source_image_from_bitmap() {
        let bmp = Arc::new(Bitmap::filled(4, 4, [0, 0, 0, 255]));
        let mut source = SourceImage::from_bitmap(Arc::clone(&bmp));
        let resolved = source.resolve().expect("already decoded");
        assert!(Arc::ptr_eq(&bmp, &resolved));
    }
}

//! Rendering kernel: two pipelines over one shared color pass.
//!
//! - [`compositor`]: background matte + transformed foreground + color pass,
//!   for the "frame with backdrop" look.
//! - [`crop`]: rotate-then-crop-then-color, for straight photographic crops.
//!
//! Both pipelines share the color/dither kernel and the same geometry
//! arithmetic, so preview and export (and the two paths) stay numerically
//! consistent for the same [`crate::state::EditState`].

mod color;
mod compositor;
mod crop;

pub use color::{apply_color_pass, LUMINANCE_B, LUMINANCE_G, LUMINANCE_R};
pub use compositor::{compose, compose_pixels};
pub use crop::{export_crop, export_crop_pixels};

use thiserror::Error;

use crate::bitmap::{Bitmap, DecodeError};
use crate::encode::{EncodeError, ImageMime};

/// Errors fatal to one render call (never to the session).
#[derive(Debug, Error)]
pub enum RenderError {
    /// The source bitmap could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The finished buffer could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Options for one render call.
///
/// Geometry that is missing (zero-sized frame or target) is not an error:
/// the render returns `Ok(None)` and the caller retries after layout
/// settles.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Preview downsampling factor in (0, 1]. `None` renders at the full
    /// target size (export).
    pub preview_scale: Option<f32>,
    /// Encoding override. `None` picks PNG for a transparent matte
    /// (preserves alpha) and JPEG otherwise.
    pub mime: Option<ImageMime>,
    /// JPEG quality override (1-100).
    pub quality: Option<u8>,
}

impl RenderOptions {
    /// Downsampled preview at `scale` times the target size.
    pub fn preview(scale: f32) -> Self {
        Self {
            preview_scale: Some(scale),
            ..Self::default()
        }
    }

    /// Full-size export with default encoding rules.
    pub fn export() -> Self {
        Self::default()
    }
}

/// Bilinear RGBA sample at a continuous lattice coordinate.
///
/// Returns `None` beyond half a pixel outside the image (the caller keeps
/// its background there); coordinates within the half-pixel border are
/// clamped onto the edge row/column instead of bleeding transparency into
/// the visible edge.
pub(crate) fn sample_bilinear(src: &Bitmap, x: f32, y: f32) -> Option<[u8; 4]> {
    let w = src.width as f32;
    let h = src.height as f32;
    if x < -0.5 || y < -0.5 || x > w - 0.5 || y > h - 0.5 {
        return None;
    }

    let xc = x.clamp(0.0, w - 1.0);
    let yc = y.clamp(0.0, h - 1.0);
    let x0 = xc.floor() as usize;
    let y0 = yc.floor() as usize;
    let x1 = (x0 + 1).min(src.width as usize - 1);
    let y1 = (y0 + 1).min(src.height as usize - 1);

    // Fractional distances
    let fx = xc - x0 as f32;
    let fy = yc - y0 as f32;

    let stride = src.width as usize * 4;
    let p00 = &src.pixels[y0 * stride + x0 * 4..][..4];
    let p10 = &src.pixels[y0 * stride + x1 * 4..][..4];
    let p01 = &src.pixels[y1 * stride + x0 * 4..][..4];
    let p11 = &src.pixels[y1 * stride + x1 * 4..][..4];

    let mut result = [0u8; 4];
    for i in 0..4 {
        let v = p00[i] as f32 * (1.0 - fx) * (1.0 - fy)
            + p10[i] as f32 * fx * (1.0 - fy)
            + p01[i] as f32 * (1.0 - fx) * fy
            + p11[i] as f32 * fx * fy;
        result[i] = v.clamp(0.0, 255.0).round() as u8;
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Bitmap {
        // 2x2: TL black, TR white, BL red, BR blue, all opaque
        Bitmap::new(
            2,
            2,
            vec![
                0, 0, 0, 255, 255, 255, 255, 255, //
                255, 0, 0, 255, 0, 0, 255, 255,
            ],
        )
    }

    #[test]
    fn test_sample_at_lattice_points() {
        let bmp = two_by_two();
        assert_eq!(sample_bilinear(&bmp, 0.0, 0.0), Some([0, 0, 0, 255]));
        assert_eq!(sample_bilinear(&bmp, 1.0, 0.0), Some([255, 255, 255, 255]));
        assert_eq!(sample_bilinear(&bmp, 0.0, 1.0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_sample_interpolates_midpoint() {
        let bmp = two_by_two();
        let mid = sample_bilinear(&bmp, 0.5, 0.0).expect("in bounds");
        assert_eq!(mid, [128, 128, 128, 255], "halfway black to white");
    }

    #[test]
    fn test_sample_outside_returns_none() {
        let bmp = two_by_two();
        assert_eq!(sample_bilinear(&bmp, -1.0, 0.0), None);
        assert_eq!(sample_bilinear(&bmp, 0.0, 2.0), None);
    }

    #[test]
    fn test_sample_edge_tolerance_clamps() {
        let bmp = two_by_two();
        // Within half a pixel of the border: clamped, not dropped
        assert_eq!(sample_bilinear(&bmp, -0.4, 0.0), Some([0, 0, 0, 255]));
        assert_eq!(sample_bilinear(&bmp, 1.4, 1.4), Some([0, 0, 255, 255]));
    }
}

//! Matte compositor pipeline.
//!
//! Draws the background layer (nothing, flat color, or the blurred photo
//! itself), then the transformed foreground photo, then runs the shared
//! color pass over the whole buffer. The transform order is fixed:
//! translate to canvas center plus pan, rotate by the quantized angle, scale
//! with per-axis flip signs, draw the natural-size source centered at the
//! origin. That order makes rotation pivot around the visual center
//! regardless of flip state.
//!
//! Drawing is implemented as exact inverse mapping: for every canvas pixel
//! the source coordinate is computed through the inverted affine chain and
//! sampled bilinearly. With rotation quantized to 90-degree steps the
//! inverse rotation is exact integer arithmetic, no trigonometry.

use image::imageops::{self, FilterType};
use log::trace;

use super::{sample_bilinear, RenderError, RenderOptions};
use crate::bitmap::Bitmap;
use crate::encode::{self, ImageMime, DEFAULT_JPEG_QUALITY};
use crate::geometry::Geometry;
use crate::state::{parse_hex_color, BackgroundMode, EditState};

/// Linear map from the 0-100 blur slider onto a bounded gaussian sigma.
const MAX_BLUR_SIGMA: f32 = 40.0;

/// Compose and encode.
///
/// `Ok(None)` when the frame or target geometry is unavailable (zero-sized);
/// the caller retries after layout settles. Encoding picks PNG for a
/// transparent matte unless overridden, JPEG otherwise.
pub fn compose(
    source: &Bitmap,
    state: &EditState,
    target_w: u32,
    target_h: u32,
    opts: &RenderOptions,
) -> Result<Option<crate::encode::EncodedImage>, RenderError> {
    let Some(canvas) = compose_pixels(source, state, target_w, target_h, opts.preview_scale)
    else {
        return Ok(None);
    };

    let mime = opts.mime.unwrap_or_else(|| {
        if state.background_mode() == BackgroundMode::Transparent {
            ImageMime::Png
        } else {
            ImageMime::Jpeg
        }
    });
    let quality = opts.quality.unwrap_or(DEFAULT_JPEG_QUALITY);
    let encoded = encode::encode(&canvas.pixels, canvas.width, canvas.height, mime, quality)?;
    Ok(Some(encoded))
}

/// Compose into a raw RGBA buffer without encoding.
///
/// Returns `None` when any of source, frame or target dimensions is zero.
pub fn compose_pixels(
    source: &Bitmap,
    state: &EditState,
    target_w: u32,
    target_h: u32,
    preview_scale: Option<f32>,
) -> Option<Bitmap> {
    if target_w == 0 || target_h == 0 {
        return None;
    }
    let geom = Geometry::new(
        source.width,
        source.height,
        state.frame_width(),
        state.frame_height(),
        state.rot(),
    )?;

    let preview = match preview_scale {
        Some(s) if s > 0.0 && s <= 1.0 => s,
        _ => 1.0,
    };
    let canvas_w = ((target_w as f32 * preview).round() as u32).max(1);
    let canvas_h = ((target_h as f32 * preview).round() as u32).max(1);
    // Canvas pixels per frame pixel: pan and draw scale live in frame space
    let output_scale = canvas_w as f32 / geom.frame_w as f32;

    trace!(
        "compose {}x{} canvas from {}x{} source, frame {}x{}",
        canvas_w,
        canvas_h,
        source.width,
        source.height,
        geom.frame_w,
        geom.frame_h
    );

    let mut pixels = vec![0u8; (canvas_w as usize) * (canvas_h as usize) * 4];

    // Background layer. Transparent draws nothing; any checkerboard is an
    // interactive UI affordance and never lands in rendered pixels.
    match state.background_mode() {
        BackgroundMode::Transparent => {}
        BackgroundMode::Color => {
            let rgba =
                parse_hex_color(state.background_color()).unwrap_or([255, 255, 255, 255]);
            for px in pixels.chunks_exact_mut(4) {
                px.copy_from_slice(&rgba);
            }
        }
        BackgroundMode::Blur => {
            if let Some(backdrop) = blurred_backdrop(
                source,
                canvas_w,
                canvas_h,
                state.background_blur(),
                canvas_w as f32 / target_w as f32,
            ) {
                pixels.copy_from_slice(&backdrop.pixels);
            }
        }
    }

    // Foreground layer, clamp-consistent: the pan is re-clamped against the
    // current geometry exactly as the constrain step would
    let (tx, ty) = geom.clamp_pan(state.scale(), state.tx(), state.ty());
    let disp = geom.display_scale(state.scale()) * output_scale;
    let center_x = canvas_w as f32 / 2.0 + tx * output_scale;
    let center_y = canvas_h as f32 / 2.0 + ty * output_scale;
    let flip_x = if state.flip_x() { -1.0 } else { 1.0 };
    let flip_y = if state.flip_y() { -1.0 } else { 1.0 };
    let natural_cx = source.width as f32 / 2.0;
    let natural_cy = source.height as f32 / 2.0;
    let rot = state.rot();

    for dy in 0..canvas_h {
        for dx in 0..canvas_w {
            // Canvas pixel center relative to the transform origin
            let vx = dx as f32 + 0.5 - center_x;
            let vy = dy as f32 + 0.5 - center_y;

            let (ux, uy) = unrotate(rot, vx, vy);
            let sx = natural_cx + flip_x * (ux / disp) - 0.5;
            let sy = natural_cy + flip_y * (uy / disp) - 0.5;

            if let Some(src) = sample_bilinear(source, sx, sy) {
                let idx = ((dy * canvas_w + dx) * 4) as usize;
                blend_over(&mut pixels[idx..idx + 4], src);
            }
        }
    }

    // The pass covers the entire buffer, background included: matte and
    // photo share one tonal treatment
    super::apply_color_pass(&mut pixels, canvas_w, canvas_h, state);

    Some(Bitmap::new(canvas_w, canvas_h, pixels))
}

/// Inverse of the quantized rotation (forward rotation is clockwise in
/// screen coordinates, matching the baked 90-degree pixel ops of the crop
/// exporter).
#[inline]
fn unrotate(rot: u16, x: f32, y: f32) -> (f32, f32) {
    match rot {
        90 => (y, -x),
        180 => (-x, -y),
        270 => (-y, x),
        _ => (x, y),
    }
}

/// Source-over blend of a non-premultiplied RGBA sample onto the canvas.
fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        dst.copy_from_slice(&src);
        return;
    }
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for i in 0..3 {
        let c = (src[i] as f32 * sa + dst[i] as f32 * da * (1.0 - sa)) / out_a;
        dst[i] = c.clamp(0.0, 255.0).round() as u8;
    }
    dst[3] = (out_a * 255.0).clamp(0.0, 255.0).round() as u8;
}

/// The same photo, cover-fit to the canvas, gaussian-blurred and
/// center-cropped. `sigma_scale` keeps preview blur visually matched to the
/// export (sigma is defined at target resolution).
fn blurred_backdrop(
    source: &Bitmap,
    canvas_w: u32,
    canvas_h: u32,
    blur: f32,
    sigma_scale: f32,
) -> Option<Bitmap> {
    let img = source.to_rgba_image()?;

    let cover = (canvas_w as f32 / source.width as f32)
        .max(canvas_h as f32 / source.height as f32);
    let scaled_w = ((source.width as f32 * cover).ceil() as u32).max(canvas_w);
    let scaled_h = ((source.height as f32 * cover).ceil() as u32).max(canvas_h);
    let resized = imageops::resize(&img, scaled_w, scaled_h, FilterType::Triangle);

    let sigma = (blur.clamp(0.0, 100.0) / 100.0) * MAX_BLUR_SIGMA * sigma_scale;
    let blurred = if sigma > 0.0 {
        imageops::blur(&resized, sigma)
    } else {
        resized
    };

    let x0 = (scaled_w - canvas_w) / 2;
    let y0 = (scaled_h - canvas_h) / 2;
    let cropped = imageops::crop_imm(&blurred, x0, y0, canvas_w, canvas_h).to_image();
    Some(Bitmap::from_rgba_image(cropped))
}

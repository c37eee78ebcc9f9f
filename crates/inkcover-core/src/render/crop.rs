//! Crop exporter pipeline.
//!
//! For targets with no backdrop the export is a straight photographic crop:
//! flips and the quantized rotation are baked into a rotated canvas once
//! (exact pixel permutations, not resampling), the crop rectangle implied by
//! the viewport is computed in rotated-canvas space, and that rectangle is
//! resampled into the output. The shared color pass runs last, identical to
//! the compositor's.

use image::imageops;
use log::trace;

use super::{sample_bilinear, RenderError, RenderOptions};
use crate::bitmap::Bitmap;
use crate::catalog::{OutputMode, TargetSelection};
use crate::encode::{self, ImageMime, DEFAULT_JPEG_QUALITY};
use crate::geometry::Geometry;
use crate::state::EditState;

/// Pull-back distance when floating point pushes the crop rectangle past the
/// rotated-canvas edge; avoids sampling one pixel past the bound.
const EDGE_EPS: f32 = 1e-3;

/// Export the crop and encode it.
///
/// The crop has no backdrop, so encoding defaults to JPEG; the mime override
/// still wins. `Ok(None)` when frame or target geometry is unavailable.
pub fn export_crop(
    source: &Bitmap,
    state: &EditState,
    target: &TargetSelection,
    opts: &RenderOptions,
) -> Result<Option<crate::encode::EncodedImage>, RenderError> {
    let Some(out) = export_crop_pixels(source, state, target) else {
        return Ok(None);
    };

    let mime = opts.mime.unwrap_or(ImageMime::Jpeg);
    let quality = opts.quality.unwrap_or(DEFAULT_JPEG_QUALITY);
    let encoded = encode::encode(&out.pixels, out.width, out.height, mime, quality)?;
    Ok(Some(encoded))
}

/// Compute the crop into a raw RGBA buffer without encoding.
///
/// Output size is the target's fixed resolution (`OutputMode::Target`) or
/// the crop's own pixel size (`OutputMode::Source`), per the target
/// descriptor.
pub fn export_crop_pixels(
    source: &Bitmap,
    state: &EditState,
    target: &TargetSelection,
) -> Option<Bitmap> {
    if target.width == 0 || target.height == 0 {
        return None;
    }
    let geom = Geometry::new(
        source.width,
        source.height,
        state.frame_width(),
        state.frame_height(),
        state.rot(),
    )?;

    // Rotation and flips are baked into pixels once, not re-derived per frame
    let baked = bake_orientation(source, state.flip_x(), state.flip_y(), state.rot())?;
    let rot_w = baked.width as f32;
    let rot_h = baked.height as f32;

    let disp = geom.display_scale(state.scale());
    let (tx, ty) = geom.clamp_pan(state.scale(), state.tx(), state.ty());

    // Crop rectangle in rotated-canvas space
    let crop_w = (geom.frame_w as f32 / disp).min(rot_w);
    let crop_h = (geom.frame_h as f32 / disp).min(rot_h);
    let mut sx = rot_w / 2.0 - crop_w / 2.0 - tx / disp;
    let mut sy = rot_h / 2.0 - crop_h / 2.0 - ty / disp;
    sx = sx.clamp(0.0, rot_w - crop_w);
    sy = sy.clamp(0.0, rot_h - crop_h);
    if sx + crop_w > rot_w {
        sx = (rot_w - crop_w - EDGE_EPS).max(0.0);
    }
    if sy + crop_h > rot_h {
        sy = (rot_h - crop_h - EDGE_EPS).max(0.0);
    }

    let (out_w, out_h) = match target.output {
        OutputMode::Target => (target.width, target.height),
        OutputMode::Source => (
            (crop_w.round() as u32).max(1),
            (crop_h.round() as u32).max(1),
        ),
    };

    trace!(
        "crop {}x{} at ({:.2}, {:.2}) from {}x{} rotated, out {}x{}",
        crop_w,
        crop_h,
        sx,
        sy,
        baked.width,
        baked.height,
        out_w,
        out_h
    );

    let mut pixels = vec![0u8; (out_w as usize) * (out_h as usize) * 4];
    let kx = crop_w / out_w as f32;
    let ky = crop_h / out_h as f32;

    for oy in 0..out_h {
        for ox in 0..out_w {
            let src_x = sx + (ox as f32 + 0.5) * kx - 0.5;
            let src_y = sy + (oy as f32 + 0.5) * ky - 0.5;
            let px = sample_bilinear(&baked, src_x, src_y).unwrap_or([0, 0, 0, 0]);
            let idx = ((oy * out_w + ox) * 4) as usize;
            pixels[idx..idx + 4].copy_from_slice(&px);
        }
    }

    super::apply_color_pass(&mut pixels, out_w, out_h, state);

    Some(Bitmap::new(out_w, out_h, pixels))
}

/// Bake flips then the quantized rotation into pixels. All four operations
/// are exact permutations from `image::imageops`.
fn bake_orientation(source: &Bitmap, flip_x: bool, flip_y: bool, rot: u16) -> Option<Bitmap> {
    let mut img = source.to_rgba_image()?;
    if flip_x {
        img = imageops::flip_horizontal(&img);
    }
    if flip_y {
        img = imageops::flip_vertical(&img);
    }
    let img = match rot {
        90 => imageops::rotate90(&img),
        180 => imageops::rotate180(&img),
        270 => imageops::rotate270(&img),
        _ => img,
    };
    Some(Bitmap::from_rgba_image(img))
}

//! Shared color and dither pass.
//!
//! Both rendering pipelines (compositor and crop exporter) run this exact
//! pass over their finished buffer, so preview and export stay visually
//! consistent for the same [`EditState`]. The pass covers the *entire*
//! composited buffer, background matte included: matte and photo share one
//! tonal treatment.
//!
//! ## Per-pixel order
//!
//! 1. Contrast around the 128 midpoint: `v' = (v - 128) * contrast + 128`
//! 2. Brightness: `v'' = v' * brightness`
//! 3. Color path: luminance mix toward/away from gray by `saturation`
//! 4. B&W path: BT.709 luminance replicated, optionally Floyd-Steinberg
//!    dithered to pure black/white
//!
//! Alpha is untouched throughout.

use crate::state::EditState;

/// ITU-R BT.709 coefficient for red channel in luminance calculation.
pub const LUMINANCE_R: f32 = 0.2126;

/// ITU-R BT.709 coefficient for green channel in luminance calculation.
pub const LUMINANCE_G: f32 = 0.7152;

/// ITU-R BT.709 coefficient for blue channel in luminance calculation.
pub const LUMINANCE_B: f32 = 0.0722;

/// Apply the color/dither pass in place to an RGBA buffer.
pub fn apply_color_pass(pixels: &mut [u8], width: u32, height: u32, state: &EditState) {
    debug_assert_eq!(
        pixels.len(),
        (width as usize) * (height as usize) * 4,
        "Pixel buffer size mismatch"
    );

    // Early exit if the pass is the identity
    if !state.bw()
        && state.brightness() == 1.0
        && state.contrast() == 1.0
        && state.saturation() == 1.0
    {
        return;
    }

    if state.bw() {
        apply_bw(pixels, width, height, state);
    } else {
        apply_color(pixels, state);
    }
}

/// Contrast then brightness on one channel, in the 0-255 domain.
#[inline]
fn adjust(v: f32, contrast: f32, brightness: f32) -> f32 {
    ((v - 128.0) * contrast + 128.0) * brightness
}

#[inline]
fn luminance(r: f32, g: f32, b: f32) -> f32 {
    LUMINANCE_R * r + LUMINANCE_G * g + LUMINANCE_B * b
}

/// Color path: contrast/brightness then saturation as a mix against the
/// pixel's own luminance.
fn apply_color(pixels: &mut [u8], state: &EditState) {
    let contrast = state.contrast();
    let brightness = state.brightness();
    let saturation = state.saturation();

    for px in pixels.chunks_exact_mut(4) {
        let r = adjust(px[0] as f32, contrast, brightness);
        let g = adjust(px[1] as f32, contrast, brightness);
        let b = adjust(px[2] as f32, contrast, brightness);

        let l = luminance(r, g, b);
        px[0] = (l + (r - l) * saturation).clamp(0.0, 255.0).round() as u8;
        px[1] = (l + (g - l) * saturation).clamp(0.0, 255.0).round() as u8;
        px[2] = (l + (b - l) * saturation).clamp(0.0, 255.0).round() as u8;
    }
}

/// B&W path: luminance plane (saturation ignored), optional error diffusion.
fn apply_bw(pixels: &mut [u8], width: u32, height: u32, state: &EditState) {
    let contrast = state.contrast();
    let brightness = state.brightness();
    let w = width as usize;
    let h = height as usize;

    // Scratch float plane so diffusion error accumulates without 8-bit
    // truncation
    let mut plane = vec![0.0f32; w * h];
    for (i, px) in pixels.chunks_exact(4).enumerate() {
        let r = adjust(px[0] as f32, contrast, brightness);
        let g = adjust(px[1] as f32, contrast, brightness);
        let b = adjust(px[2] as f32, contrast, brightness);
        plane[i] = luminance(r, g, b).clamp(0.0, 255.0);
    }

    if state.dither() {
        floyd_steinberg(&mut plane, w, h);
    }

    for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
        let l = plane[i].clamp(0.0, 255.0).round() as u8;
        px[0] = l;
        px[1] = l;
        px[2] = l;
    }
}

/// Floyd-Steinberg error diffusion over a luminance plane.
///
/// Threshold 128 -> {0, 255}; the signed error goes to 4 neighbors:
///
/// ```text
///        X   7
///    3   5   1      (sixteenths)
/// ```
///
/// Processing is row-major, left to right, top to bottom.
fn floyd_steinberg(plane: &mut [f32], width: usize, height: usize) {
    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            let old = plane[idx];
            let new = if old < 128.0 { 0.0 } else { 255.0 };
            let err = old - new;
            plane[idx] = new;

            if x + 1 < width {
                plane[idx + 1] += err * (7.0 / 16.0);
            }
            if y + 1 < height {
                if x > 0 {
                    plane[idx + width - 1] += err * (3.0 / 16.0);
                }
                plane[idx + width] += err * (5.0 / 16.0);
                if x + 1 < width {
                    plane[idx + width + 1] += err * (1.0 / 16.0);
                }
            }
        }
    }
}

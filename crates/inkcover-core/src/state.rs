//! Edit state for a cover composition session.
//!
//! [`EditState`] is plain mutable data: the user zoom/pan/rotation/flip
//! transform, the color adjustments, and the background matte parameters.
//! Every setter clamps its input to the documented range and reports whether
//! the stored value actually changed; the history engine relies on that
//! changed flag to deduplicate command recording.
//!
//! Pan translation is intentionally NOT clamped here. Clamping depends on the
//! current geometry (scale, rotation, frame size, natural size) and is a
//! separate constrain step, see [`crate::geometry::Geometry::clamp_translation`].

use serde::{Deserialize, Serialize};

/// User zoom range on top of cover fit.
pub const SCALE_MIN: f32 = 1.0;
pub const SCALE_MAX: f32 = 6.0;

/// Brightness multiplier range.
pub const BRIGHTNESS_MIN: f32 = 0.5;
pub const BRIGHTNESS_MAX: f32 = 1.5;

/// Contrast factor range.
pub const CONTRAST_MIN: f32 = 0.5;
pub const CONTRAST_MAX: f32 = 1.8;

/// Saturation factor range.
pub const SATURATION_MIN: f32 = 0.0;
pub const SATURATION_MAX: f32 = 2.0;

/// Background blur strength range (0 = sharp, 100 = maximum blur).
pub const BLUR_MIN: f32 = 0.0;
pub const BLUR_MAX: f32 = 100.0;

/// How the area behind the photo is filled.
///
/// The background source is always the photo itself; there is no secondary
/// image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackgroundMode {
    /// No backdrop; exported pixels keep their alpha.
    #[default]
    Transparent,
    /// Flat fill with [`EditState::background_color`].
    Color,
    /// The same photo, scaled to cover and blurred.
    Blur,
}

/// The full editable state of one composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditState {
    scale: f32,
    tx: f32,
    ty: f32,
    rot: u16,
    flip_x: bool,
    flip_y: bool,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    bw: bool,
    dither: bool,
    background_mode: BackgroundMode,
    background_color: String,
    background_blur: f32,
    frame_width: u32,
    frame_height: u32,
}

impl Default for EditState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            tx: 0.0,
            ty: 0.0,
            rot: 0,
            flip_x: false,
            flip_y: false,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            bw: false,
            dither: false,
            background_mode: BackgroundMode::Transparent,
            background_color: "#ffffff".to_string(),
            background_blur: 0.0,
            frame_width: 0,
            frame_height: 0,
        }
    }
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Accessors =====

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn tx(&self) -> f32 {
        self.tx
    }

    pub fn ty(&self) -> f32 {
        self.ty
    }

    /// Quantized rotation, always one of {0, 90, 180, 270}.
    pub fn rot(&self) -> u16 {
        self.rot
    }

    pub fn flip_x(&self) -> bool {
        self.flip_x
    }

    pub fn flip_y(&self) -> bool {
        self.flip_y
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn contrast(&self) -> f32 {
        self.contrast
    }

    pub fn saturation(&self) -> f32 {
        self.saturation
    }

    pub fn bw(&self) -> bool {
        self.bw
    }

    pub fn dither(&self) -> bool {
        self.dither
    }

    pub fn background_mode(&self) -> BackgroundMode {
        self.background_mode
    }

    pub fn background_color(&self) -> &str {
        &self.background_color
    }

    pub fn background_blur(&self) -> f32 {
        self.background_blur
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    // ===== Setters =====
    //
    // Each setter clamps and returns true iff the stored value changed.

    pub fn set_scale(&mut self, scale: f32) -> bool {
        let clamped = scale.clamp(SCALE_MIN, SCALE_MAX);
        if clamped == self.scale {
            return false;
        }
        self.scale = clamped;
        true
    }

    /// Set the pan offset in frame pixels. Not clamped to pan bounds; run
    /// the geometry constrain step after transform changes.
    pub fn set_translation(&mut self, tx: f32, ty: f32) -> bool {
        if tx == self.tx && ty == self.ty {
            return false;
        }
        self.tx = tx;
        self.ty = ty;
        true
    }

    /// Set zoom and pan together (one gesture's worth of viewport change).
    pub fn set_viewport(&mut self, scale: f32, tx: f32, ty: f32) -> bool {
        let scale_changed = self.set_scale(scale);
        let pan_changed = self.set_translation(tx, ty);
        scale_changed || pan_changed
    }

    /// Set rotation in degrees. Any input is normalized mod 360 and rounded
    /// to the nearest multiple of 90.
    pub fn set_rotation(&mut self, degrees: i32) -> bool {
        let quantized = quantize_rotation(degrees);
        if quantized == self.rot {
            return false;
        }
        self.rot = quantized;
        true
    }

    pub fn set_flip_x(&mut self, flip: bool) -> bool {
        if flip == self.flip_x {
            return false;
        }
        self.flip_x = flip;
        true
    }

    pub fn set_flip_y(&mut self, flip: bool) -> bool {
        if flip == self.flip_y {
            return false;
        }
        self.flip_y = flip;
        true
    }

    pub fn set_brightness(&mut self, value: f32) -> bool {
        let clamped = value.clamp(BRIGHTNESS_MIN, BRIGHTNESS_MAX);
        if clamped == self.brightness {
            return false;
        }
        self.brightness = clamped;
        true
    }

    pub fn set_contrast(&mut self, value: f32) -> bool {
        let clamped = value.clamp(CONTRAST_MIN, CONTRAST_MAX);
        if clamped == self.contrast {
            return false;
        }
        self.contrast = clamped;
        true
    }

    pub fn set_saturation(&mut self, value: f32) -> bool {
        let clamped = value.clamp(SATURATION_MIN, SATURATION_MAX);
        if clamped == self.saturation {
            return false;
        }
        self.saturation = clamped;
        true
    }

    /// Toggle black & white. Disabling it also forces dither off; dithering
    /// only exists on the luminance plane.
    pub fn set_bw(&mut self, bw: bool) -> bool {
        let dither_cleared = !bw && self.dither;
        if bw == self.bw && !dither_cleared {
            return false;
        }
        self.bw = bw;
        if dither_cleared {
            self.dither = false;
        }
        true
    }

    /// Toggle dithering. A no-op while black & white is off.
    pub fn set_dither(&mut self, dither: bool) -> bool {
        let effective = dither && self.bw;
        if effective == self.dither {
            return false;
        }
        self.dither = effective;
        true
    }

    pub fn set_background_mode(&mut self, mode: BackgroundMode) -> bool {
        if mode == self.background_mode {
            return false;
        }
        self.background_mode = mode;
        true
    }

    pub fn set_background_color(&mut self, color: &str) -> bool {
        if color == self.background_color {
            return false;
        }
        self.background_color = color.to_string();
        true
    }

    pub fn set_background_blur(&mut self, blur: f32) -> bool {
        let clamped = blur.clamp(BLUR_MIN, BLUR_MAX);
        if clamped == self.background_blur {
            return false;
        }
        self.background_blur = clamped;
        true
    }

    /// Record the last known viewport frame size (export-time geometry anchor).
    pub fn set_frame_size(&mut self, width: u32, height: u32) -> bool {
        if width == self.frame_width && height == self.frame_height {
            return false;
        }
        self.frame_width = width;
        self.frame_height = height;
        true
    }
}

/// Normalize a rotation in degrees to one of {0, 90, 180, 270}.
///
/// Normalizes via `((deg % 360) + 360) % 360`, then rounds to the nearest
/// multiple of 90 (360 wraps back to 0).
pub fn quantize_rotation(degrees: i32) -> u16 {
    let normalized = ((degrees % 360) + 360) % 360;
    let rounded = ((normalized as f32 / 90.0).round() as i32 * 90) % 360;
    rounded as u16
}

/// Parse a hex color string into RGBA bytes.
///
/// Accepts `#rgb`, `#rrggbb` and `#rrggbbaa` (leading `#` optional).
/// Returns `None` for anything else; callers pick their own fallback.
pub fn parse_hex_color(input: &str) -> Option<[u8; 4]> {
    let hex = input.trim().strip_prefix('#').unwrap_or(input.trim());
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()?;
            Some([r * 17, g * 17, b * 17, 255])
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some([r, g, b, 255])
        }
        8 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            let a = u8::from_str_radix(&hex[6..8], 16).ok()?;
            Some([r, g, b, a])
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== Clamping Tests =====

    #[test]
    fn test_scale_clamps_to_range() {
        let mut state = EditState::new();

        assert!(state.set_scale(0.2));
        assert_eq!(state.scale(), SCALE_MIN, "scale clamps up to 1");

        assert!(state.set_scale(10.0));
        assert_eq!(state.scale(), SCALE_MAX, "scale clamps down to 6");
    }

    #[test]
    fn test_setter_reports_no_change() {
        let mut state = EditState::new();

        assert!(state.set_brightness(1.2));
        assert!(!state.set_brightness(1.2), "same value is a no-op");

        // Two different inputs clamping to the same stored value
        state.set_scale(6.0);
        assert!(!state.set_scale(9.0), "both clamp to 6.0");
    }

    #[test]
    fn test_adjustment_ranges() {
        let mut state = EditState::new();

        state.set_brightness(0.0);
        assert_eq!(state.brightness(), BRIGHTNESS_MIN);
        state.set_contrast(5.0);
        assert_eq!(state.contrast(), CONTRAST_MAX);
        state.set_saturation(-1.0);
        assert_eq!(state.saturation(), SATURATION_MIN);
        state.set_background_blur(250.0);
        assert_eq!(state.background_blur(), BLUR_MAX);
    }

    #[test]
    fn test_translation_is_not_clamped() {
        let mut state = EditState::new();
        assert!(state.set_translation(10_000.0, -10_000.0));
        assert_eq!(state.tx(), 10_000.0);
        assert_eq!(state.ty(), -10_000.0);
    }

    // ===== Rotation Tests =====

    #[test]
    fn test_rotation_quantizes() {
        assert_eq!(quantize_rotation(0), 0);
        assert_eq!(quantize_rotation(90), 90);
        assert_eq!(quantize_rotation(180), 180);
        assert_eq!(quantize_rotation(270), 270);
        assert_eq!(quantize_rotation(360), 0);
        assert_eq!(quantize_rotation(450), 90);
        assert_eq!(quantize_rotation(-90), 270);
        assert_eq!(quantize_rotation(-450), 270);
    }

    #[test]
    fn test_rotation_rounds_to_nearest_90() {
        assert_eq!(quantize_rotation(44), 0);
        assert_eq!(quantize_rotation(46), 90);
        assert_eq!(quantize_rotation(359), 0, "359 rounds to 360, wraps to 0");
        assert_eq!(quantize_rotation(134), 90);
        assert_eq!(quantize_rotation(136), 180);
    }

    #[test]
    fn test_set_rotation_dedups_after_quantization() {
        let mut state = EditState::new();
        assert!(state.set_rotation(92));
        assert_eq!(state.rot(), 90);
        assert!(!state.set_rotation(88), "also quantizes to 90");
    }

    // ===== BW / Dither Invariant Tests =====

    #[test]
    fn test_dither_requires_bw() {
        let mut state = EditState::new();

        assert!(!state.set_dither(true), "dither without bw is a no-op");
        assert!(!state.dither());

        state.set_bw(true);
        assert!(state.set_dither(true));
        assert!(state.dither());
    }

    #[test]
    fn test_disabling_bw_forces_dither_off() {
        let mut state = EditState::new();
        state.set_bw(true);
        state.set_dither(true);

        assert!(state.set_bw(false));
        assert!(!state.dither(), "dither must read false after set_bw(false)");
    }

    #[test]
    fn test_set_bw_false_reports_change_when_only_dither_clears() {
        let mut state = EditState::new();
        state.set_bw(true);
        state.set_dither(true);
        state.set_bw(false);

        // bw already false, dither already false: genuine no-op now
        assert!(!state.set_bw(false));
    }

    // ===== Hex Color Tests =====

    #[test]
    fn test_parse_hex_color_forms() {
        assert_eq!(parse_hex_color("#ffffff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_hex_color("#000000"), Some([0, 0, 0, 255]));
        assert_eq!(parse_hex_color("336699"), Some([0x33, 0x66, 0x99, 255]));
        assert_eq!(parse_hex_color("#369"), Some([0x33, 0x66, 0x99, 255]));
        assert_eq!(
            parse_hex_color("#11223344"),
            Some([0x11, 0x22, 0x33, 0x44])
        );
    }

    #[test]
    fn test_parse_hex_color_rejects_garbage() {
        assert_eq!(parse_hex_color(""), None);
        assert_eq!(parse_hex_color("#12"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(parse_hex_color("not a color"), None);
    }

    #[test]
    fn test_default_state_is_neutral() {
        let state = EditState::default();
        assert_eq!(state.scale(), 1.0);
        assert_eq!(state.rot(), 0);
        assert_eq!(state.brightness(), 1.0);
        assert_eq!(state.contrast(), 1.0);
        assert_eq!(state.saturation(), 1.0);
        assert!(!state.bw());
        assert!(!state.dither());
        assert_eq!(state.background_mode(), BackgroundMode::Transparent);
    }
}

//! Composition geometry: rotated bounds, cover-fit scale and pan clamping.
//!
//! All rotation in this engine is quantized to multiples of 90 degrees, so
//! the rotated bounding box is an exact dimension swap and the cover-fit
//! scale is exact arithmetic, no trigonometry involved.

use crate::state::EditState;

/// Derived geometry for one (natural size, frame size, rotation) triple.
///
/// Recomputed whenever the frame is resized or the rotation changes; cheap
/// enough to rebuild per render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Unrotated source pixel size.
    pub natural_w: u32,
    pub natural_h: u32,
    /// Viewport frame size in frame pixels.
    pub frame_w: u32,
    pub frame_h: u32,
    /// Source size after quantized rotation (W/H swapped for 90/270).
    pub rotated_w: u32,
    pub rotated_h: u32,
    /// Cover-fit scale: the minimum scale at which the rotated source fully
    /// covers the frame with no blank edges.
    pub base_scale: f32,
}

impl Geometry {
    /// Build the geometry context. Returns `None` when any dimension is zero
    /// (layout not settled yet, or an empty source).
    pub fn new(
        natural_w: u32,
        natural_h: u32,
        frame_w: u32,
        frame_h: u32,
        rot: u16,
    ) -> Option<Self> {
        if natural_w == 0 || natural_h == 0 || frame_w == 0 || frame_h == 0 {
            return None;
        }

        let (rotated_w, rotated_h) = rotated_dims(natural_w, natural_h, rot);
        let base_scale = (frame_w as f32 / rotated_w as f32).max(frame_h as f32 / rotated_h as f32);

        Some(Self {
            natural_w,
            natural_h,
            frame_w,
            frame_h,
            rotated_w,
            rotated_h,
            base_scale,
        })
    }

    /// The actual frame-pixels-per-source-pixel factor used to draw:
    /// cover fit times the user zoom.
    pub fn display_scale(&self, user_scale: f32) -> f32 {
        self.base_scale * user_scale
    }

    /// Maximum pan offset from center, per axis, such that the drawn source
    /// still fully covers the frame.
    pub fn max_pan(&self, user_scale: f32) -> (f32, f32) {
        let disp = self.display_scale(user_scale);
        let max_tx = ((self.rotated_w as f32 * disp - self.frame_w as f32) / 2.0).max(0.0);
        let max_ty = ((self.rotated_h as f32 * disp - self.frame_h as f32) / 2.0).max(0.0);
        (max_tx, max_ty)
    }

    /// Clamp a raw pan offset into the valid range for the given zoom.
    pub fn clamp_pan(&self, user_scale: f32, tx: f32, ty: f32) -> (f32, f32) {
        let (max_tx, max_ty) = self.max_pan(user_scale);
        (tx.clamp(-max_tx, max_tx), ty.clamp(-max_ty, max_ty))
    }

    /// The constrain step: re-clamp the state's pan against this geometry.
    /// Returns true if the state was adjusted.
    pub fn clamp_translation(&self, state: &mut EditState) -> bool {
        let (tx, ty) = self.clamp_pan(state.scale(), state.tx(), state.ty());
        state.set_translation(tx, ty)
    }
}

/// Source dimensions after quantized rotation.
#[inline]
pub fn rotated_dims(width: u32, height: u32, rot: u16) -> (u32, u32) {
    if rot == 90 || rot == 270 {
        (height, width)
    } else {
        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotated_dims() {
        assert_eq!(rotated_dims(1000, 500, 0), (1000, 500));
        assert_eq!(rotated_dims(1000, 500, 90), (500, 1000));
        assert_eq!(rotated_dims(1000, 500, 180), (1000, 500));
        assert_eq!(rotated_dims(1000, 500, 270), (500, 1000));
    }

    #[test]
    fn test_cover_fit_unrotated() {
        // 300x400 frame, 1000x500 natural -> max(0.3, 0.8) = 0.8
        let geom = Geometry::new(1000, 500, 300, 400, 0).expect("valid dims");
        assert_eq!(geom.base_scale, 0.8);
        assert_eq!(geom.display_scale(1.0), 0.8);
    }

    #[test]
    fn test_cover_fit_rotated_90() {
        // Rotated natural becomes 500x1000 -> max(300/500, 400/1000) = 0.6
        let geom = Geometry::new(1000, 500, 300, 400, 90).expect("valid dims");
        assert_eq!(geom.rotated_w, 500);
        assert_eq!(geom.rotated_h, 1000);
        assert_eq!(geom.base_scale, 0.6);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(Geometry::new(0, 500, 300, 400, 0).is_none());
        assert!(Geometry::new(1000, 0, 300, 400, 0).is_none());
        assert!(Geometry::new(1000, 500, 0, 400, 0).is_none());
        assert!(Geometry::new(1000, 500, 300, 0, 0).is_none());
    }

    #[test]
    fn test_no_pan_at_cover_fit_tight_axis() {
        let geom = Geometry::new(1000, 500, 300, 400, 0).expect("valid dims");
        let (max_tx, max_ty) = geom.max_pan(1.0);

        // Height is the tight axis at cover fit: no vertical slack
        assert_eq!(max_ty, 0.0);
        // Width has slack: 1000 * 0.8 - 300 = 500 -> 250 each way
        assert_eq!(max_tx, 250.0);
    }

    #[test]
    fn test_pan_range_grows_with_zoom() {
        let geom = Geometry::new(1000, 500, 300, 400, 0).expect("valid dims");
        let (tx1, ty1) = geom.max_pan(1.0);
        let (tx2, ty2) = geom.max_pan(2.0);

        assert!(tx2 > tx1);
        assert!(ty2 > ty1);
    }

    #[test]
    fn test_clamp_pan() {
        let geom = Geometry::new(1000, 500, 300, 400, 0).expect("valid dims");

        let (tx, ty) = geom.clamp_pan(1.0, 9999.0, -9999.0);
        assert_eq!(tx, 250.0);
        assert_eq!(ty, 0.0);

        let (tx, ty) = geom.clamp_pan(1.0, -10.0, 0.0);
        assert_eq!((tx, ty), (-10.0, 0.0), "in-range pan untouched");
    }

    #[test]
    fn test_clamp_translation_updates_state() {
        let geom = Geometry::new(1000, 500, 300, 400, 0).expect("valid dims");
        let mut state = EditState::new();
        state.set_translation(1000.0, 50.0);

        assert!(geom.clamp_translation(&mut state));
        assert_eq!(state.tx(), 250.0);
        assert_eq!(state.ty(), 0.0);

        assert!(!geom.clamp_translation(&mut state), "already in range");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

//! Replayable edit commands.
//!
//! A [`Command`] is one user-facing mutation, recorded by the history engine
//! and replayed to reconstruct [`EditState`]. Commands carry the final
//! (already clamped) value, so replay is a pure function of baseline + prefix
//! and order-sensitive sequences reproduce bit-identical state.

use serde::{Deserialize, Serialize};

use crate::catalog::TargetSelection;
use crate::state::{BackgroundMode, EditState};

/// One recorded edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    SetBrightness(f32),
    SetContrast(f32),
    SetSaturation(f32),
    SetBw(bool),
    SetDither(bool),
    /// Quantized degrees, one of {0, 90, 180, 270}.
    SetRotation(u16),
    SetFlipX(bool),
    SetFlipY(bool),
    /// One gesture's worth of zoom + pan.
    SetViewport { scale: f32, tx: f32, ty: f32 },
    /// Full snapshot of the new target; restore must not depend on the
    /// catalog still containing the entry.
    ChangeTarget(TargetSelection),
    SetBackgroundMode(BackgroundMode),
    SetBackgroundColor(String),
    SetBackgroundBlur(f32),
}

impl Command {
    /// Apply this command to the session state.
    ///
    /// Goes through the same clamping setters as live input; values recorded
    /// from a clamped state therefore replay to the exact same state.
    /// Changing the target resets the viewport to cover-fit defaults.
    pub fn apply(&self, state: &mut EditState, target: &mut TargetSelection) {
        match self {
            Command::SetBrightness(v) => {
                state.set_brightness(*v);
            }
            Command::SetContrast(v) => {
                state.set_contrast(*v);
            }
            Command::SetSaturation(v) => {
                state.set_saturation(*v);
            }
            Command::SetBw(v) => {
                state.set_bw(*v);
            }
            Command::SetDither(v) => {
                state.set_dither(*v);
            }
            Command::SetRotation(deg) => {
                state.set_rotation(i32::from(*deg));
            }
            Command::SetFlipX(v) => {
                state.set_flip_x(*v);
            }
            Command::SetFlipY(v) => {
                state.set_flip_y(*v);
            }
            Command::SetViewport { scale, tx, ty } => {
                state.set_viewport(*scale, *tx, *ty);
            }
            Command::ChangeTarget(selection) => {
                *target = selection.clone();
                state.set_viewport(1.0, 0.0, 0.0);
            }
            Command::SetBackgroundMode(mode) => {
                state.set_background_mode(*mode);
            }
            Command::SetBackgroundColor(color) => {
                state.set_background_color(color);
            }
            Command::SetBackgroundBlur(v) => {
                state.set_background_blur(*v);
            }
        }
    }

    /// Whether applying this command to `state` would change nothing.
    /// Used to drop gesture commands whose final value equals the value at
    /// gesture start.
    pub fn is_noop_on(&self, state: &EditState) -> bool {
        match self {
            Command::SetBrightness(v) => *v == state.brightness(),
            Command::SetContrast(v) => *v == state.contrast(),
            Command::SetSaturation(v) => *v == state.saturation(),
            Command::SetBw(v) => *v == state.bw(),
            Command::SetDither(v) => *v == state.dither(),
            Command::SetRotation(deg) => *deg == state.rot(),
            Command::SetFlipX(v) => *v == state.flip_x(),
            Command::SetFlipY(v) => *v == state.flip_y(),
            Command::SetViewport { scale, tx, ty } => {
                *scale == state.scale() && *tx == state.tx() && *ty == state.ty()
            }
            // Target and background changes are never gesture-batched
            Command::ChangeTarget(_) => false,
            Command::SetBackgroundMode(mode) => *mode == state.background_mode(),
            Command::SetBackgroundColor(color) => color == state.background_color(),
            Command::SetBackgroundBlur(v) => *v == state.background_blur(),
        }
    }

    /// True for target changes, which are excluded from committed global
    /// blocks.
    pub fn is_target_change(&self) -> bool {
        matches!(self, Command::ChangeTarget(_))
    }
}

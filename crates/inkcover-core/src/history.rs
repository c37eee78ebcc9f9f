//! Two-tier command history.
//!
//! All user-facing mutations go through this engine's wrapper methods. While
//! a panel is open (Local mode) every effective change is recorded into the
//! panel's command log, which supports pointer-based undo/redo by full replay
//! from the panel baseline. Committing a panel collapses its log into one
//! atomic [`Block`] on the session-global stack; global undo/redo moves whole
//! blocks and replays the entire session from the initial snapshot.
//!
//! Replay is always a full recompute (baseline + command prefix), never
//! incremental inverse operations: several commands (`ChangeTarget` in
//! particular) are not cleanly invertible, and full replay makes determinism
//! trivial to reason about.

use std::mem::discriminant;

use log::{debug, trace};

use crate::catalog::TargetSelection;
use crate::command::Command;
use crate::geometry::Geometry;
use crate::state::{BackgroundMode, EditState};

/// Sliding retention window: local undo stops this many steps back.
const UNDO_RETENTION: usize = 10;

/// One committed panel's worth of edits, applied atomically.
pub type Block = Vec<Command>;

/// Which panel is open in Local mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelScope {
    /// Transform panel: zoom/pan/rotation/flips and target selection.
    Tools,
    /// Color panel: brightness/contrast/saturation/bw/dither.
    Adjustments,
}

/// Panel-scoped editing session state.
#[derive(Debug, Clone)]
struct LocalSession {
    scope: PanelScope,
    commands: Vec<Command>,
    /// Replay prefix length; undo/redo move this within the retention window.
    pointer: usize,
    baseline: EditState,
    /// Captured only for Tools panels, which can change the target.
    baseline_target: Option<TargetSelection>,
}

impl LocalSession {
    fn undo_floor(&self) -> usize {
        self.commands.len().saturating_sub(UNDO_RETENTION)
    }
}

/// A slider/gesture coalescing window. Intermediate values hit the state
/// live for responsive preview; only the final value per command kind is
/// recorded when the window closes.
#[derive(Debug, Clone)]
struct GestureWindow {
    baseline: EditState,
    pending: Vec<Command>,
}

/// The history engine. Owns the live [`EditState`] and active target.
#[derive(Debug)]
pub struct HistoryEngine {
    state: EditState,
    target: TargetSelection,
    initial_state: EditState,
    global_stack: Vec<Block>,
    global_redo: Vec<Block>,
    local: Option<LocalSession>,
    gesture: Option<GestureWindow>,
    revision: u64,
}

impl HistoryEngine {
    /// Start a session: captures the initial snapshot, empty stacks, Global
    /// mode.
    pub fn new(state: EditState, target: TargetSelection) -> Self {
        Self {
            initial_state: state.clone(),
            state,
            target,
            global_stack: Vec::new(),
            global_redo: Vec::new(),
            local: None,
            gesture: None,
            revision: 0,
        }
    }

    // ===== Accessors =====

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn target(&self) -> &TargetSelection {
        &self.target
    }

    /// The open panel scope, or `None` in Global mode.
    pub fn scope(&self) -> Option<PanelScope> {
        self.local.as_ref().map(|l| l.scope)
    }

    /// Monotonic change counter. Bumps on every effective mutation and
    /// every replay; renderers poll it to detect superseded work.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        match &self.local {
            Some(local) => local.pointer > local.undo_floor(),
            None => !self.global_stack.is_empty(),
        }
    }

    pub fn can_redo(&self) -> bool {
        match &self.local {
            Some(local) => local.pointer < local.commands.len(),
            None => !self.global_redo.is_empty(),
        }
    }

    pub fn global_undo_depth(&self) -> usize {
        self.global_stack.len()
    }

    pub fn global_redo_depth(&self) -> usize {
        self.global_redo.len()
    }

    // ===== Wrapper mutators =====
    //
    // Each applies the clamping setter and records a command carrying the
    // clamped value iff the stored value changed.

    pub fn set_brightness(&mut self, value: f32) {
        if self.state.set_brightness(value) {
            self.on_mutation(Command::SetBrightness(self.state.brightness()));
        }
    }

    pub fn set_contrast(&mut self, value: f32) {
        if self.state.set_contrast(value) {
            self.on_mutation(Command::SetContrast(self.state.contrast()));
        }
    }

    pub fn set_saturation(&mut self, value: f32) {
        if self.state.set_saturation(value) {
            self.on_mutation(Command::SetSaturation(self.state.saturation()));
        }
    }

    pub fn set_bw(&mut self, bw: bool) {
        if self.state.set_bw(bw) {
            self.on_mutation(Command::SetBw(bw));
        }
    }

    pub fn set_dither(&mut self, dither: bool) {
        if self.state.set_dither(dither) {
            self.on_mutation(Command::SetDither(self.state.dither()));
        }
    }

    pub fn set_rotation(&mut self, degrees: i32) {
        if self.state.set_rotation(degrees) {
            self.on_mutation(Command::SetRotation(self.state.rot()));
        }
    }

    pub fn set_flip_x(&mut self, flip: bool) {
        if self.state.set_flip_x(flip) {
            self.on_mutation(Command::SetFlipX(flip));
        }
    }

    pub fn set_flip_y(&mut self, flip: bool) {
        if self.state.set_flip_y(flip) {
            self.on_mutation(Command::SetFlipY(flip));
        }
    }

    pub fn set_viewport(&mut self, scale: f32, tx: f32, ty: f32) {
        if self.state.set_viewport(scale, tx, ty) {
            self.on_mutation(Command::SetViewport {
                scale: self.state.scale(),
                tx: self.state.tx(),
                ty: self.state.ty(),
            });
        }
    }

    pub fn set_background_mode(&mut self, mode: BackgroundMode) {
        if self.state.set_background_mode(mode) {
            self.on_mutation(Command::SetBackgroundMode(mode));
        }
    }

    pub fn set_background_color(&mut self, color: &str) {
        if self.state.set_background_color(color) {
            self.on_mutation(Command::SetBackgroundColor(color.to_string()));
        }
    }

    pub fn set_background_blur(&mut self, blur: f32) {
        if self.state.set_background_blur(blur) {
            self.on_mutation(Command::SetBackgroundBlur(self.state.background_blur()));
        }
    }

    /// Switch the active target. Resets the viewport to cover-fit defaults
    /// and, inside a Tools panel, records a `ChangeTarget` command carrying
    /// the full snapshot.
    pub fn change_target(&mut self, selection: TargetSelection) -> bool {
        if selection == self.target {
            return false;
        }
        self.target = selection.clone();
        // Direct state write: the viewport reset replays as part of
        // ChangeTarget::apply, not as a separate SetViewport command.
        self.state.set_viewport(1.0, 0.0, 0.0);
        self.revision += 1;
        if matches!(&self.local, Some(l) if l.scope == PanelScope::Tools) {
            self.record_local(Command::ChangeTarget(selection));
        }
        true
    }

    /// Record the viewport frame size. Frame resizes are layout, not user
    /// edits; never recorded.
    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        if self.state.set_frame_size(width, height) {
            self.revision += 1;
        }
    }

    /// Run the geometry constrain step on the live pan. Not recorded; pan
    /// clamping is a render-consistency step, not a user edit.
    pub fn constrain_pan(&mut self, geometry: &Geometry) -> bool {
        let changed = geometry.clamp_translation(&mut self.state);
        if changed {
            self.revision += 1;
        }
        changed
    }

    // ===== Panel lifecycle =====

    /// Open a panel. Legal from Global mode; re-entering the already-open
    /// scope is a no-op. Returns false when a different panel is open (the
    /// caller must apply or discard it first).
    pub fn enter_panel(&mut self, scope: PanelScope) -> bool {
        match &self.local {
            Some(local) if local.scope == scope => true,
            Some(_) => false,
            None => {
                self.local = Some(LocalSession {
                    scope,
                    commands: Vec::new(),
                    pointer: 0,
                    baseline: self.state.clone(),
                    baseline_target: (scope == PanelScope::Tools)
                        .then(|| self.target.clone()),
                });
                true
            }
        }
    }

    /// Scope-specific structural comparison between the panel baseline and
    /// the current state. Sub-step slider jitter does not count as dirty.
    pub fn is_dirty(&self) -> bool {
        let Some(local) = &self.local else {
            return false;
        };
        let (now, base) = (&self.state, &local.baseline);
        match local.scope {
            PanelScope::Adjustments => {
                round2(now.brightness()) != round2(base.brightness())
                    || round2(now.contrast()) != round2(base.contrast())
                    || round2(now.saturation()) != round2(base.saturation())
                    || now.bw() != base.bw()
                    || now.dither() != base.dither()
            }
            PanelScope::Tools => {
                round3(now.scale()) != round3(base.scale())
                    || round3(now.tx()) != round3(base.tx())
                    || round3(now.ty()) != round3(base.ty())
                    || now.rot() != base.rot()
                    || now.flip_x() != base.flip_x()
                    || now.flip_y() != base.flip_y()
                    || local.baseline_target.as_ref() != Some(&self.target)
            }
        }
    }

    /// Commit the open panel as one atomic global block. No-op unless dirty.
    /// Target changes are excluded from the committed block.
    pub fn apply_panel(&mut self) {
        self.flush_gesture();
        if !self.is_dirty() {
            return;
        }
        let Some(local) = self.local.take() else {
            return;
        };
        let block: Block = local.commands[..local.pointer]
            .iter()
            .filter(|cmd| !cmd.is_target_change())
            .cloned()
            .collect();
        if !block.is_empty() {
            debug!("committing panel block with {} commands", block.len());
            self.global_stack.push(block);
            self.global_redo.clear();
        }
    }

    /// Abandon the open panel: restore the baseline snapshots verbatim.
    /// The global stack is untouched.
    pub fn discard_panel(&mut self) {
        // Pending gesture values are discarded with everything else
        self.gesture = None;
        let Some(local) = self.local.take() else {
            return;
        };
        self.state = local.baseline;
        if let Some(target) = local.baseline_target {
            self.target = target;
        }
        self.revision += 1;
    }

    // ===== Gesture coalescing =====

    /// Open a coalescing window for a slider drag or pointer gesture.
    pub fn begin_gesture(&mut self) {
        if self.gesture.is_none() {
            self.gesture = Some(GestureWindow {
                baseline: self.state.clone(),
                pending: Vec::new(),
            });
        }
    }

    /// Close the window, recording each touched command kind once with its
    /// final value (dropped when the value returned to where it started).
    pub fn end_gesture(&mut self) {
        self.flush_gesture();
    }

    fn flush_gesture(&mut self) {
        let Some(window) = self.gesture.take() else {
            return;
        };
        for cmd in window.pending {
            if !cmd.is_noop_on(&window.baseline) {
                self.record_local(cmd);
            }
        }
    }

    // ===== Undo / redo =====

    /// Undo one step: a command while a panel is open, a whole block
    /// otherwise.
    pub fn undo(&mut self) {
        if self.local.is_some() {
            self.local_undo();
        } else {
            self.global_undo();
        }
    }

    /// Redo one step, mirroring [`HistoryEngine::undo`].
    pub fn redo(&mut self) {
        if self.local.is_some() {
            self.local_redo();
        } else {
            self.global_redo();
        }
    }

    fn local_undo(&mut self) {
        let Some(local) = &mut self.local else {
            return;
        };
        if local.pointer == 0 || local.pointer <= local.undo_floor() {
            return;
        }
        local.pointer -= 1;
        self.recompose_local();
    }

    fn local_redo(&mut self) {
        let Some(local) = &mut self.local else {
            return;
        };
        if local.pointer >= local.commands.len() {
            return;
        }
        local.pointer += 1;
        self.recompose_local();
    }

    fn global_undo(&mut self) {
        let Some(block) = self.global_stack.pop() else {
            return;
        };
        self.global_redo.push(block);
        self.replay_global();
    }

    fn global_redo(&mut self) {
        let Some(block) = self.global_redo.pop() else {
            return;
        };
        self.global_stack.push(block);
        self.replay_global();
    }

    /// Restore the session initial snapshot and drop all history.
    /// The target selection stays; target changes never enter global
    /// history.
    pub fn reset_session(&mut self) {
        self.state = self.initial_state.clone();
        self.global_stack.clear();
        self.global_redo.clear();
        self.local = None;
        self.gesture = None;
        self.revision += 1;
    }

    // ===== Internals =====

    fn on_mutation(&mut self, cmd: Command) {
        self.revision += 1;
        if let Some(window) = &mut self.gesture {
            // Keep only the latest value per command kind within the window
            let kind = discriminant(&cmd);
            if let Some(slot) = window
                .pending
                .iter_mut()
                .find(|pending| discriminant(*pending) == kind)
            {
                *slot = cmd;
            } else {
                window.pending.push(cmd);
            }
            return;
        }
        self.record_local(cmd);
    }

    fn record_local(&mut self, cmd: Command) {
        let Some(local) = &mut self.local else {
            // Global mode: the mutation bypasses history entirely
            return;
        };
        trace!("recording {:?}", cmd);
        // New edits after an undo discard the old redo branch
        local.commands.truncate(local.pointer);
        local.commands.push(cmd);
        local.pointer = local.commands.len();
    }

    /// Rebuild the state from the panel baseline plus the command prefix.
    /// Replay goes through `Command::apply` directly, so nothing here is
    /// re-recorded.
    fn recompose_local(&mut self) {
        let Some(local) = &self.local else {
            return;
        };
        let baseline = local.baseline.clone();
        let baseline_target = local.baseline_target.clone();
        let prefix: Vec<Command> = local.commands[..local.pointer].to_vec();

        self.state = baseline;
        if let Some(target) = baseline_target {
            self.target = target;
        }
        for cmd in &prefix {
            cmd.apply(&mut self.state, &mut self.target);
        }
        self.revision += 1;
    }

    /// Rebuild the state from the session initial snapshot plus every
    /// remaining global block, in order.
    fn replay_global(&mut self) {
        debug!(
            "global replay over {} blocks",
            self.global_stack.len()
        );
        self.state = self.initial_state.clone();
        let Self {
            state,
            target,
            global_stack,
            ..
        } = self;
        for cmd in global_stack.iter().flatten() {
            cmd.apply(state, target);
        }
        self.revision += 1;
    }
}

#[inline]
fn round2(v: f32) -> f32 {
    (v * 100.0).round() / 100.0
}

#[inline]
fn round3(v: f32) -> f32 {
    (v * 1000.0).round() / 1000.0
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::catalog::OutputMode;
    use proptest::prelude::*;

    fn selection(id: &str) -> TargetSelection {
        TargetSelection {
            group_id: "grp".to_string(),
            model_id: id.to_string(),
            width: 600,
            height: 800,
            output: OutputMode::Target,
        }
    }

    /// Strategy over panel-recordable edits.
    fn edit_strategy() -> impl Strategy<Value = Command> {
        prop_oneof![
            (0.4f32..=1.6).prop_map(Command::SetBrightness),
            (0.4f32..=2.0).prop_map(Command::SetContrast),
            (-0.5f32..=2.5).prop_map(Command::SetSaturation),
            any::<bool>().prop_map(Command::SetBw),
            any::<bool>().prop_map(Command::SetDither),
            (-720i32..=720).prop_map(|d| Command::SetRotation(
                crate::state::quantize_rotation(d)
            )),
            any::<bool>().prop_map(Command::SetFlipX),
            any::<bool>().prop_map(Command::SetFlipY),
            (0.5f32..=7.0, -500.0f32..=500.0, -500.0f32..=500.0)
                .prop_map(|(scale, tx, ty)| Command::SetViewport { scale, tx, ty }),
        ]
    }

    proptest! {
        /// Property: replaying baseline + prefix twice yields identical state.
        #[test]
        fn prop_replay_deterministic(commands in prop::collection::vec(edit_strategy(), 0..32)) {
            let run = || {
                let mut state = EditState::new();
                let mut target = selection("m1");
                for cmd in &commands {
                    cmd.apply(&mut state, &mut target);
                }
                (state, target)
            };
            prop_assert_eq!(run(), run());
        }

        /// Property: undo(); redo() restores the exact pre-undo state.
        #[test]
        fn prop_local_undo_redo_round_trip(
            commands in prop::collection::vec(edit_strategy(), 1..16),
        ) {
            let mut eng = HistoryEngine::new(EditState::new(), selection("m1"));
            eng.enter_panel(PanelScope::Adjustments);
            for cmd in &commands {
                match cmd {
                    Command::SetBrightness(v) => eng.set_brightness(*v),
                    Command::SetContrast(v) => eng.set_contrast(*v),
                    Command::SetSaturation(v) => eng.set_saturation(*v),
                    Command::SetBw(v) => eng.set_bw(*v),
                    Command::SetDither(v) => eng.set_dither(*v),
                    Command::SetRotation(d) => eng.set_rotation(i32::from(*d)),
                    Command::SetFlipX(v) => eng.set_flip_x(*v),
                    Command::SetFlipY(v) => eng.set_flip_y(*v),
                    Command::SetViewport { scale, tx, ty } => {
                        eng.set_viewport(*scale, *tx, *ty)
                    }
                    _ => {}
                }
            }

            let before = eng.state().clone();
            if eng.can_undo() {
                eng.undo();
                eng.redo();
                prop_assert_eq!(eng.state(), &before);
            }
        }

        /// Property: dither never reads true while bw is false, no matter the
        /// command order.
        #[test]
        fn prop_dither_implies_bw(commands in prop::collection::vec(edit_strategy(), 0..32)) {
            let mut state = EditState::new();
            let mut target = selection("m1");
            for cmd in &commands {
                cmd.apply(&mut state, &mut target);
                prop_assert!(!state.dither() || state.bw());
            }
        }
    }
}

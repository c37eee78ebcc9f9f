//! Editing session orchestration.
//!
//! [`EditSession`] is the thin shell around the core: it owns the
//! lazily-decoded source photo, the history engine (which owns the live
//! state and active target), and the catalog. All mutation is synchronous on
//! the caller's thread; rendering is the only operation worth offloading,
//! and a newer request supersedes an in-flight one via the revision counter
//! (see [`EditSession::revision`]).

use std::sync::Arc;

use log::debug;

use crate::bitmap::{Bitmap, DecodeError, SourceImage};
use crate::catalog::TargetCatalog;
use crate::encode::EncodedImage;
use crate::geometry::Geometry;
use crate::history::HistoryEngine;
use crate::render::{compose, export_crop, RenderError, RenderOptions};
use crate::state::EditState;

/// One photo-editing session: a source photo, its edit state and history,
/// and the active export target.
#[derive(Debug)]
pub struct EditSession {
    source: SourceImage,
    engine: HistoryEngine,
    catalog: TargetCatalog,
}

impl EditSession {
    /// Start a session over encoded image bytes. The decode is deferred to
    /// the first render and memoized for the session's lifetime.
    ///
    /// Returns `None` when the catalog has no selectable target.
    pub fn new(bytes: Vec<u8>, catalog: TargetCatalog) -> Option<Self> {
        let target = catalog.first_selection()?;
        Some(Self {
            source: SourceImage::from_bytes(bytes),
            engine: HistoryEngine::new(EditState::new(), target),
            catalog,
        })
    }

    /// Start a session over an already-decoded bitmap.
    pub fn with_bitmap(bitmap: Arc<Bitmap>, catalog: TargetCatalog) -> Option<Self> {
        let target = catalog.first_selection()?;
        Some(Self {
            source: SourceImage::from_bitmap(bitmap),
            engine: HistoryEngine::new(EditState::new(), target),
            catalog,
        })
    }

    /// The history engine: all state mutation and undo/redo goes through
    /// here.
    pub fn engine(&self) -> &HistoryEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut HistoryEngine {
        &mut self.engine
    }

    pub fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    /// Monotonic change counter; a render started at revision `r` is
    /// superseded once `revision() != r`. Callers offloading renders
    /// snapshot it before the render and discard stale results.
    pub fn revision(&self) -> u64 {
        self.engine.revision()
    }

    /// Resolve the decoded source, running the decode on first call.
    pub fn bitmap(&mut self) -> Result<Arc<Bitmap>, DecodeError> {
        self.source.resolve()
    }

    /// Record the viewport frame size and re-clamp the pan against the new
    /// geometry (when the source is already decoded).
    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        self.engine.set_frame_size(width, height);
        self.constrain();
    }

    /// The geometry constrain step: clamp the pan against the current
    /// (scale, rotation, frame, natural) tuple. A no-op until the source is
    /// decoded or while the frame is unsized; renderers clamp on their own
    /// as well, so exported geometry never depends on this being called.
    pub fn constrain(&mut self) -> bool {
        let Some((natural_w, natural_h)) = self.source.natural_size() else {
            return false;
        };
        let state = self.engine.state();
        let Some(geom) = Geometry::new(
            natural_w,
            natural_h,
            state.frame_width(),
            state.frame_height(),
            state.rot(),
        ) else {
            return false;
        };
        self.engine.constrain_pan(&geom)
    }

    /// Switch the active target by catalog lookup. Returns false for an
    /// unknown (group, model) pair.
    pub fn select_target(&mut self, group_id: &str, model_id: &str) -> bool {
        let Some(selection) = self.catalog.selection(group_id, model_id) else {
            return false;
        };
        debug!("target -> {}/{}", group_id, model_id);
        self.engine.change_target(selection)
    }

    /// Render a downsampled compositor preview.
    ///
    /// `Ok(None)` while geometry is unavailable (frame not laid out yet).
    pub fn preview(&mut self, preview_scale: f32) -> Result<Option<EncodedImage>, RenderError> {
        self.render_composite(&RenderOptions::preview(preview_scale))
    }

    /// Export through the matte compositor at the full target resolution.
    pub fn export(&mut self) -> Result<Option<EncodedImage>, RenderError> {
        self.render_composite(&RenderOptions::export())
    }

    /// Export through the crop pipeline (no backdrop, straight crop; output
    /// sizing follows the target's `OutputMode`).
    pub fn export_cropped(&mut self) -> Result<Option<EncodedImage>, RenderError> {
        let bitmap = self.bitmap()?;
        let target = self.engine.target().clone();
        export_crop(
            &bitmap,
            self.engine.state(),
            &target,
            &RenderOptions::export(),
        )
    }

    fn render_composite(
        &mut self,
        opts: &RenderOptions,
    ) -> Result<Option<EncodedImage>, RenderError> {
        let bitmap = self.bitmap()?;
        let target = self.engine.target();
        let (target_w, target_h) = (target.width, target.height);
        compose(&bitmap, self.engine.state(), target_w, target_h, opts)
    }
}

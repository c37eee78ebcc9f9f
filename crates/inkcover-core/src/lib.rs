//! Inkcover Core - Cover composition and export engine
//!
//! This crate positions, rotates, flips, color-adjusts and optionally mattes
//! a photo into a fixed-aspect e-reader cover frame, then exports a
//! pixel-exact raster at the target resolution. Editing is organized into
//! short-lived panel sessions with two-tier undo/redo: a panel-local command
//! log, committed atomically as blocks onto a session-global stack.
//!
//! # Architecture
//!
//! - [`state`]: the editable transform/adjustment/matte parameters
//! - [`geometry`]: cover-fit scale and pan clamping for quantized rotation
//! - [`history`]: command recording, gesture coalescing, local and global
//!   undo/redo by full replay
//! - [`render`]: the compositor and crop-exporter pipelines over one shared
//!   color/dither kernel
//! - [`catalog`]: device target resolution lookup
//! - [`session`]: thin orchestration tying a photo to its state, history and
//!   target
//!
//! The host application owns everything around this core: UI, file pickers,
//! packaging and sharing of the exported raster.

pub mod bitmap;
pub mod catalog;
pub mod command;
pub mod encode;
pub mod geometry;
pub mod history;
pub mod render;
pub mod session;
pub mod state;

pub use bitmap::{decode_image, Bitmap, DecodeError, SourceImage};
pub use catalog::{OutputMode, TargetCatalog, TargetGroup, TargetModel, TargetSelection};
pub use command::Command;
pub use encode::{EncodedImage, EncodeError, ImageMime, DEFAULT_JPEG_QUALITY};
pub use geometry::Geometry;
pub use history::{Block, HistoryEngine, PanelScope};
pub use render::{
    apply_color_pass, compose, compose_pixels, export_crop, export_crop_pixels, RenderError,
    RenderOptions,
};
pub use session::EditSession;
pub use state::{BackgroundMode, EditState};

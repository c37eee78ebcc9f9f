//! Device target catalog.
//!
//! A target is one e-reader model's cover resolution. Targets are grouped by
//! device family and provided as plain data (typically deserialized from the
//! host's bundled JSON); this core only resolves lookups and snapshots the
//! active selection.

use serde::{Deserialize, Serialize};

/// How the crop exporter sizes its output for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// Resample the crop to the target's fixed width x height.
    #[default]
    Target,
    /// Keep the crop's own pixel size (aspect-ratio-only targets that must
    /// not resample).
    Source,
}

/// One concrete device model entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetModel {
    pub id: String,
    /// Cover width in pixels.
    pub width: u32,
    /// Cover height in pixels.
    pub height: u32,
    /// Export sizing behavior; part of the target descriptor, not a renderer
    /// option.
    #[serde(default)]
    pub output: OutputMode,
}

/// A device family grouping several models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroup {
    pub id: String,
    pub models: Vec<TargetModel>,
}

/// The full catalog of selectable targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCatalog {
    pub groups: Vec<TargetGroup>,
}

impl TargetCatalog {
    pub fn new(groups: Vec<TargetGroup>) -> Self {
        Self { groups }
    }

    /// Look up a model by group and model id.
    pub fn resolve(&self, group_id: &str, model_id: &str) -> Option<&TargetModel> {
        self.groups
            .iter()
            .find(|g| g.id == group_id)?
            .models
            .iter()
            .find(|m| m.id == model_id)
    }

    /// Build a full selection snapshot for a (group, model) pair.
    ///
    /// The snapshot carries the resolved dimensions so a later restore is
    /// exact even if the catalog itself is mutated.
    pub fn selection(&self, group_id: &str, model_id: &str) -> Option<TargetSelection> {
        let model = self.resolve(group_id, model_id)?;
        Some(TargetSelection {
            group_id: group_id.to_string(),
            model_id: model_id.to_string(),
            width: model.width,
            height: model.height,
            output: model.output,
        })
    }

    /// The first model in catalog order, as a default selection.
    pub fn first_selection(&self) -> Option<TargetSelection> {
        let group = self.groups.first()?;
        let model = group.models.first()?;
        self.selection(&group.id, &model.id)
    }
}

/// The active target, snapshotted by value.
///
/// Carried inside `ChangeTarget` commands so replay does not depend on the
/// catalog still containing the entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSelection {
    pub group_id: String,
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub output: OutputMode,
}

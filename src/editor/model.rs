use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::effects::{EffectStack, GradientArea, PreviewDimensions};
use crate::assets::AssetKind;
use crate::geometry::{AssetBounds, CanvasPoint, CanvasSize};

static NEXT_PLACEMENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Identity of a placed asset: source id, placement time and a process-wide sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn generate(source_id: &str) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis())
            .unwrap_or_default();
        let seq = NEXT_PLACEMENT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("{source_id}-{millis}-{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AssetId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a placed asset came from in the asset picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub id: String,
    pub kind: AssetKind,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedAsset {
    pub id: AssetId,
    pub source: SourceRef,
    pub bitmap_url: String,
    pub bounds: AssetBounds,
    pub selected: bool,
    #[serde(default)]
    pub effects: Option<EffectStack>,
}

/// In-progress gradient-area drag inside the preview viewport of one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientAreaSelection {
    pub asset_id: AssetId,
    pub preview: PreviewDimensions,
    pub anchor: CanvasPoint,
    pub current: CanvasPoint,
}

impl GradientAreaSelection {
    pub fn area(&self) -> GradientArea {
        GradientArea {
            start_x: self.anchor.x.min(self.current.x),
            start_y: self.anchor.y.min(self.current.y),
            end_x: self.anchor.x.max(self.current.x),
            end_y: self.anchor.y.max(self.current.y),
        }
    }

    fn clamp_point(&self, point: CanvasPoint) -> CanvasPoint {
        CanvasPoint::new(
            point.x.clamp(0.0, self.preview.width.max(0.0)),
            point.y.clamp(0.0, self.preview.height.max(0.0)),
        )
    }
}

/// Ordered list of placed assets. Array order is z-order, last entry on top.
#[derive(Debug, Clone)]
pub struct SceneModel {
    canvas: CanvasSize,
    assets: Vec<PlacedAsset>,
    revision: u64,
    gradient_selection: Option<GradientAreaSelection>,
}

impl SceneModel {
    pub fn new(canvas: CanvasSize) -> Self {
        Self {
            canvas,
            assets: Vec::new(),
            revision: 0,
            gradient_selection: None,
        }
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn assets(&self) -> &[PlacedAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Bumped by every mutation that changes the asset list.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> Vec<PlacedAsset> {
        self.assets.clone()
    }

    pub fn get(&self, id: &AssetId) -> Option<&PlacedAsset> {
        self.assets.iter().find(|asset| &asset.id == id)
    }

    fn get_mut(&mut self, id: &AssetId) -> Option<&mut PlacedAsset> {
        self.assets.iter_mut().find(|asset| &asset.id == id)
    }

    pub fn selected(&self) -> Option<&PlacedAsset> {
        self.assets.iter().find(|asset| asset.selected)
    }

    pub fn selected_id(&self) -> Option<AssetId> {
        self.selected().map(|asset| asset.id.clone())
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn append(&mut self, mut asset: PlacedAsset) {
        asset.bounds = self.clamp_bounds(asset.bounds);
        if asset.selected {
            self.deselect_all();
        }
        if let Some(effects) = asset.effects.as_mut() {
            effects.clamp_ranges();
        }
        self.assets.push(asset);
        self.touch();
    }

    /// Moves/resizes an asset, clamped into the canvas. Returns the stored bounds.
    pub fn update_geometry(&mut self, id: &AssetId, bounds: AssetBounds) -> Option<AssetBounds> {
        let clamped = self.clamp_bounds(bounds);
        let asset = self.get_mut(id)?;
        if asset.bounds != clamped {
            asset.bounds = clamped;
            self.touch();
        }
        Some(clamped)
    }

    pub fn update_effects(&mut self, id: &AssetId, effects: Option<EffectStack>) -> bool {
        let effects = effects.map(|mut stack| {
            stack.clamp_ranges();
            stack
        });
        let Some(asset) = self.get_mut(id) else {
            return false;
        };
        if asset.effects != effects {
            asset.effects = effects;
            self.touch();
        }
        true
    }

    /// Selects `id` after deselecting every other asset.
    pub fn set_selected(&mut self, id: &AssetId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if self.selected().is_some_and(|asset| &asset.id == id) {
            return true;
        }
        self.deselect_all();
        if let Some(asset) = self.get_mut(id) {
            asset.selected = true;
        }
        self.touch();
        true
    }

    /// Returns whether anything was selected.
    pub fn clear_selection(&mut self) -> bool {
        if self.selected().is_none() {
            return false;
        }
        self.deselect_all();
        self.touch();
        true
    }

    fn deselect_all(&mut self) {
        for asset in &mut self.assets {
            asset.selected = false;
        }
    }

    pub fn remove(&mut self, id: &AssetId) -> Option<PlacedAsset> {
        let index = self.assets.iter().position(|asset| &asset.id == id)?;
        let removed = self.assets.remove(index);
        if self
            .gradient_selection
            .as_ref()
            .is_some_and(|selection| &selection.asset_id == id)
        {
            self.gradient_selection = None;
        }
        self.touch();
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.assets.clear();
        self.gradient_selection = None;
        self.touch();
    }

    /// Swaps in a snapshot. At most the first selected asset stays selected.
    pub fn replace(&mut self, mut snapshot: Vec<PlacedAsset>) {
        let mut seen_selected = false;
        for asset in &mut snapshot {
            asset.bounds = self.clamp_bounds(asset.bounds);
            if asset.selected {
                asset.selected = !seen_selected;
                seen_selected = true;
            }
        }
        self.assets = snapshot;
        if let Some(selection) = &self.gradient_selection {
            if self.get(&selection.asset_id).is_none() {
                self.gradient_selection = None;
            }
        }
        self.touch();
    }

    /// Resizes the canvas and re-clamps every asset into it.
    pub fn set_canvas_size(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
        let assets = std::mem::take(&mut self.assets);
        self.replace(assets);
    }

    fn clamp_bounds(&self, bounds: AssetBounds) -> AssetBounds {
        let width = if bounds.width.is_finite() && bounds.width > 0.0 {
            bounds.width
        } else {
            1.0
        };
        let height = if bounds.height.is_finite() && bounds.height > 0.0 {
            bounds.height
        } else {
            1.0
        };
        let x = if bounds.x.is_finite() { bounds.x } else { 0.0 };
        let y = if bounds.y.is_finite() { bounds.y } else { 0.0 };
        AssetBounds::new(x, y, width, height).clamped_into(self.canvas)
    }

    pub fn gradient_selection(&self) -> Option<&GradientAreaSelection> {
        self.gradient_selection.as_ref()
    }

    pub fn begin_gradient_area(
        &mut self,
        asset_id: &AssetId,
        preview: PreviewDimensions,
        at: CanvasPoint,
    ) -> bool {
        if self.get(asset_id).is_none() {
            return false;
        }
        let mut selection = GradientAreaSelection {
            asset_id: asset_id.clone(),
            preview,
            anchor: at,
            current: at,
        };
        selection.anchor = selection.clamp_point(at);
        selection.current = selection.anchor;
        self.gradient_selection = Some(selection);
        true
    }

    pub fn update_gradient_area(&mut self, at: CanvasPoint) -> Option<GradientArea> {
        let selection = self.gradient_selection.as_mut()?;
        selection.current = selection.clamp_point(at);
        Some(selection.area())
    }

    /// Closes the open selection and returns the finished rectangle with its preview size.
    pub fn commit_gradient_area(&mut self) -> Option<(AssetId, GradientArea, PreviewDimensions)> {
        let selection = self.gradient_selection.take()?;
        let area = selection.area();
        if area.end_x - area.start_x <= 0.0 || area.end_y - area.start_y <= 0.0 {
            return None;
        }
        Some((selection.asset_id, area, selection.preview))
    }

    pub fn cancel_gradient_area(&mut self) -> bool {
        self.gradient_selection.take().is_some()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub(crate) fn asset(id: &str, bounds: AssetBounds) -> PlacedAsset {
        PlacedAsset {
            id: AssetId::from(id),
            source: SourceRef {
                id: id.to_string(),
                kind: AssetKind::AiImage,
                data: serde_json::Value::Null,
            },
            bitmap_url: format!("mem://{id}"),
            bounds,
            selected: false,
            effects: None,
        }
    }
}

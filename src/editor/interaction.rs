use super::model::{AssetId, PlacedAsset, SceneModel};
use crate::geometry::{AssetBounds, CanvasPoint, CanvasSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    pub const ALL: [Self; 4] = [
        Self::TopLeft,
        Self::TopRight,
        Self::BottomLeft,
        Self::BottomRight,
    ];

    pub const fn opposite(self) -> Self {
        match self {
            Self::TopLeft => Self::BottomRight,
            Self::TopRight => Self::BottomLeft,
            Self::BottomLeft => Self::TopRight,
            Self::BottomRight => Self::TopLeft,
        }
    }

    pub const fn cursor(self) -> CanvasCursor {
        match self {
            Self::TopLeft | Self::BottomRight => CanvasCursor::NwseResize,
            Self::TopRight | Self::BottomLeft => CanvasCursor::NeswResize,
        }
    }

    /// Combined displacement along the handle's outward diagonal.
    fn signed_displacement(self, dx: f64, dy: f64) -> f64 {
        match self {
            Self::BottomRight => dx + dy,
            Self::TopLeft => -dx - dy,
            Self::TopRight => dx - dy,
            Self::BottomLeft => -dx + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasCursor {
    #[default]
    Default,
    Move,
    NwseResize,
    NeswResize,
}

impl CanvasCursor {
    pub const fn css_name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Move => "move",
            Self::NwseResize => "nwse-resize",
            Self::NeswResize => "nesw-resize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Handle { asset_id: AssetId, handle: ResizeHandle },
    Body(AssetId),
    Empty,
}

pub fn corner_points(bounds: AssetBounds) -> [(ResizeHandle, CanvasPoint); 4] {
    [
        (ResizeHandle::TopLeft, CanvasPoint::new(bounds.x, bounds.y)),
        (
            ResizeHandle::TopRight,
            CanvasPoint::new(bounds.right(), bounds.y),
        ),
        (
            ResizeHandle::BottomLeft,
            CanvasPoint::new(bounds.x, bounds.bottom()),
        ),
        (
            ResizeHandle::BottomRight,
            CanvasPoint::new(bounds.right(), bounds.bottom()),
        ),
    ]
}

/// Handle whose `handle_size` square, centered on the corner, contains `point`.
pub fn handle_at_point(
    bounds: AssetBounds,
    point: CanvasPoint,
    handle_size: f64,
) -> Option<ResizeHandle> {
    let half = handle_size / 2.0;
    corner_points(bounds)
        .into_iter()
        .find(|(_, corner)| {
            (point.x - corner.x).abs() <= half && (point.y - corner.y).abs() <= half
        })
        .map(|(handle, _)| handle)
}

pub fn assets_in_hit_test_order(assets: &[PlacedAsset]) -> impl Iterator<Item = &PlacedAsset> {
    assets.iter().rev()
}

/// Handles of the selected asset win over any body; bodies are tested topmost first.
pub fn hit_test(assets: &[PlacedAsset], point: CanvasPoint, handle_size: f64) -> HitTarget {
    if let Some(selected) = assets.iter().find(|asset| asset.selected) {
        if let Some(handle) = handle_at_point(selected.bounds, point, handle_size) {
            return HitTarget::Handle {
                asset_id: selected.id.clone(),
                handle,
            };
        }
    }
    assets_in_hit_test_order(assets)
        .find(|asset| asset.bounds.contains(point))
        .map_or(HitTarget::Empty, |asset| HitTarget::Body(asset.id.clone()))
}

pub fn cursor_for_target(target: &HitTarget) -> CanvasCursor {
    match target {
        HitTarget::Handle { handle, .. } => handle.cursor(),
        HitTarget::Body(_) => CanvasCursor::Move,
        HitTarget::Empty => CanvasCursor::Default,
    }
}

/// New origin for a drag, kept inside `0..=canvas - size` on both axes.
pub fn dragged_bounds(
    bounds: AssetBounds,
    pointer: CanvasPoint,
    offset: CanvasPoint,
    canvas: CanvasSize,
) -> AssetBounds {
    AssetBounds {
        x: pointer.x - offset.x,
        y: pointer.y - offset.y,
        ..bounds
    }
    .clamped_into(canvas)
}

/// Proportional corner resize from the gesture's starting geometry. The opposite corner stays
/// put, both sides stay at least `min_size` and the result fits the canvas.
pub fn resized_bounds_from_handle(
    initial: AssetBounds,
    handle: ResizeHandle,
    dx: f64,
    dy: f64,
    min_size: f64,
    canvas: CanvasSize,
) -> AssetBounds {
    let w0 = initial.width.max(f64::EPSILON);
    let h0 = initial.height.max(f64::EPSILON);
    let raw_scale = 1.0 + handle.signed_displacement(dx, dy) / (w0 + h0);
    let min_scale = (min_size / w0).max(min_size / h0);
    let max_scale = (canvas.width / w0).min(canvas.height / h0).max(min_scale);
    let scale = if raw_scale.is_finite() {
        raw_scale.max(min_scale).min(max_scale)
    } else {
        1.0
    };

    let width = w0 * scale;
    let height = h0 * scale;
    let (x, y) = match handle.opposite() {
        ResizeHandle::TopLeft => (initial.x, initial.y),
        ResizeHandle::TopRight => (initial.right() - width, initial.y),
        ResizeHandle::BottomLeft => (initial.x, initial.bottom() - height),
        ResizeHandle::BottomRight => (initial.right() - width, initial.bottom() - height),
    };
    AssetBounds::new(x, y, width, height).clamped_into(canvas)
}

/// Placement for a freshly decoded bitmap: scaled down to fit `max_dimension` square keeping
/// its aspect ratio, centered on the drop point, then clamped into the canvas.
pub fn fit_dropped_bounds(
    natural_width: u32,
    natural_height: u32,
    drop_point: CanvasPoint,
    max_dimension: f64,
    canvas: CanvasSize,
) -> AssetBounds {
    let natural_w = f64::from(natural_width.max(1));
    let natural_h = f64::from(natural_height.max(1));
    let scale = (max_dimension / natural_w)
        .min(max_dimension / natural_h)
        .min(1.0);
    let width = natural_w * scale;
    let height = natural_h * scale;
    AssetBounds::new(
        drop_point.x - width / 2.0,
        drop_point.y - height / 2.0,
        width,
        height,
    )
    .clamped_into(canvas)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging {
        asset_id: AssetId,
        offset: CanvasPoint,
        initial: AssetBounds,
    },
    Resizing {
        asset_id: AssetId,
        handle: ResizeHandle,
        initial: AssetBounds,
        pointer: CanvasPoint,
    },
}

impl Gesture {
    fn asset_and_initial(&self) -> Option<(&AssetId, AssetBounds)> {
        match self {
            Self::Idle => None,
            Self::Dragging {
                asset_id, initial, ..
            }
            | Self::Resizing {
                asset_id, initial, ..
            } => Some((asset_id, *initial)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerDownOutcome {
    pub target: HitTarget,
    pub selection_changed: bool,
}

/// Pointer state machine: Idle → Dragging → Idle and Idle → Resizing → Idle.
#[derive(Debug, Clone)]
pub struct InteractionEngine {
    gesture: Gesture,
    handle_size: f64,
    min_asset_size: f64,
}

impl InteractionEngine {
    pub fn new(handle_size: f64, min_asset_size: f64) -> Self {
        Self {
            gesture: Gesture::Idle,
            handle_size: handle_size.max(1.0),
            min_asset_size: min_asset_size.max(1.0),
        }
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn handle_size(&self) -> f64 {
        self.handle_size
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    pub fn target_at(&self, scene: &SceneModel, point: CanvasPoint) -> HitTarget {
        hit_test(scene.assets(), point, self.handle_size)
    }

    pub fn cursor_at(&self, scene: &SceneModel, point: CanvasPoint) -> CanvasCursor {
        match &self.gesture {
            Gesture::Resizing { handle, .. } => handle.cursor(),
            Gesture::Dragging { .. } => CanvasCursor::Move,
            Gesture::Idle => cursor_for_target(&self.target_at(scene, point)),
        }
    }

    pub fn pointer_down(
        &mut self,
        scene: &mut SceneModel,
        point: CanvasPoint,
    ) -> PointerDownOutcome {
        let target = self.target_at(scene, point);
        let revision = scene.revision();
        match &target {
            HitTarget::Handle { asset_id, handle } => {
                if let Some(asset) = scene.get(asset_id) {
                    self.gesture = Gesture::Resizing {
                        asset_id: asset_id.clone(),
                        handle: *handle,
                        initial: asset.bounds,
                        pointer: point,
                    };
                    tracing::debug!(asset = %asset_id, ?handle, "resize started");
                }
            }
            HitTarget::Body(asset_id) => {
                scene.set_selected(asset_id);
                if let Some(asset) = scene.get(asset_id) {
                    self.gesture = Gesture::Dragging {
                        asset_id: asset_id.clone(),
                        offset: CanvasPoint::new(
                            point.x - asset.bounds.x,
                            point.y - asset.bounds.y,
                        ),
                        initial: asset.bounds,
                    };
                    tracing::debug!(asset = %asset_id, "drag started");
                }
            }
            HitTarget::Empty => {
                scene.clear_selection();
                self.gesture = Gesture::Idle;
            }
        }
        PointerDownOutcome {
            target,
            selection_changed: scene.revision() != revision,
        }
    }

    /// Applies the active gesture. Returns whether the scene changed.
    pub fn pointer_move(&mut self, scene: &mut SceneModel, point: CanvasPoint) -> bool {
        let canvas = scene.canvas();
        let next = match &self.gesture {
            Gesture::Idle => return false,
            Gesture::Dragging {
                asset_id, offset, ..
            } => {
                let Some(asset) = scene.get(asset_id) else {
                    return false;
                };
                (
                    asset_id.clone(),
                    dragged_bounds(asset.bounds, point, *offset, canvas),
                )
            }
            Gesture::Resizing {
                asset_id,
                handle,
                initial,
                pointer,
            } => (
                asset_id.clone(),
                resized_bounds_from_handle(
                    *initial,
                    *handle,
                    point.x - pointer.x,
                    point.y - pointer.y,
                    self.min_asset_size,
                    canvas,
                ),
            ),
        };
        let revision = scene.revision();
        scene.update_geometry(&next.0, next.1);
        scene.revision() != revision
    }

    /// Ends the gesture. Returns the asset id when its geometry differs from the gesture start.
    pub fn pointer_up(&mut self, scene: &SceneModel) -> Option<AssetId> {
        let gesture = std::mem::take(&mut self.gesture);
        let (asset_id, initial) = gesture.asset_and_initial()?;
        let current = scene.get(asset_id)?;
        if current.bounds == initial {
            return None;
        }
        tracing::debug!(asset = %asset_id, bounds = ?current.bounds, "gesture committed");
        Some(asset_id.clone())
    }

    pub fn cancel(&mut self) {
        self.gesture = Gesture::Idle;
    }
}

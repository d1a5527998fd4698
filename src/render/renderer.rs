use super::commands::replay;
use super::pipeline::{asset_commands, selection_commands, DecorationStyle};
use super::surface::DrawingSurface;
use crate::assets::BitmapCache;
use crate::editor::PlacedAsset;
use crate::geometry::{AssetBounds, CanvasSize, Color};

/// Display size in canvas pixels plus the device pixel ratio of the backing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    display: CanvasSize,
    device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(display: CanvasSize, device_pixel_ratio: f64) -> Self {
        Self {
            display,
            device_pixel_ratio: sanitize_ratio(device_pixel_ratio),
        }
    }

    pub fn display(&self) -> CanvasSize {
        self.display
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    pub fn backing_size(&self) -> (u32, u32) {
        (
            backing_dimension(self.display.width, self.device_pixel_ratio),
            backing_dimension(self.display.height, self.device_pixel_ratio),
        )
    }

    /// Returns true when the backing surface must be reallocated.
    pub fn resize(&mut self, display: CanvasSize) -> bool {
        let before = self.backing_size();
        self.display = display;
        self.backing_size() != before
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f64) -> bool {
        let before = self.backing_size();
        self.device_pixel_ratio = sanitize_ratio(ratio);
        self.backing_size() != before
    }
}

fn sanitize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    }
}

fn backing_dimension(display: f64, ratio: f64) -> u32 {
    (display.max(0.0) * ratio).round().max(1.0) as u32
}

pub struct Renderer {
    viewport: Viewport,
    style: DecorationStyle,
    dirty: bool,
}

impl Renderer {
    pub fn new(viewport: Viewport, style: DecorationStyle) -> Self {
        Self {
            viewport,
            style,
            dirty: true,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn style(&self) -> &DecorationStyle {
        &self.style
    }

    pub fn resize(&mut self, display: CanvasSize) -> bool {
        self.dirty = true;
        self.viewport.resize(display)
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f64) -> bool {
        self.dirty = true;
        self.viewport.set_device_pixel_ratio(ratio)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Draws one frame: white background, assets in array order, then the selection decoration
    /// of the selected asset on top.
    pub fn render(
        &mut self,
        surface: &mut dyn DrawingSurface,
        assets: &[PlacedAsset],
        bitmaps: &BitmapCache,
    ) {
        let display = self.viewport.display();
        let ratio = self.viewport.device_pixel_ratio();

        surface.save();
        surface.clear();
        surface.scale(ratio, ratio);
        surface.fill_rect(
            AssetBounds::new(0.0, 0.0, display.width, display.height),
            Color::WHITE,
        );
        for asset in assets {
            replay(&asset_commands(asset, bitmaps.get(&asset.id)), surface);
        }
        if let Some(selected) = assets.iter().find(|asset| asset.selected) {
            replay(
                &selection_commands(selected.bounds, display, &self.style),
                surface,
            );
        }
        surface.restore();

        self.dirty = false;
        tracing::trace!(assets = assets.len(), "canvas frame rendered");
    }
}

use crate::assets::DecodedBitmap;
use crate::editor::{BlendMode, ColorStop, FilterOp, ShadowSpec};
use crate::geometry::{AssetBounds, Color};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GradientShape {
    Linear { x0: f64, y0: f64, x1: f64, y1: f64 },
    Radial { cx: f64, cy: f64, radius: f64 },
}

/// A gradient fill in the current coordinate space. Stop positions are percentages.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientPaint {
    pub shape: GradientShape,
    pub stops: Vec<ColorStop>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Color,
    pub background: Option<Color>,
    pub padding: f64,
}

impl TextStyle {
    /// Approximate advance width, for layout without a font stack.
    pub fn estimate_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * (self.font_size * 0.62).max(1.0) + self.padding * 2.0
    }

    pub fn line_height(&self) -> f64 {
        (self.font_size * 1.3).max(2.0) + self.padding * 2.0
    }
}

/// 2D drawing backend used by the renderer and effects pipeline. State calls (transform, alpha,
/// filter, shadow, blend mode) stack with `save`/`restore` like a canvas context.
pub trait DrawingSurface {
    /// Backing size in device pixels.
    fn pixel_size(&self) -> (u32, u32);
    fn save(&mut self);
    fn restore(&mut self);
    fn translate(&mut self, x: f64, y: f64);
    fn rotate(&mut self, radians: f64);
    fn scale(&mut self, sx: f64, sy: f64);
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_filter(&mut self, ops: &[FilterOp]);
    fn set_shadow(&mut self, shadow: Option<ShadowSpec>);
    fn set_blend_mode(&mut self, mode: BlendMode);
    /// Resets every pixel to transparent, ignoring the current state.
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: AssetBounds, color: Color);
    fn draw_image(&mut self, bitmap: &DecodedBitmap, rect: AssetBounds);
    fn stroke_rect(&mut self, rect: AssetBounds, color: Color, width: f64, radius: f64);
    fn fill_gradient(&mut self, rect: AssetBounds, paint: &GradientPaint);
    /// Draws `text` with its top-left corner at `(x, y)`.
    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle);
}

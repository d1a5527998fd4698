use super::commands::DrawCommand;
use super::surface::{DrawingSurface, GradientPaint, TextStyle};
use crate::assets::DecodedBitmap;
use crate::editor::{BlendMode, FilterOp, ShadowSpec};
use crate::geometry::{AssetBounds, Color};

/// Surface that only logs calls. Used by tests and by hosts that replay commands remotely.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl DrawingSurface for RecordingSurface {
    fn pixel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn save(&mut self) {
        self.push(DrawCommand::Save);
    }

    fn restore(&mut self) {
        self.push(DrawCommand::Restore);
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::Translate { x, y });
    }

    fn rotate(&mut self, radians: f64) {
        self.push(DrawCommand::Rotate { radians });
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.push(DrawCommand::Scale { x: sx, y: sy });
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.push(DrawCommand::SetGlobalAlpha(alpha));
    }

    fn set_filter(&mut self, ops: &[FilterOp]) {
        self.push(DrawCommand::SetFilter(ops.to_vec()));
    }

    fn set_shadow(&mut self, shadow: Option<ShadowSpec>) {
        self.push(DrawCommand::SetShadow(shadow));
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.push(DrawCommand::SetBlendMode(mode));
    }

    fn clear(&mut self) {
        self.push(DrawCommand::Clear);
    }

    fn fill_rect(&mut self, rect: AssetBounds, color: Color) {
        self.push(DrawCommand::FillRect { rect, color });
    }

    fn draw_image(&mut self, bitmap: &DecodedBitmap, rect: AssetBounds) {
        self.push(DrawCommand::DrawImage {
            bitmap: bitmap.clone(),
            rect,
        });
    }

    fn stroke_rect(&mut self, rect: AssetBounds, color: Color, width: f64, radius: f64) {
        self.push(DrawCommand::StrokeRect {
            rect,
            color,
            width,
            radius,
        });
    }

    fn fill_gradient(&mut self, rect: AssetBounds, paint: &GradientPaint) {
        self.push(DrawCommand::FillGradient {
            rect,
            paint: paint.clone(),
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        self.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
            style: style.clone(),
        });
    }
}

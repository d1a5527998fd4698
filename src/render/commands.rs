use super::surface::{DrawingSurface, GradientPaint, TextStyle};
use crate::assets::DecodedBitmap;
use crate::editor::{BlendMode, FilterOp, ShadowSpec};
use crate::geometry::{AssetBounds, Color};

/// One recorded surface call. The pipeline emits these; [`replay`] feeds them to a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Save,
    Restore,
    Translate { x: f64, y: f64 },
    Rotate { radians: f64 },
    Scale { x: f64, y: f64 },
    SetGlobalAlpha(f64),
    SetFilter(Vec<FilterOp>),
    SetShadow(Option<ShadowSpec>),
    SetBlendMode(BlendMode),
    Clear,
    FillRect { rect: AssetBounds, color: Color },
    DrawImage { bitmap: DecodedBitmap, rect: AssetBounds },
    StrokeRect {
        rect: AssetBounds,
        color: Color,
        width: f64,
        radius: f64,
    },
    FillGradient { rect: AssetBounds, paint: GradientPaint },
    FillText {
        text: String,
        x: f64,
        y: f64,
        style: TextStyle,
    },
}

impl DrawCommand {
    pub fn apply(&self, surface: &mut dyn DrawingSurface) {
        match self {
            Self::Save => surface.save(),
            Self::Restore => surface.restore(),
            Self::Translate { x, y } => surface.translate(*x, *y),
            Self::Rotate { radians } => surface.rotate(*radians),
            Self::Scale { x, y } => surface.scale(*x, *y),
            Self::SetGlobalAlpha(alpha) => surface.set_global_alpha(*alpha),
            Self::SetFilter(ops) => surface.set_filter(ops),
            Self::SetShadow(shadow) => surface.set_shadow(*shadow),
            Self::SetBlendMode(mode) => surface.set_blend_mode(*mode),
            Self::Clear => surface.clear(),
            Self::FillRect { rect, color } => surface.fill_rect(*rect, *color),
            Self::DrawImage { bitmap, rect } => surface.draw_image(bitmap, *rect),
            Self::StrokeRect {
                rect,
                color,
                width,
                radius,
            } => surface.stroke_rect(*rect, *color, *width, *radius),
            Self::FillGradient { rect, paint } => surface.fill_gradient(*rect, paint),
            Self::FillText { text, x, y, style } => surface.fill_text(text, *x, *y, style),
        }
    }
}

pub fn replay(commands: &[DrawCommand], surface: &mut dyn DrawingSurface) {
    for command in commands {
        command.apply(surface);
    }
}

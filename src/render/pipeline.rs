use super::commands::DrawCommand;
use super::surface::{GradientPaint, GradientShape, TextStyle};
use crate::assets::DecodedBitmap;
use crate::editor::interaction::corner_points;
use crate::editor::{
    AdvancedGradientConfig, BlendMode, EffectStack, GradientKind, PlacedAsset, SimpleGradient,
};
use crate::geometry::{AssetBounds, CanvasSize, Color};

pub const DELETE_HINT: &str = "Press Delete to remove";

/// Fixed look of the selection outline, handles and hint. Never affected by asset effects.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationStyle {
    pub outline_color: Color,
    pub outline_width: f64,
    pub handle_size: f64,
    pub handle_fill: Color,
    pub hint: TextStyle,
    pub hint_gap: f64,
}

impl Default for DecorationStyle {
    fn default() -> Self {
        Self {
            outline_color: Color::rgb(0x3b, 0x82, 0xf6),
            outline_width: 2.0,
            handle_size: 8.0,
            handle_fill: Color::WHITE,
            hint: TextStyle {
                font_size: 12.0,
                color: Color::WHITE,
                background: Some(Color::rgba(0, 0, 0, 179)),
                padding: 4.0,
            },
            hint_gap: 4.0,
        }
    }
}

impl DecorationStyle {
    pub fn with_handle_size(handle_size: f64) -> Self {
        Self {
            handle_size,
            ..Self::default()
        }
    }
}

/// Commands for one asset with its effects, in canvas coordinates: transform, alpha, filter and
/// shadow, bitmap, simple gradient, advanced gradient, border. State is balanced.
pub fn asset_commands(asset: &PlacedAsset, bitmap: Option<&DecodedBitmap>) -> Vec<DrawCommand> {
    let fallback = EffectStack::default();
    let effects = asset.effects.as_ref().unwrap_or(&fallback);
    let bounds = asset.bounds;
    let (w, h) = (bounds.width, bounds.height);
    let local = AssetBounds::new(-w / 2.0, -h / 2.0, w, h);
    let opacity = effects.transform.opacity / 100.0;

    let mut commands = vec![DrawCommand::Save];
    let center = bounds.center();
    commands.push(DrawCommand::Translate {
        x: center.x,
        y: center.y,
    });
    if effects.transform.rotation != 0.0 {
        commands.push(DrawCommand::Rotate {
            radians: effects.transform.rotation.to_radians(),
        });
    }
    if effects.transform.flip_horizontal || effects.transform.flip_vertical {
        commands.push(DrawCommand::Scale {
            x: if effects.transform.flip_horizontal { -1.0 } else { 1.0 },
            y: if effects.transform.flip_vertical { -1.0 } else { 1.0 },
        });
    }
    commands.push(DrawCommand::SetGlobalAlpha(opacity));

    let filter_ops = effects.filter.ops();
    let filtered = !filter_ops.is_empty();
    let shadow = effects.shadow();
    if filtered {
        commands.push(DrawCommand::SetFilter(filter_ops));
    }
    if shadow.is_some() {
        commands.push(DrawCommand::SetShadow(shadow));
    }

    match bitmap {
        Some(bitmap) => commands.push(DrawCommand::DrawImage {
            bitmap: bitmap.clone(),
            rect: local,
        }),
        None => tracing::trace!(asset = %asset.id, "bitmap not loaded yet"),
    }

    if shadow.is_some() {
        commands.push(DrawCommand::SetShadow(None));
    }
    if filtered {
        commands.push(DrawCommand::SetFilter(Vec::new()));
    }

    let gradient = &effects.gradient;
    if gradient.enabled && gradient.opacity > 0.0 {
        commands.push(DrawCommand::SetGlobalAlpha(gradient.opacity / 100.0 * opacity));
        commands.push(DrawCommand::FillGradient {
            rect: local,
            paint: simple_gradient_paint(gradient, local),
        });
        commands.push(DrawCommand::SetGlobalAlpha(opacity));
    }

    if let Some(config) = &effects.advanced_gradient {
        let (rect, paint) = advanced_gradient_paint(config, w, h);
        commands.push(DrawCommand::SetGlobalAlpha(config.opacity / 100.0 * opacity));
        commands.push(DrawCommand::SetBlendMode(config.blend_mode));
        commands.push(DrawCommand::FillGradient { rect, paint });
        commands.push(DrawCommand::SetBlendMode(BlendMode::Normal));
        commands.push(DrawCommand::SetGlobalAlpha(opacity));
    }

    let border = &effects.border;
    if border.width > 0.0 {
        commands.push(DrawCommand::StrokeRect {
            rect: local,
            color: border.color,
            width: border.width,
            radius: border.radius,
        });
    }

    commands.push(DrawCommand::Restore);
    commands
}

/// Diagonal from the top-left to the bottom-right corner, or a centered radial.
fn simple_gradient_paint(gradient: &SimpleGradient, rect: AssetBounds) -> GradientPaint {
    let shape = match gradient.kind {
        GradientKind::Radial => GradientShape::Radial {
            cx: rect.center().x,
            cy: rect.center().y,
            radius: rect.width.max(rect.height) / 2.0,
        },
        GradientKind::Linear | GradientKind::Conic => GradientShape::Linear {
            x0: rect.x,
            y0: rect.y,
            x1: rect.right(),
            y1: rect.bottom(),
        },
    };
    GradientPaint {
        shape,
        stops: crate::editor::effects::sorted(&gradient.stops),
    }
}

/// Fill rectangle and paint for an advanced gradient in the asset-centered frame.
fn advanced_gradient_paint(
    config: &AdvancedGradientConfig,
    asset_width: f64,
    asset_height: f64,
) -> (AssetBounds, GradientPaint) {
    let area = config.local_area(asset_width, asset_height);
    let rect = AssetBounds::new(area.x0, area.y0, area.width(), area.height());
    let (cx, cy) = area.center();
    let shape = match config.kind {
        GradientKind::Radial => GradientShape::Radial {
            cx,
            cy,
            radius: area.width().max(area.height()) / 2.0 * config.size / 100.0,
        },
        GradientKind::Linear | GradientKind::Conic => {
            let radians = config.angle.to_radians();
            let (dx, dy) = (radians.sin(), -radians.cos());
            let half = (dx.abs() * area.width() + dy.abs() * area.height()) / 2.0;
            GradientShape::Linear {
                x0: cx - dx * half,
                y0: cy - dy * half,
                x1: cx + dx * half,
                y1: cy + dy * half,
            }
        }
    };
    (
        rect,
        GradientPaint {
            shape,
            stops: config.feathered_stops(),
        },
    )
}

/// Top-left of the delete hint: above the asset when it fits, else below, else nowhere.
pub fn hint_position(
    bounds: AssetBounds,
    canvas: CanvasSize,
    style: &DecorationStyle,
) -> Option<(f64, f64)> {
    let height = style.hint.line_height();
    let width = style.hint.estimate_width(DELETE_HINT);
    let above = bounds.y - style.hint_gap - height;
    let below = bounds.bottom() + style.hint_gap;
    let y = if above >= 0.0 {
        above
    } else if below + height <= canvas.height {
        below
    } else {
        return None;
    };
    let x = bounds.x.min((canvas.width - width).max(0.0)).max(0.0);
    Some((x, y))
}

/// Outline, corner handles and delete hint for the selected asset.
pub fn selection_commands(
    bounds: AssetBounds,
    canvas: CanvasSize,
    style: &DecorationStyle,
) -> Vec<DrawCommand> {
    let mut commands = vec![
        DrawCommand::Save,
        DrawCommand::SetGlobalAlpha(1.0),
        DrawCommand::StrokeRect {
            rect: bounds,
            color: style.outline_color,
            width: style.outline_width,
            radius: 0.0,
        },
    ];
    let half = style.handle_size / 2.0;
    for (_, corner) in corner_points(bounds) {
        let rect = AssetBounds::new(
            corner.x - half,
            corner.y - half,
            style.handle_size,
            style.handle_size,
        );
        commands.push(DrawCommand::FillRect {
            rect,
            color: style.handle_fill,
        });
        commands.push(DrawCommand::StrokeRect {
            rect,
            color: style.outline_color,
            width: 1.0,
            radius: 0.0,
        });
    }
    if let Some((x, y)) = hint_position(bounds, canvas, style) {
        commands.push(DrawCommand::FillText {
            text: DELETE_HINT.to_string(),
            x,
            y,
            style: style.hint.clone(),
        });
    }
    commands.push(DrawCommand::Restore);
    commands
}

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Color;

pub const MIN_COLOR_STOPS: usize = 2;
/// Upper bound of every blur slider, in canvas pixels.
pub const MAX_BLUR_PX: f64 = 100.0;
pub const MAX_BORDER_WIDTH: f64 = 100.0;
pub const MAX_BORDER_RADIUS: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    #[error("a gradient needs at least {MIN_COLOR_STOPS} color stops")]
    GradientStopUnderflow,
    #[error("color stop {index} does not exist ({len} stops)")]
    StopIndexOutOfRange { index: usize, len: usize },
    #[error("asset has no advanced gradient")]
    NoAdvancedGradient,
}

/// Per-asset visual effect parameters. `Default` renders the bitmap unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EffectStack {
    pub transform: TransformEffect,
    pub filter: FilterEffect,
    pub border: BorderEffect,
    pub drop_shadow: DropShadow,
    pub outer_glow: OuterGlow,
    pub gradient: SimpleGradient,
    pub advanced_gradient: Option<AdvancedGradientConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformEffect {
    /// Percent, 0..=100.
    pub opacity: f64,
    /// Degrees, 0..=360.
    pub rotation: f64,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
}

impl Default for TransformEffect {
    fn default() -> Self {
        Self {
            opacity: 100.0,
            rotation: 0.0,
            flip_horizontal: false,
            flip_vertical: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterEffect {
    pub brightness: f64,
    pub contrast: f64,
    pub saturation: f64,
    pub hue: f64,
    pub blur: f64,
    pub sepia: f64,
    pub grayscale: f64,
    pub invert: bool,
}

/// One primitive of a composite filter, in the units a raster backend applies directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOp {
    /// Multiplier, 1.0 is identity.
    Brightness(f64),
    Contrast(f64),
    Saturate(f64),
    HueRotate(f64),
    Blur(f64),
    /// Amount in 0..=1.
    Sepia(f64),
    Grayscale(f64),
    Invert,
}

impl FilterOp {
    pub fn css(self) -> String {
        match self {
            Self::Brightness(v) => format!("brightness({}%)", percent(v)),
            Self::Contrast(v) => format!("contrast({}%)", percent(v)),
            Self::Saturate(v) => format!("saturate({}%)", percent(v)),
            Self::HueRotate(deg) => format!("hue-rotate({deg}deg)"),
            Self::Blur(px) => format!("blur({px}px)"),
            Self::Sepia(v) => format!("sepia({}%)", percent(v)),
            Self::Grayscale(v) => format!("grayscale({}%)", percent(v)),
            Self::Invert => "invert(100%)".to_string(),
        }
    }
}

fn percent(factor: f64) -> f64 {
    (factor * 100.0).round()
}

impl FilterEffect {
    /// Filter primitives that deviate from identity, in application order.
    pub fn ops(&self) -> Vec<FilterOp> {
        let mut ops = Vec::new();
        if self.brightness != 0.0 {
            ops.push(FilterOp::Brightness(1.0 + self.brightness / 100.0));
        }
        if self.contrast != 0.0 {
            ops.push(FilterOp::Contrast(1.0 + self.contrast / 100.0));
        }
        if self.saturation != 0.0 {
            ops.push(FilterOp::Saturate(1.0 + self.saturation / 100.0));
        }
        if self.hue != 0.0 && self.hue != 360.0 {
            ops.push(FilterOp::HueRotate(self.hue));
        }
        if self.blur > 0.0 {
            ops.push(FilterOp::Blur(self.blur));
        }
        if self.sepia > 0.0 {
            ops.push(FilterOp::Sepia(self.sepia / 100.0));
        }
        if self.grayscale > 0.0 {
            ops.push(FilterOp::Grayscale(self.grayscale / 100.0));
        }
        if self.invert {
            ops.push(FilterOp::Invert);
        }
        ops
    }

    pub fn css_filter(&self) -> Option<String> {
        let ops = self.ops();
        if ops.is_empty() {
            return None;
        }
        Some(ops.into_iter().map(FilterOp::css).collect::<Vec<_>>().join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderEffect {
    pub width: f64,
    pub color: Color,
    pub radius: f64,
}

impl Default for BorderEffect {
    fn default() -> Self {
        Self {
            width: 0.0,
            color: Color::BLACK,
            radius: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropShadow {
    pub x: f64,
    pub y: f64,
    pub blur: f64,
    pub color: Color,
    pub enabled: bool,
}

impl Default for DropShadow {
    fn default() -> Self {
        Self {
            x: 4.0,
            y: 4.0,
            blur: 8.0,
            color: Color::rgba(0, 0, 0, 128),
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OuterGlow {
    pub blur: f64,
    pub color: Color,
    pub enabled: bool,
}

impl Default for OuterGlow {
    fn default() -> Self {
        Self {
            blur: 12.0,
            color: Color::rgb(255, 255, 255),
            enabled: false,
        }
    }
}

/// Resolved shadow state for a draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSpec {
    pub offset_x: f64,
    pub offset_y: f64,
    pub blur: f64,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Conic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub color: Color,
    /// Percent along the gradient, 0..=100.
    pub position: f64,
}

impl ColorStop {
    pub fn new(color: Color, position: f64) -> Self {
        Self {
            color,
            position: position.clamp(0.0, 100.0),
        }
    }
}

fn default_stops() -> Vec<ColorStop> {
    vec![
        ColorStop::new(Color::TRANSPARENT, 0.0),
        ColorStop::new(Color::BLACK, 100.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleGradient {
    #[serde(rename = "type")]
    pub kind: GradientKind,
    #[serde(rename = "colorStops")]
    pub stops: Vec<ColorStop>,
    pub angle: f64,
    /// Percent, 0..=100.
    pub opacity: f64,
    pub enabled: bool,
}

impl Default for SimpleGradient {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            stops: default_stops(),
            angle: 135.0,
            opacity: 50.0,
            enabled: false,
        }
    }
}

/// User-drawn rectangle in preview-viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientArea {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewDimensions {
    pub width: f64,
    pub height: f64,
}

impl Default for PreviewDimensions {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 240.0,
        }
    }
}

/// Gradient geometry in the asset-centered frame: origin at the asset center, asset pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl LocalRect {
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Canvas composite-operation name.
    pub const fn composite_operation(self) -> &'static str {
        match self {
            Self::Normal => "source-over",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::ColorDodge => "color-dodge",
            Self::ColorBurn => "color-burn",
            Self::HardLight => "hard-light",
            Self::SoftLight => "soft-light",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Color => "color",
            Self::Luminosity => "luminosity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdvancedGradientConfig {
    #[serde(rename = "type")]
    pub kind: GradientKind,
    #[serde(rename = "colorStops")]
    pub stops: Vec<ColorStop>,
    pub area: Option<GradientArea>,
    pub angle: f64,
    /// Radial extent in percent of the half-diagonal box, 10..=200.
    pub size: f64,
    /// Soft edge in percent, 0..=100.
    pub feather: f64,
    pub opacity: f64,
    pub blend_mode: BlendMode,
    pub preview_dimensions: PreviewDimensions,
}

impl Default for AdvancedGradientConfig {
    fn default() -> Self {
        Self {
            kind: GradientKind::Linear,
            stops: default_stops(),
            area: None,
            angle: 90.0,
            size: 100.0,
            feather: 0.0,
            opacity: 100.0,
            blend_mode: BlendMode::Normal,
            preview_dimensions: PreviewDimensions::default(),
        }
    }
}

impl AdvancedGradientConfig {
    /// Gradient rectangle in the asset-centered frame. Without an area the full bounds are used;
    /// otherwise the area is rescaled from preview space with independent X/Y factors.
    pub fn local_area(&self, asset_width: f64, asset_height: f64) -> LocalRect {
        let half_w = asset_width / 2.0;
        let half_h = asset_height / 2.0;
        let Some(area) = self.area else {
            return LocalRect {
                x0: -half_w,
                y0: -half_h,
                x1: half_w,
                y1: half_h,
            };
        };
        let preview = self.preview_dimensions;
        let sx = if preview.width > 0.0 {
            asset_width / preview.width
        } else {
            1.0
        };
        let sy = if preview.height > 0.0 {
            asset_height / preview.height
        } else {
            1.0
        };
        LocalRect {
            x0: area.start_x.min(area.end_x) * sx - half_w,
            y0: area.start_y.min(area.end_y) * sy - half_h,
            x1: area.start_x.max(area.end_x) * sx - half_w,
            y1: area.start_y.max(area.end_y) * sy - half_h,
        }
    }

    /// Stops with feathering applied: positions are compressed into `[f/2, 100 - f/2]` and
    /// transparent copies of the end colors pad both sides.
    pub fn feathered_stops(&self) -> Vec<ColorStop> {
        let mut stops = sorted(&self.stops);
        if self.feather <= 0.0 || stops.is_empty() {
            return stops;
        }
        let inset = self.feather / 2.0;
        let span = 100.0 - self.feather;
        for stop in &mut stops {
            stop.position = inset + stop.position / 100.0 * span;
        }
        let first = stops[0].color.with_alpha(0);
        let last = stops[stops.len() - 1].color.with_alpha(0);
        stops.insert(0, ColorStop::new(first, 0.0));
        stops.push(ColorStop::new(last, 100.0));
        stops
    }
}

pub(crate) fn sorted(stops: &[ColorStop]) -> Vec<ColorStop> {
    let mut stops = stops.to_vec();
    stops.sort_by(|a, b| a.position.total_cmp(&b.position));
    stops
}

/// Which gradient a stop edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientTarget {
    Simple,
    Advanced,
}

/// A single parameter edit from the effects panel. Values are clamped on apply.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectEdit {
    Opacity(f64),
    Rotation(f64),
    FlipHorizontal(bool),
    FlipVertical(bool),
    Brightness(f64),
    Contrast(f64),
    Saturation(f64),
    Hue(f64),
    Blur(f64),
    Sepia(f64),
    Grayscale(f64),
    Invert(bool),
    BorderWidth(f64),
    BorderColor(Color),
    BorderRadius(f64),
    DropShadow(DropShadow),
    OuterGlow(OuterGlow),
    Gradient(SimpleGradient),
    AdvancedGradient(Option<AdvancedGradientConfig>),
    GradientArea(Option<GradientArea>, PreviewDimensions),
    Reset,
}

impl EffectStack {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&mut self, edit: EffectEdit) -> Result<(), EffectError> {
        match edit {
            EffectEdit::Opacity(v) => self.transform.opacity = v,
            EffectEdit::Rotation(v) => self.transform.rotation = v,
            EffectEdit::FlipHorizontal(v) => self.transform.flip_horizontal = v,
            EffectEdit::FlipVertical(v) => self.transform.flip_vertical = v,
            EffectEdit::Brightness(v) => self.filter.brightness = v,
            EffectEdit::Contrast(v) => self.filter.contrast = v,
            EffectEdit::Saturation(v) => self.filter.saturation = v,
            EffectEdit::Hue(v) => self.filter.hue = v,
            EffectEdit::Blur(v) => self.filter.blur = v,
            EffectEdit::Sepia(v) => self.filter.sepia = v,
            EffectEdit::Grayscale(v) => self.filter.grayscale = v,
            EffectEdit::Invert(v) => self.filter.invert = v,
            EffectEdit::BorderWidth(v) => self.border.width = v,
            EffectEdit::BorderColor(color) => self.border.color = color,
            EffectEdit::BorderRadius(v) => self.border.radius = v,
            EffectEdit::DropShadow(shadow) => self.drop_shadow = shadow,
            EffectEdit::OuterGlow(glow) => self.outer_glow = glow,
            EffectEdit::Gradient(gradient) => self.gradient = gradient,
            EffectEdit::AdvancedGradient(config) => self.advanced_gradient = config,
            EffectEdit::GradientArea(area, preview) => {
                let config = self
                    .advanced_gradient
                    .as_mut()
                    .ok_or(EffectError::NoAdvancedGradient)?;
                config.area = area;
                config.preview_dimensions = preview;
            }
            EffectEdit::Reset => *self = Self::default(),
        }
        self.clamp_ranges();
        Ok(())
    }

    /// Forces every numeric field into its documented range and tops stop lists up to the floor.
    pub fn clamp_ranges(&mut self) {
        let t = &mut self.transform;
        t.opacity = clamp_or(t.opacity, 0.0, 100.0, 100.0);
        t.rotation = clamp_or(t.rotation, 0.0, 360.0, 0.0);

        let f = &mut self.filter;
        f.brightness = clamp_or(f.brightness, -100.0, 100.0, 0.0);
        f.contrast = clamp_or(f.contrast, -100.0, 100.0, 0.0);
        f.saturation = clamp_or(f.saturation, -100.0, 100.0, 0.0);
        f.hue = clamp_or(f.hue, 0.0, 360.0, 0.0);
        f.blur = clamp_or(f.blur, 0.0, MAX_BLUR_PX, 0.0);
        f.sepia = clamp_or(f.sepia, 0.0, 100.0, 0.0);
        f.grayscale = clamp_or(f.grayscale, 0.0, 100.0, 0.0);

        self.border.width = clamp_or(self.border.width, 0.0, MAX_BORDER_WIDTH, 0.0);
        self.border.radius = clamp_or(self.border.radius, 0.0, MAX_BORDER_RADIUS, 0.0);
        self.drop_shadow.blur = clamp_or(self.drop_shadow.blur, 0.0, MAX_BLUR_PX, 0.0);
        self.outer_glow.blur = clamp_or(self.outer_glow.blur, 0.0, MAX_BLUR_PX, 0.0);

        let g = &mut self.gradient;
        g.opacity = clamp_or(g.opacity, 0.0, 100.0, 50.0);
        g.angle = clamp_or(g.angle, 0.0, 360.0, 135.0);
        normalize_stops(&mut g.stops);

        if let Some(a) = self.advanced_gradient.as_mut() {
            a.opacity = clamp_or(a.opacity, 0.0, 100.0, 100.0);
            a.angle = clamp_or(a.angle, 0.0, 360.0, 90.0);
            a.size = clamp_or(a.size, 10.0, 200.0, 100.0);
            a.feather = clamp_or(a.feather, 0.0, 100.0, 0.0);
            normalize_stops(&mut a.stops);
        }
    }

    pub fn shadow(&self) -> Option<ShadowSpec> {
        if self.drop_shadow.enabled {
            return Some(ShadowSpec {
                offset_x: self.drop_shadow.x,
                offset_y: self.drop_shadow.y,
                blur: self.drop_shadow.blur,
                color: self.drop_shadow.color,
            });
        }
        self.outer_glow.enabled.then_some(ShadowSpec {
            offset_x: 0.0,
            offset_y: 0.0,
            blur: self.outer_glow.blur,
            color: self.outer_glow.color,
        })
    }

    fn stops_mut(&mut self, target: GradientTarget) -> Result<&mut Vec<ColorStop>, EffectError> {
        match target {
            GradientTarget::Simple => Ok(&mut self.gradient.stops),
            GradientTarget::Advanced => self
                .advanced_gradient
                .as_mut()
                .map(|config| &mut config.stops)
                .ok_or(EffectError::NoAdvancedGradient),
        }
    }

    /// Inserts a stop keeping the list ordered by position.
    pub fn add_stop(&mut self, target: GradientTarget, stop: ColorStop) -> Result<(), EffectError> {
        let stops = self.stops_mut(target)?;
        let stop = ColorStop::new(stop.color, stop.position);
        let index = stops
            .iter()
            .position(|existing| existing.position > stop.position)
            .unwrap_or(stops.len());
        stops.insert(index, stop);
        Ok(())
    }

    /// Removes a stop. Rejected without changes when only the minimum remains.
    pub fn remove_stop(
        &mut self,
        target: GradientTarget,
        index: usize,
    ) -> Result<ColorStop, EffectError> {
        let stops = self.stops_mut(target)?;
        if stops.len() <= MIN_COLOR_STOPS {
            return Err(EffectError::GradientStopUnderflow);
        }
        if index >= stops.len() {
            return Err(EffectError::StopIndexOutOfRange {
                index,
                len: stops.len(),
            });
        }
        Ok(stops.remove(index))
    }
}

fn clamp_or(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

fn normalize_stops(stops: &mut Vec<ColorStop>) {
    for stop in stops.iter_mut() {
        stop.position = clamp_or(stop.position, 0.0, 100.0, 0.0);
    }
    match stops.len() {
        0 => *stops = default_stops(),
        1 => {
            let only = stops[0];
            stops.clear();
            stops.push(ColorStop::new(only.color, 0.0));
            stops.push(ColorStop::new(only.color, 100.0));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stack_has_no_filter_or_shadow() {
        let stack = EffectStack::default();
        assert!(stack.is_identity());
        assert!(stack.filter.ops().is_empty());
        assert_eq!(stack.filter.css_filter(), None);
        assert_eq!(stack.shadow(), None);
    }

    #[test]
    fn edits_clamp_into_documented_ranges() {
        let mut stack = EffectStack::default();
        stack.apply(EffectEdit::Opacity(140.0)).unwrap();
        stack.apply(EffectEdit::Brightness(-250.0)).unwrap();
        stack.apply(EffectEdit::Blur(-3.0)).unwrap();
        stack.apply(EffectEdit::Rotation(f64::NAN)).unwrap();
        assert_eq!(stack.transform.opacity, 100.0);
        assert_eq!(stack.filter.brightness, -100.0);
        assert_eq!(stack.filter.blur, 0.0);
        assert_eq!(stack.transform.rotation, 0.0);
    }

    #[test]
    fn blur_and_border_edits_are_bounded() {
        let mut stack = EffectStack::default();
        stack.apply(EffectEdit::Blur(1.0e7)).unwrap();
        stack.apply(EffectEdit::BorderWidth(f64::INFINITY)).unwrap();
        stack.apply(EffectEdit::BorderRadius(1.0e12)).unwrap();
        stack.drop_shadow.blur = 1.0e9;
        stack.outer_glow.blur = f64::MAX;
        stack.clamp_ranges();
        assert_eq!(stack.filter.blur, MAX_BLUR_PX);
        assert_eq!(stack.border.width, MAX_BORDER_WIDTH);
        assert_eq!(stack.border.radius, MAX_BORDER_RADIUS);
        assert_eq!(stack.drop_shadow.blur, MAX_BLUR_PX);
        assert_eq!(stack.outer_glow.blur, MAX_BLUR_PX);
    }

    #[test]
    fn css_filter_lists_only_non_identity_ops() {
        let filter = FilterEffect {
            brightness: 20.0,
            blur: 2.0,
            invert: true,
            ..FilterEffect::default()
        };
        assert_eq!(
            filter.css_filter().as_deref(),
            Some("brightness(120%) blur(2px) invert(100%)")
        );
    }

    #[test]
    fn drop_shadow_wins_over_outer_glow() {
        let mut stack = EffectStack::default();
        stack.outer_glow.enabled = true;
        assert_eq!(stack.shadow().unwrap().offset_x, 0.0);
        stack.drop_shadow.enabled = true;
        assert_eq!(stack.shadow().unwrap().offset_x, 4.0);
    }

    #[test]
    fn removing_stop_at_floor_is_rejected_and_unchanged() {
        let mut stack = EffectStack::default();
        let before = stack.gradient.stops.clone();
        let err = stack.remove_stop(GradientTarget::Simple, 0).unwrap_err();
        assert_eq!(err, EffectError::GradientStopUnderflow);
        assert_eq!(stack.gradient.stops, before);
    }

    #[test]
    fn added_stop_is_inserted_by_position_and_removable() {
        let mut stack = EffectStack::default();
        stack
            .add_stop(GradientTarget::Simple, ColorStop::new(Color::WHITE, 50.0))
            .unwrap();
        let positions: Vec<f64> = stack.gradient.stops.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0.0, 50.0, 100.0]);

        let removed = stack.remove_stop(GradientTarget::Simple, 1).unwrap();
        assert_eq!(removed.color, Color::WHITE);
        assert_eq!(stack.gradient.stops.len(), 2);
    }

    #[test]
    fn advanced_stop_edit_requires_advanced_gradient() {
        let mut stack = EffectStack::default();
        let err = stack
            .add_stop(GradientTarget::Advanced, ColorStop::new(Color::WHITE, 10.0))
            .unwrap_err();
        assert_eq!(err, EffectError::NoAdvancedGradient);
    }

    #[test]
    fn area_is_remapped_from_preview_into_asset_centered_frame() {
        let config = AdvancedGradientConfig {
            area: Some(GradientArea {
                start_x: 100.0,
                start_y: 60.0,
                end_x: 300.0,
                end_y: 180.0,
            }),
            preview_dimensions: PreviewDimensions {
                width: 400.0,
                height: 240.0,
            },
            ..AdvancedGradientConfig::default()
        };
        let local = config.local_area(800.0, 480.0);
        assert_eq!(local.x0, -200.0);
        assert_eq!(local.y0, -120.0);
        assert_eq!(local.x1, 200.0);
        assert_eq!(local.y1, 120.0);
    }

    #[test]
    fn missing_area_covers_full_bounds() {
        let local = AdvancedGradientConfig::default().local_area(100.0, 50.0);
        assert_eq!((local.x0, local.y0, local.x1, local.y1), (-50.0, -25.0, 50.0, 25.0));
    }

    #[test]
    fn feather_pads_with_transparent_end_stops() {
        let config = AdvancedGradientConfig {
            feather: 20.0,
            ..AdvancedGradientConfig::default()
        };
        let stops = config.feathered_stops();
        let positions: Vec<f64> = stops.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0.0, 10.0, 90.0, 100.0]);
        assert_eq!(stops[3].color.a, 0);
    }

    #[test]
    fn stack_deserializes_camel_case_json() {
        let stack: EffectStack = serde_json::from_str(
            r##"{
                "transform": { "opacity": 80, "flipHorizontal": true },
                "advancedGradient": {
                    "type": "conic",
                    "colorStops": [
                        { "color": "#ff0000", "position": 0 },
                        { "color": "#0000ff", "position": 100 }
                    ],
                    "blendMode": "soft-light",
                    "previewDimensions": { "width": 400, "height": 240 }
                }
            }"##,
        )
        .unwrap();
        assert_eq!(stack.transform.opacity, 80.0);
        assert!(stack.transform.flip_horizontal);
        let advanced = stack.advanced_gradient.unwrap();
        assert_eq!(advanced.kind, GradientKind::Conic);
        assert_eq!(advanced.blend_mode, BlendMode::SoftLight);
        assert_eq!(advanced.area, None);
    }
}

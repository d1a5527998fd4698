//! Geometric and color primitives shared by the editor, renderer and exporter.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle in canvas pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AssetBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl AssetBounds {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> CanvasPoint {
        CanvasPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, point: CanvasPoint) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Moves the origin so the rectangle lies inside `canvas`. Sizes larger than the canvas pin
    /// the origin to zero.
    pub fn clamped_into(self, canvas: CanvasSize) -> Self {
        let max_x = (canvas.width - self.width).max(0.0);
        let max_y = (canvas.height - self.height).max(0.0);
        Self {
            x: self.x.clamp(0.0, max_x),
            y: self.y.clamp(0.0, max_y),
            ..self
        }
    }

    pub fn union(self, other: Self) -> Self {
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(left, top, right - left, bottom - top)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported color value: {0}")]
pub struct ColorParseError(pub String);

/// 8-bit RGBA color. Serialized as `#rrggbb` (opaque) or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Accepts `#rgb`, `#rrggbb`, `#rrggbbaa` and `rgba(r, g, b, a)` with `a` in `0..=1`.
    pub fn parse(value: &str) -> Result<Self, ColorParseError> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| ColorParseError(value.to_string()));
        }
        if let Some(body) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_functional(body).ok_or_else(|| ColorParseError(value.to_string()));
        }
        Err(ColorParseError(value.to_string()))
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    match hex.len() {
        3 => {
            let expand = |index: usize| {
                let digit = u8::from_str_radix(hex.get(index..index + 1)?, 16).ok()?;
                Some(digit * 17)
            };
            Some(Color::rgb(expand(0)?, expand(1)?, expand(2)?))
        }
        6 => Some(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        8 => Some(Color::rgba(
            channel(0..2)?,
            channel(2..4)?,
            channel(4..6)?,
            channel(6..8)?,
        )),
        _ => None,
    }
}

fn parse_functional(body: &str) -> Option<Color> {
    let parts = body.split(',').map(str::trim).collect::<Vec<_>>();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let r = parts[0].parse::<u8>().ok()?;
    let g = parts[1].parse::<u8>().ok()?;
    let b = parts[2].parse::<u8>().ok()?;
    let a = match parts.get(3) {
        Some(alpha) => {
            let alpha = alpha.parse::<f64>().ok()?.clamp(0.0, 1.0);
            (alpha * 255.0).round() as u8
        }
        None => 255,
    };
    Some(Color::rgba(r, g, b, a))
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

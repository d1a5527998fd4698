use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use image::RgbaImage;
use tiny_skia::{
    BlendMode as SkiaBlendMode, FilterQuality, GradientStop, LinearGradient, Paint, PathBuilder,
    Pixmap, PixmapPaint, Point, RadialGradient, Rect, SpreadMode, Stroke, Transform,
};

use super::filters::{apply_filters, shadow_silhouette};
use super::surface::{DrawingSurface, GradientPaint, GradientShape, TextStyle};
use super::RenderError;
use crate::assets::DecodedBitmap;
use crate::editor::{BlendMode, FilterOp, ShadowSpec};
use crate::geometry::{AssetBounds, Color};

#[derive(Debug, Clone)]
struct SurfaceState {
    transform: Transform,
    alpha: f32,
    filter: Vec<FilterOp>,
    shadow: Option<ShadowSpec>,
    blend_mode: SkiaBlendMode,
}

impl Default for SurfaceState {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            alpha: 1.0,
            filter: Vec::new(),
            shadow: None,
            blend_mode: SkiaBlendMode::SourceOver,
        }
    }
}

impl SurfaceState {
    fn paint(&self, color: Color) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, scaled_alpha(color.a, self.alpha));
        paint.anti_alias = true;
        paint.blend_mode = self.blend_mode;
        paint
    }

    fn pixmap_paint(&self) -> PixmapPaint {
        PixmapPaint {
            opacity: self.alpha,
            blend_mode: self.blend_mode,
            quality: FilterQuality::Bilinear,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FilteredKey {
    filter: Vec<FilterOp>,
    shadow: Option<ShadowSpec>,
    scale_bits: u64,
}

struct FilteredEntry {
    key: FilteredKey,
    image: Pixmap,
    shadow: Option<(Pixmap, u32)>,
}

/// Filtered and shadow pixmaps per bitmap, rebuilt only when the filter state changes.
#[derive(Default)]
struct FilteredImageCache {
    entries: HashMap<u64, FilteredEntry>,
}

impl FilteredImageCache {
    fn entry_for(&mut self, bitmap: &DecodedBitmap, key: FilteredKey) -> Option<&FilteredEntry> {
        let fresh = self
            .entries
            .get(&bitmap.key())
            .is_some_and(|entry| entry.key == key);
        if !fresh {
            let scale = f64::from_bits(key.scale_bits);
            let filtered =
                (!key.filter.is_empty()).then(|| apply_filters(bitmap.image(), &key.filter, scale));
            let source = filtered.as_ref().unwrap_or(bitmap.image());
            let image = rgba_image_to_pixmap(source)?;
            let shadow = key.shadow.and_then(|spec| {
                let (silhouette, pad) = shadow_silhouette(source, &spec, scale);
                rgba_image_to_pixmap(&silhouette).map(|pixmap| (pixmap, pad))
            });
            self.entries.insert(
                bitmap.key(),
                FilteredEntry { key, image, shadow },
            );
        }
        self.entries.get(&bitmap.key())
    }

    fn retain(&mut self, live: &HashSet<u64>) {
        self.entries.retain(|key, _| live.contains(key));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Software raster backend on a tiny-skia pixmap. Text is drawn as its backing plate only.
pub struct PixmapSurface {
    pixmap: Pixmap,
    state_stack: Vec<SurfaceState>,
    state: SurfaceState,
    cache: FilteredImageCache,
    frame_bitmaps: HashSet<u64>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        let pixmap =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation { width, height })?;
        Ok(Self {
            pixmap,
            state_stack: Vec::new(),
            state: SurfaceState::default(),
            cache: FilteredImageCache::default(),
            frame_bitmaps: HashSet::new(),
        })
    }

    /// Reallocates the backing pixmap. Contents and state are reset.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.pixmap =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceAllocation { width, height })?;
        self.state_stack.clear();
        self.state = SurfaceState::default();
        Ok(())
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Straight-alpha copy of the pixels.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut data = self.pixmap.data().to_vec();
        unpremultiply_rgba_in_place(&mut data);
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        RgbaImage::from_raw(width, height, data).unwrap_or_else(|| RgbaImage::new(width, height))
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut bytes = Cursor::new(Vec::new());
        self.to_rgba_image()
            .write_to(&mut bytes, image::ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    fn fill_skia_rect(&mut self, rect: AssetBounds, paint: &Paint<'_>) {
        if let Some(rect) = to_skia_rect(rect) {
            self.pixmap
                .fill_rect(rect, paint, self.state.transform, None);
        }
    }
}

impl DrawingSurface for PixmapSurface {
    fn pixel_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn save(&mut self) {
        self.state_stack.push(self.state.clone());
    }

    fn restore(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.state = state;
        }
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.state.transform = self.state.transform.pre_translate(x as f32, y as f32);
    }

    fn rotate(&mut self, radians: f64) {
        self.state.transform = self
            .state
            .transform
            .pre_concat(Transform::from_rotate(radians.to_degrees() as f32));
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        self.state.transform = self.state.transform.pre_scale(sx as f32, sy as f32);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.state.alpha = (alpha as f32).clamp(0.0, 1.0);
    }

    fn set_filter(&mut self, ops: &[FilterOp]) {
        self.state.filter = ops.to_vec();
    }

    fn set_shadow(&mut self, shadow: Option<ShadowSpec>) {
        self.state.shadow = shadow;
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.state.blend_mode = to_skia_blend_mode(mode);
    }

    /// Also drops cached filter output for bitmaps not drawn since the previous clear.
    fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
        let drawn = std::mem::take(&mut self.frame_bitmaps);
        self.cache.retain(&drawn);
    }

    fn fill_rect(&mut self, rect: AssetBounds, color: Color) {
        let paint = self.state.paint(color);
        self.fill_skia_rect(rect, &paint);
    }

    fn draw_image(&mut self, bitmap: &DecodedBitmap, rect: AssetBounds) {
        if rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let source_per_canvas = f64::from(bitmap.width()) / rect.width;
        let key = FilteredKey {
            filter: self.state.filter.clone(),
            shadow: self.state.shadow,
            scale_bits: source_per_canvas.to_bits(),
        };
        self.frame_bitmaps.insert(bitmap.key());
        let Some(entry) = self.cache.entry_for(bitmap, key) else {
            tracing::warn!(bitmap = bitmap.key(), "could not allocate pixmap for bitmap");
            return;
        };

        let sx = (rect.width / f64::from(bitmap.width())) as f32;
        let sy = (rect.height / f64::from(bitmap.height())) as f32;
        let paint = self.state.pixmap_paint();
        if let (Some((shadow, pad)), Some(spec)) = (&entry.shadow, self.state.shadow) {
            let pad = *pad as f32;
            let transform = self
                .state
                .transform
                .pre_translate((rect.x + spec.offset_x) as f32, (rect.y + spec.offset_y) as f32)
                .pre_scale(sx, sy)
                .pre_translate(-pad, -pad);
            self.pixmap
                .draw_pixmap(0, 0, shadow.as_ref(), &paint, transform, None);
        }
        let transform = self
            .state
            .transform
            .pre_translate(rect.x as f32, rect.y as f32)
            .pre_scale(sx, sy);
        self.pixmap
            .draw_pixmap(0, 0, entry.image.as_ref(), &paint, transform, None);
    }

    fn stroke_rect(&mut self, rect: AssetBounds, color: Color, width: f64, radius: f64) {
        let Some(skia_rect) = to_skia_rect(rect) else {
            return;
        };
        let path = if radius > 0.0 {
            rounded_rect_path(rect, radius)
        } else {
            Some(PathBuilder::from_rect(skia_rect))
        };
        let Some(path) = path else {
            return;
        };
        let paint = self.state.paint(color);
        let stroke = Stroke {
            width: width as f32,
            ..Default::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, self.state.transform, None);
    }

    fn fill_gradient(&mut self, rect: AssetBounds, gradient: &GradientPaint) {
        let stops = gradient
            .stops
            .iter()
            .map(|stop| {
                GradientStop::new(
                    (stop.position / 100.0) as f32,
                    tiny_skia::Color::from_rgba8(
                        stop.color.r,
                        stop.color.g,
                        stop.color.b,
                        scaled_alpha(stop.color.a, self.state.alpha),
                    ),
                )
            })
            .collect::<Vec<_>>();
        let shader = match gradient.shape {
            GradientShape::Linear { x0, y0, x1, y1 } => LinearGradient::new(
                Point::from_xy(x0 as f32, y0 as f32),
                Point::from_xy(x1 as f32, y1 as f32),
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            ),
            GradientShape::Radial { cx, cy, radius } => RadialGradient::new(
                Point::from_xy(cx as f32, cy as f32),
                Point::from_xy(cx as f32, cy as f32),
                radius as f32,
                stops,
                SpreadMode::Pad,
                Transform::identity(),
            ),
        };
        let Some(shader) = shader else {
            tracing::debug!(?rect, "degenerate gradient skipped");
            return;
        };
        let paint = Paint {
            shader,
            blend_mode: self.state.blend_mode,
            anti_alias: true,
            ..Default::default()
        };
        self.fill_skia_rect(rect, &paint);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: &TextStyle) {
        if let Some(background) = style.background {
            let plate = AssetBounds::new(x, y, style.estimate_width(text), style.line_height());
            let paint = self.state.paint(background);
            self.fill_skia_rect(plate, &paint);
        }
    }
}

fn scaled_alpha(alpha: u8, factor: f32) -> u8 {
    (f32::from(alpha) * factor.clamp(0.0, 1.0)).round() as u8
}

fn to_skia_rect(rect: AssetBounds) -> Option<Rect> {
    Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    )
}

fn rounded_rect_path(rect: AssetBounds, radius: f64) -> Option<tiny_skia::Path> {
    let (x, y, w, h) = (
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    );
    let r = (radius as f32).min(w.min(h) / 2.0).max(0.0);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(x + w - r, y);
    pb.quad_to(x + w, y, x + w, y + r);
    pb.line_to(x + w, y + h - r);
    pb.quad_to(x + w, y + h, x + w - r, y + h);
    pb.line_to(x + r, y + h);
    pb.quad_to(x, y + h, x, y + h - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

fn to_skia_blend_mode(mode: BlendMode) -> SkiaBlendMode {
    match mode {
        BlendMode::Normal => SkiaBlendMode::SourceOver,
        BlendMode::Multiply => SkiaBlendMode::Multiply,
        BlendMode::Screen => SkiaBlendMode::Screen,
        BlendMode::Overlay => SkiaBlendMode::Overlay,
        BlendMode::Darken => SkiaBlendMode::Darken,
        BlendMode::Lighten => SkiaBlendMode::Lighten,
        BlendMode::ColorDodge => SkiaBlendMode::ColorDodge,
        BlendMode::ColorBurn => SkiaBlendMode::ColorBurn,
        BlendMode::HardLight => SkiaBlendMode::HardLight,
        BlendMode::SoftLight => SkiaBlendMode::SoftLight,
        BlendMode::Difference => SkiaBlendMode::Difference,
        BlendMode::Exclusion => SkiaBlendMode::Exclusion,
        BlendMode::Hue => SkiaBlendMode::Hue,
        BlendMode::Saturation => SkiaBlendMode::Saturation,
        BlendMode::Color => SkiaBlendMode::Color,
        BlendMode::Luminosity => SkiaBlendMode::Luminosity,
    }
}

fn rgba_image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let mut rgba = image.as_raw().clone();
    premultiply_rgba_in_place(&mut rgba);
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    pixmap.data_mut().copy_from_slice(&rgba);
    Some(pixmap)
}

fn premultiply_rgba_in_place(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        for channel in &mut pixel[..3] {
            *channel = ((u16::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
}

fn unpremultiply_rgba_in_place(bytes: &mut [u8]) {
    for pixel in bytes.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        if alpha == 0 {
            pixel[..3].fill(0);
            continue;
        }
        for channel in &mut pixel[..3] {
            *channel = ((u16::from(*channel) * 255 + alpha / 2) / alpha).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn red_bitmap() -> DecodedBitmap {
        DecodedBitmap::new(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])))
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(matches!(
            PixmapSurface::new(0, 10),
            Err(RenderError::SurfaceAllocation { .. })
        ));
    }

    #[test]
    fn fill_rect_respects_scale_transform() {
        let mut surface = PixmapSurface::new(8, 8).unwrap();
        surface.scale(2.0, 2.0);
        surface.fill_rect(AssetBounds::new(0.0, 0.0, 2.0, 2.0), Color::BLACK);
        let image = surface.to_rgba_image();
        assert_eq!(image.get_pixel(3, 3).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(5, 5).0[3], 0);
    }

    #[test]
    fn draw_image_places_bitmap_in_rect() {
        let mut surface = PixmapSurface::new(8, 8).unwrap();
        surface.draw_image(&red_bitmap(), AssetBounds::new(2.0, 2.0, 4.0, 4.0));
        let image = surface.to_rgba_image();
        assert_eq!(image.get_pixel(3, 3).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(7, 7).0[3], 0);
    }

    #[test]
    fn global_alpha_scales_image_alpha_and_restore_resets_it() {
        let mut surface = PixmapSurface::new(4, 4).unwrap();
        surface.save();
        surface.set_global_alpha(0.5);
        surface.fill_rect(AssetBounds::new(0.0, 0.0, 4.0, 4.0), Color::BLACK);
        surface.restore();
        let alpha = surface.to_rgba_image().get_pixel(1, 1).0[3];
        assert!((126..=129).contains(&alpha), "alpha {alpha}");
        assert_eq!(surface.state.alpha, 1.0);
    }

    #[test]
    fn linear_gradient_runs_from_first_to_last_stop() {
        let mut surface = PixmapSurface::new(20, 2).unwrap();
        surface.fill_gradient(
            AssetBounds::new(0.0, 0.0, 20.0, 2.0),
            &GradientPaint {
                shape: GradientShape::Linear {
                    x0: 0.0,
                    y0: 0.0,
                    x1: 20.0,
                    y1: 0.0,
                },
                stops: vec![
                    crate::editor::ColorStop::new(Color::BLACK, 0.0),
                    crate::editor::ColorStop::new(Color::WHITE, 100.0),
                ],
            },
        );
        let image = surface.to_rgba_image();
        assert!(image.get_pixel(1, 1).0[0] < image.get_pixel(18, 1).0[0]);
    }

    #[test]
    fn filtered_pixmaps_are_cached_per_bitmap() {
        let mut surface = PixmapSurface::new(8, 8).unwrap();
        let bitmap = red_bitmap();
        surface.set_filter(&[FilterOp::Invert]);
        surface.draw_image(&bitmap, AssetBounds::new(0.0, 0.0, 4.0, 4.0));
        surface.draw_image(&bitmap, AssetBounds::new(0.0, 0.0, 4.0, 4.0));
        assert_eq!(surface.cache.len(), 1);
        assert_eq!(surface.to_rgba_image().get_pixel(1, 1).0, [0, 255, 255, 255]);

        surface.clear();
        surface.clear();
        assert_eq!(surface.cache.len(), 0);
    }

    #[test]
    fn png_encoding_keeps_dimensions() {
        let surface = PixmapSurface::new(5, 3).unwrap();
        let png = surface.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }
}

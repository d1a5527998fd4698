mod commands;
mod filters;
mod pipeline;
mod pixmap;
mod recording;
mod renderer;
mod surface;

use thiserror::Error;

pub use commands::{replay, DrawCommand};
pub use filters::{apply_filters, shadow_silhouette};
pub use pipeline::{asset_commands, hint_position, selection_commands, DecorationStyle, DELETE_HINT};
pub use pixmap::PixmapSurface;
pub use recording::RecordingSurface;
pub use renderer::{Renderer, Viewport};
pub use surface::{DrawingSurface, GradientPaint, GradientShape, TextStyle};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot allocate a {width}x{height} drawing surface")]
    SurfaceAllocation { width: u32, height: u32 },
    #[error("failed to encode raster: {0}")]
    Encode(#[from] image::ImageError),
}

pub mod assets;
pub mod config;
pub mod editor;
pub mod error;
pub mod export;
pub mod geometry;
pub mod input;
pub mod logging;
pub mod notification;
pub mod render;

pub use editor::CanvasSession;
pub use error::{CanvasError, CanvasResult};

/// Session for the user's configured canvas, with logging installed.
pub fn open_canvas() -> CanvasSession {
    logging::init();
    let config = config::load_canvas_config();
    tracing::info!(
        width = config.canvas_width,
        height = config.canvas_height,
        origin = %config.base_origin,
        "opening poster canvas"
    );
    CanvasSession::from_config(config)
}

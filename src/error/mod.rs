use crate::assets::AssetLoadError;
use crate::config::ConfigError;
use crate::editor::EffectError;
use crate::export::ExportError;
use crate::render::RenderError;
use thiserror::Error;

pub type CanvasResult<T> = std::result::Result<T, CanvasError>;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),
    #[error(transparent)]
    Effect(#[from] EffectError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("asset {0} is not on the canvas")]
    AssetNotFound(String),
}

//! Scene model, pointer interaction, effect parameters and undo history for the poster canvas.

pub mod effects;
pub mod history;
pub mod interaction;
pub mod model;
pub mod session;

pub use effects::{
    AdvancedGradientConfig, BlendMode, BorderEffect, ColorStop, DropShadow, EffectEdit,
    EffectError, EffectStack, FilterEffect, FilterOp, GradientArea, GradientKind, GradientTarget,
    OuterGlow, PreviewDimensions, ShadowSpec, SimpleGradient, TransformEffect,
};
pub use history::{fingerprint_scene, HistoryManager, SceneFingerprint};
pub use interaction::{CanvasCursor, Gesture, HitTarget, InteractionEngine, ResizeHandle};
pub use model::{AssetId, PlacedAsset, SceneModel, SourceRef};
pub use session::{CanvasSession, ContextMenu, SceneListener};

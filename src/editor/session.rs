use std::collections::HashSet;
use std::sync::Arc;

use super::effects::{
    AdvancedGradientConfig, ColorStop, EffectEdit, EffectError, EffectStack, GradientArea,
    GradientTarget, PreviewDimensions,
};
use super::history::HistoryManager;
use super::interaction::{
    fit_dropped_bounds, CanvasCursor, HitTarget, InteractionEngine, PointerDownOutcome,
};
use super::model::{AssetId, PlacedAsset, SceneModel, SourceRef};
use crate::assets::{
    AssetLoader, AssetPayload, BitmapCache, HttpFetcher, ImageFetcher, LoadCompletion,
    LoadPurpose, LocalFetcher,
};
use crate::config::CanvasConfig;
use crate::error::{CanvasError, CanvasResult};
use crate::export::{ExportedRaster, Exporter};
use crate::geometry::{CanvasPoint, CanvasSize};
use crate::input::{resolve_shortcut, InputContext, ShortcutAction, ShortcutKey, ShortcutModifiers};
use crate::notification::{DesktopNotifier, NotificationLevel, NotificationSink, TracingNotifier};
use crate::render::{DecorationStyle, DrawingSurface, Renderer, Viewport};

/// Called with the ordered asset list after every scene mutation.
pub type SceneListener = Box<dyn FnMut(&[PlacedAsset])>;

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    pub asset_id: AssetId,
    pub at: CanvasPoint,
}

/// One poster canvas: scene, gestures, history, bitmap loading, rendering and export wired
/// together. Everything runs on the owning thread; image decodes are pumped in via
/// [`CanvasSession::pump_loads`].
pub struct CanvasSession {
    config: CanvasConfig,
    scene: SceneModel,
    engine: InteractionEngine,
    history: HistoryManager,
    loader: AssetLoader,
    bitmaps: BitmapCache,
    renderer: Renderer,
    exporter: Exporter,
    notifier: Box<dyn NotificationSink>,
    listeners: Vec<SceneListener>,
    context_menu: Option<ContextMenu>,
    published_revision: u64,
}

impl CanvasSession {
    pub fn new(
        config: CanvasConfig,
        fetcher: Arc<dyn ImageFetcher>,
        notifier: Box<dyn NotificationSink>,
    ) -> Self {
        let canvas = config.canvas_size();
        let ratio = config.device_pixel_ratio();
        let scene = SceneModel::new(canvas);
        Self {
            engine: InteractionEngine::new(config.handle_size, config.min_asset_size),
            history: HistoryManager::new(scene.snapshot(), config.history_limit),
            loader: AssetLoader::new(config.base_origin.clone(), Arc::clone(&fetcher)),
            bitmaps: BitmapCache::new(),
            renderer: Renderer::new(
                Viewport::new(canvas, ratio),
                DecorationStyle::with_handle_size(config.handle_size),
            ),
            exporter: Exporter::new(fetcher, ratio),
            published_revision: scene.revision(),
            scene,
            notifier,
            listeners: Vec::new(),
            context_menu: None,
            config,
        }
    }

    /// Session with the fetcher and notifier the config asks for: assets come from `asset_dir`
    /// when it is set, otherwise over HTTP.
    pub fn from_config(config: CanvasConfig) -> Self {
        let local = LocalFetcher::new(config.base_origin.clone(), config.asset_dir.clone());
        let fetcher: Arc<dyn ImageFetcher> = if config.asset_dir.is_some() {
            Arc::new(local)
        } else {
            Arc::new(HttpFetcher::new(
                config.fetch_timeout(),
                config.max_fetch_bytes,
                local,
            ))
        };
        let notifier: Box<dyn NotificationSink> = if config.desktop_notifications {
            Box::new(DesktopNotifier::default())
        } else {
            Box::new(TracingNotifier)
        };
        Self::new(config, fetcher, notifier)
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneModel {
        &self.scene
    }

    pub fn assets(&self) -> &[PlacedAsset] {
        self.scene.assets()
    }

    pub fn bitmaps(&self) -> &BitmapCache {
        &self.bitmaps
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn context_menu(&self) -> Option<&ContextMenu> {
        self.context_menu.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loader.pending_count() > 0
    }

    pub fn needs_redraw(&self) -> bool {
        self.renderer.is_dirty()
    }

    pub fn subscribe(&mut self, listener: SceneListener) {
        self.listeners.push(listener);
    }

    /// Starts loading a dropped asset. It is placed once its bitmap decodes.
    pub fn drop_asset(&mut self, payload: AssetPayload, drop_point: CanvasPoint) -> AssetId {
        let asset_id = AssetId::generate(&payload.id);
        let url = self.loader.request(asset_id.clone(), payload, drop_point);
        tracing::debug!(asset = %asset_id, %url, "asset dropped");
        asset_id
    }

    /// Applies finished loads. Returns how many completed.
    pub fn pump_loads(&mut self) -> usize {
        let completions = self.loader.poll(&mut self.bitmaps);
        self.apply_completions(completions)
    }

    /// Blocks until every pending load has been applied.
    pub fn wait_for_loads(&mut self) -> usize {
        let completions = self.loader.wait_all(&mut self.bitmaps);
        self.apply_completions(completions)
    }

    fn apply_completions(&mut self, completions: Vec<LoadCompletion>) -> usize {
        let count = completions.len();
        for completion in completions {
            let LoadCompletion {
                asset_id,
                url,
                purpose,
                result,
            } = completion;
            match (purpose, result) {
                (
                    LoadPurpose::Place {
                        payload,
                        drop_point,
                    },
                    Ok((width, height)),
                ) => {
                    let bounds = fit_dropped_bounds(
                        width,
                        height,
                        drop_point,
                        self.config.max_drop_dimension,
                        self.scene.canvas(),
                    );
                    self.scene.append(PlacedAsset {
                        id: asset_id.clone(),
                        source: SourceRef {
                            id: payload.id,
                            kind: payload.kind,
                            data: payload.data,
                        },
                        bitmap_url: url,
                        bounds,
                        selected: true,
                        effects: None,
                    });
                    self.commit_history();
                    tracing::info!(asset = %asset_id, ?bounds, "asset placed");
                }
                (LoadPurpose::Place { payload, .. }, Err(err)) => {
                    tracing::warn!(asset = %asset_id, "placement abandoned: {err}");
                    self.notifier.notify(
                        &format!("Could not load {} asset: {err}", payload.kind.label()),
                        NotificationLevel::Error,
                    );
                }
                (LoadPurpose::Restore, Ok(_)) => {
                    if self.scene.get(&asset_id).is_none() {
                        self.bitmaps.release(&asset_id);
                    }
                    self.renderer.mark_dirty();
                }
                (LoadPurpose::Restore, Err(err)) => {
                    tracing::warn!(asset = %asset_id, "bitmap restore failed: {err}");
                }
            }
        }
        self.publish();
        count
    }

    pub fn pointer_down(&mut self, point: CanvasPoint) -> PointerDownOutcome {
        self.dismiss_context_menu();
        let outcome = self.engine.pointer_down(&mut self.scene, point);
        self.publish();
        outcome
    }

    pub fn pointer_move(&mut self, point: CanvasPoint) -> bool {
        let changed = self.engine.pointer_move(&mut self.scene, point);
        self.publish();
        changed
    }

    /// Ends the gesture and records one history entry if the geometry changed.
    pub fn pointer_up(&mut self) -> Option<AssetId> {
        let moved = self.engine.pointer_up(&self.scene);
        if moved.is_some() {
            self.commit_history();
        }
        self.publish();
        moved
    }

    pub fn cursor_at(&self, point: CanvasPoint) -> CanvasCursor {
        self.engine.cursor_at(&self.scene, point)
    }

    /// Right click. Opens the menu over an asset, selecting it; elsewhere just dismisses.
    pub fn open_context_menu(&mut self, point: CanvasPoint) -> Option<AssetId> {
        self.dismiss_context_menu();
        let asset_id = match self.engine.target_at(&self.scene, point) {
            HitTarget::Handle { asset_id, .. } | HitTarget::Body(asset_id) => asset_id,
            HitTarget::Empty => return None,
        };
        self.scene.set_selected(&asset_id);
        self.context_menu = Some(ContextMenu {
            asset_id: asset_id.clone(),
            at: point,
        });
        self.renderer.mark_dirty();
        self.publish();
        Some(asset_id)
    }

    pub fn dismiss_context_menu(&mut self) -> bool {
        let open = self.context_menu.take().is_some();
        if open {
            self.renderer.mark_dirty();
        }
        open
    }

    pub fn context_menu_delete(&mut self) -> Option<PlacedAsset> {
        let menu = self.context_menu.take()?;
        self.delete_asset(&menu.asset_id)
    }

    /// Resolves and runs a keyboard shortcut. Returns the action taken.
    pub fn handle_key(
        &mut self,
        key: ShortcutKey,
        modifiers: ShortcutModifiers,
    ) -> Option<ShortcutAction> {
        let context = InputContext {
            context_menu_open: self.context_menu.is_some(),
            gradient_area_active: self.scene.gradient_selection().is_some(),
            has_selection: self.scene.selected().is_some(),
        };
        let action = resolve_shortcut(key, modifiers, context)?;
        match action {
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::DeleteSelection => {
                self.delete_selected();
            }
            ShortcutAction::ClearSelection => {
                self.clear_selection();
            }
            ShortcutAction::DismissContextMenu => {
                self.dismiss_context_menu();
            }
            ShortcutAction::CancelGradientArea => {
                self.cancel_gradient_area();
            }
        }
        Some(action)
    }

    pub fn clear_selection(&mut self) -> bool {
        let changed = self.scene.clear_selection();
        self.publish();
        changed
    }

    pub fn delete_selected(&mut self) -> Option<PlacedAsset> {
        let asset_id = self.scene.selected_id()?;
        self.delete_asset(&asset_id)
    }

    /// Removes the asset and releases its bitmap.
    pub fn delete_asset(&mut self, asset_id: &AssetId) -> Option<PlacedAsset> {
        self.engine.cancel();
        if self
            .context_menu
            .as_ref()
            .is_some_and(|menu| &menu.asset_id == asset_id)
        {
            self.context_menu = None;
        }
        let removed = self.scene.remove(asset_id)?;
        self.bitmaps.release(asset_id);
        self.commit_history();
        tracing::info!(asset = %asset_id, "asset deleted");
        self.publish();
        Some(removed)
    }

    /// Removes every asset and its bitmap as one undoable step. Returns the number removed.
    pub fn clear_canvas(&mut self) -> usize {
        let removed = self.scene.len();
        if removed == 0 {
            return 0;
        }
        self.engine.cancel();
        self.context_menu = None;
        self.scene.clear();
        self.bitmaps.clear();
        self.commit_history();
        tracing::info!(removed, "canvas cleared");
        self.publish();
        removed
    }

    pub fn apply_effect(&mut self, asset_id: &AssetId, edit: EffectEdit) -> CanvasResult<()> {
        self.edit_effects(asset_id, |effects| effects.apply(edit))
    }

    pub fn apply_effect_to_selected(&mut self, edit: EffectEdit) -> CanvasResult<()> {
        let asset_id = self
            .scene
            .selected_id()
            .ok_or_else(|| CanvasError::AssetNotFound("<selection>".to_string()))?;
        self.apply_effect(&asset_id, edit)
    }

    pub fn add_gradient_stop(
        &mut self,
        asset_id: &AssetId,
        target: GradientTarget,
        stop: ColorStop,
    ) -> CanvasResult<()> {
        self.edit_effects(asset_id, |effects| {
            if target == GradientTarget::Advanced && effects.advanced_gradient.is_none() {
                effects.advanced_gradient = Some(AdvancedGradientConfig::default());
            }
            effects.add_stop(target, stop)
        })
    }

    /// Rejects removals below the two-stop floor with a notification.
    pub fn remove_gradient_stop(
        &mut self,
        asset_id: &AssetId,
        target: GradientTarget,
        index: usize,
    ) -> CanvasResult<ColorStop> {
        let mut removed = None;
        let result = self.edit_effects(asset_id, |effects| {
            removed = Some(effects.remove_stop(target, index)?);
            Ok(())
        });
        match result {
            Ok(()) => removed.ok_or_else(|| CanvasError::AssetNotFound(asset_id.to_string())),
            Err(CanvasError::Effect(err @ EffectError::GradientStopUnderflow)) => {
                self.notifier.notify(&err.to_string(), NotificationLevel::Warning);
                Err(err.into())
            }
            Err(err) => Err(err),
        }
    }

    fn edit_effects(
        &mut self,
        asset_id: &AssetId,
        edit: impl FnOnce(&mut EffectStack) -> Result<(), EffectError>,
    ) -> CanvasResult<()> {
        let asset = self
            .scene
            .get(asset_id)
            .ok_or_else(|| CanvasError::AssetNotFound(asset_id.to_string()))?;
        let mut effects = asset.effects.clone().unwrap_or_default();
        edit(&mut effects)?;
        let effects = (!effects.is_identity()).then_some(effects);
        self.scene.update_effects(asset_id, effects);
        self.commit_history();
        self.publish();
        Ok(())
    }

    pub fn begin_gradient_area(
        &mut self,
        asset_id: &AssetId,
        preview: PreviewDimensions,
        at: CanvasPoint,
    ) -> bool {
        self.scene.begin_gradient_area(asset_id, preview, at)
    }

    pub fn update_gradient_area(&mut self, at: CanvasPoint) -> Option<GradientArea> {
        self.scene.update_gradient_area(at)
    }

    /// Stores the dragged rectangle on the asset's advanced gradient, creating one if needed.
    /// Empty rectangles are discarded.
    pub fn commit_gradient_area(&mut self) -> CanvasResult<Option<GradientArea>> {
        let Some((asset_id, area, preview)) = self.scene.commit_gradient_area() else {
            return Ok(None);
        };
        self.edit_effects(&asset_id, |effects| {
            if effects.advanced_gradient.is_none() {
                effects.advanced_gradient = Some(AdvancedGradientConfig::default());
            }
            effects.apply(EffectEdit::GradientArea(Some(area), preview))
        })?;
        Ok(Some(area))
    }

    pub fn cancel_gradient_area(&mut self) -> bool {
        self.scene.cancel_gradient_area()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore_snapshot(snapshot);
                true
            }
            None => false,
        }
    }

    fn restore_snapshot(&mut self, snapshot: Vec<PlacedAsset>) {
        self.engine.cancel();
        self.context_menu = None;
        let before: Vec<AssetId> = self.scene.assets().iter().map(|a| a.id.clone()).collect();
        self.scene.replace(snapshot);

        let live: HashSet<&AssetId> = self.scene.assets().iter().map(|a| &a.id).collect();
        for asset_id in before.iter().filter(|id| !live.contains(id)) {
            self.bitmaps.release(asset_id);
        }
        let missing: Vec<(AssetId, String)> = self
            .scene
            .assets()
            .iter()
            .filter(|asset| !self.bitmaps.contains(&asset.id))
            .map(|asset| (asset.id.clone(), asset.bitmap_url.clone()))
            .collect();
        for (asset_id, url) in missing {
            self.loader.request_restore(asset_id, url);
        }
        self.publish();
    }

    /// Resizes the canvas and its display surface. Returns whether the backing surface must be
    /// reallocated.
    pub fn resize_canvas(&mut self, size: CanvasSize) -> bool {
        self.scene.set_canvas_size(size);
        let reallocate = self.renderer.resize(size);
        self.publish();
        reallocate
    }

    /// Applies to both the preview backing store and later exports.
    pub fn set_device_pixel_ratio(&mut self, ratio: f64) -> bool {
        let reallocate = self.renderer.set_device_pixel_ratio(ratio);
        self.exporter
            .set_device_pixel_ratio(self.renderer.viewport().device_pixel_ratio());
        reallocate
    }

    pub fn backing_size(&self) -> (u32, u32) {
        self.renderer.viewport().backing_size()
    }

    pub fn render(&mut self, surface: &mut dyn DrawingSurface) {
        self.renderer
            .render(surface, self.scene.assets(), &self.bitmaps);
    }

    pub fn export(&self) -> CanvasResult<ExportedRaster> {
        Ok(self.exporter.export(self.scene.assets())?)
    }

    fn commit_history(&mut self) {
        if self.history.push(self.scene.snapshot()) {
            tracing::debug!(
                entries = self.history.len(),
                index = self.history.current_index(),
                "history entry recorded"
            );
        }
    }

    fn publish(&mut self) {
        let revision = self.scene.revision();
        if revision == self.published_revision {
            return;
        }
        self.published_revision = revision;
        self.renderer.mark_dirty();
        for listener in &mut self.listeners {
            listener(self.scene.assets());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::assets::testing::png_bytes;
    use crate::assets::{AssetKind, StaticFetcher};
    use crate::geometry::{AssetBounds, Color};
    use crate::notification::testing::RecordingNotifier;
    use crate::render::{DrawCommand, PixmapSurface, RecordingSurface};

    const ORIGIN: &str = "https://cdn.example.test";

    fn session_with(notifier: RecordingNotifier) -> CanvasSession {
        let config = CanvasConfig {
            base_origin: ORIGIN.to_string(),
            ..CanvasConfig::default()
        };
        let fetcher = StaticFetcher::new()
            .with_image(
                format!("{ORIGIN}/posters/wide.png"),
                png_bytes(100, 50, [255, 0, 0, 255]),
            )
            .with_image(
                format!("{ORIGIN}/posters/logo.png"),
                png_bytes(400, 400, [0, 0, 255, 255]),
            );
        CanvasSession::new(config, Arc::new(fetcher), Box::new(notifier))
    }

    fn session() -> CanvasSession {
        session_with(RecordingNotifier::default())
    }

    fn payload(id: &str, src: &str) -> AssetPayload {
        AssetPayload {
            id: id.to_string(),
            src: src.to_string(),
            kind: AssetKind::AiImage,
            data: serde_json::json!({ "prompt": "sunset" }),
        }
    }

    fn place(session: &mut CanvasSession, src: &str, at: CanvasPoint) -> AssetId {
        let asset_id = session.drop_asset(payload("img-1", src), at);
        session.wait_for_loads();
        asset_id
    }

    #[test]
    fn dropped_asset_is_centered_selected_and_cached() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));

        let asset = session.scene().get(&asset_id).unwrap();
        assert_eq!(asset.bounds, AssetBounds::new(100.0, 125.0, 100.0, 50.0));
        assert!(asset.selected);
        assert_eq!(asset.bitmap_url, format!("{ORIGIN}/posters/wide.png"));
        assert_eq!(asset.source.data["prompt"], "sunset");
        assert!(session.bitmaps().contains(&asset_id));
        assert!(session.history().can_undo());
    }

    #[test]
    fn large_drop_is_scaled_to_fit_and_clamped() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/logo.png", CanvasPoint::new(10.0, 10.0));
        let bounds = session.scene().get(&asset_id).unwrap().bounds;
        assert_eq!(bounds, AssetBounds::new(0.0, 0.0, 200.0, 200.0));
    }

    #[test]
    fn failed_decode_notifies_and_leaves_scene_unchanged() {
        let notifier = RecordingNotifier::default();
        let mut session = session_with(notifier.clone());
        place(&mut session, "/posters/missing.png", CanvasPoint::new(50.0, 50.0));

        assert!(session.assets().is_empty());
        assert!(session.bitmaps().is_empty());
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, NotificationLevel::Error);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn second_drop_takes_over_selection() {
        let mut session = session();
        let first = place(&mut session, "/posters/wide.png", CanvasPoint::new(100.0, 100.0));
        let second = place(&mut session, "/posters/wide.png", CanvasPoint::new(400.0, 400.0));

        assert_eq!(session.scene().selected_id(), Some(second));
        assert!(!session.scene().get(&first).unwrap().selected);
        assert_eq!(session.bitmaps().len(), 2);
    }

    #[test]
    fn drag_gesture_moves_asset_and_records_one_entry() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        let entries = session.history().len();

        session.pointer_down(CanvasPoint::new(150.0, 150.0));
        assert_eq!(session.cursor_at(CanvasPoint::new(0.0, 0.0)), CanvasCursor::Move);
        session.pointer_move(CanvasPoint::new(170.0, 160.0));
        session.pointer_move(CanvasPoint::new(200.0, 180.0));
        assert_eq!(session.pointer_up(), Some(asset_id.clone()));

        assert_eq!(
            session.scene().get(&asset_id).unwrap().bounds,
            AssetBounds::new(150.0, 155.0, 100.0, 50.0)
        );
        assert_eq!(session.history().len(), entries + 1);
    }

    #[test]
    fn resize_from_bottom_right_keeps_origin() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/logo.png", CanvasPoint::new(50.0, 50.0));
        let bounds = session.scene().get(&asset_id).unwrap().bounds;
        assert_eq!(bounds, AssetBounds::new(0.0, 0.0, 200.0, 200.0));

        session.pointer_down(CanvasPoint::new(200.0, 200.0));
        assert_eq!(
            session.cursor_at(CanvasPoint::new(250.0, 250.0)),
            CanvasCursor::NwseResize
        );
        session.pointer_move(CanvasPoint::new(300.0, 300.0));
        session.pointer_up();

        assert_eq!(
            session.scene().get(&asset_id).unwrap().bounds,
            AssetBounds::new(0.0, 0.0, 300.0, 300.0)
        );
    }

    #[test]
    fn click_on_empty_canvas_clears_selection_without_history() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        let entries = session.history().len();

        let outcome = session.pointer_down(CanvasPoint::new(700.0, 500.0));
        assert!(outcome.selection_changed);
        assert_eq!(session.pointer_up(), None);
        assert!(!session.scene().get(&asset_id).unwrap().selected);
        assert_eq!(session.history().len(), entries);
    }

    #[test]
    fn delete_key_removes_selected_asset_and_its_bitmap() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));

        let action = session.handle_key(ShortcutKey::Delete, ShortcutModifiers::default());
        assert_eq!(action, Some(ShortcutAction::DeleteSelection));
        assert!(session.scene().get(&asset_id).is_none());
        assert!(!session.bitmaps().contains(&asset_id));
        assert_eq!(
            session.handle_key(ShortcutKey::Backspace, ShortcutModifiers::default()),
            None
        );
    }

    #[test]
    fn context_menu_deletes_target_and_any_click_dismisses_it() {
        let mut session = session();
        let first = place(&mut session, "/posters/wide.png", CanvasPoint::new(100.0, 100.0));
        let second = place(&mut session, "/posters/wide.png", CanvasPoint::new(400.0, 400.0));

        assert_eq!(
            session.open_context_menu(CanvasPoint::new(100.0, 100.0)),
            Some(first.clone())
        );
        assert_eq!(session.scene().selected_id(), Some(first.clone()));
        session.pointer_down(CanvasPoint::new(700.0, 20.0));
        assert!(session.context_menu().is_none());
        assert!(session.context_menu_delete().is_none());

        session.open_context_menu(CanvasPoint::new(400.0, 400.0));
        let removed = session.context_menu_delete().unwrap();
        assert_eq!(removed.id, second);
        assert_eq!(session.assets().len(), 1);
        assert!(!session.bitmaps().contains(&second));
    }

    #[test]
    fn escape_dismisses_menu_before_clearing_selection() {
        let mut session = session();
        place(&mut session, "/posters/wide.png", CanvasPoint::new(100.0, 100.0));
        session.open_context_menu(CanvasPoint::new(100.0, 100.0));

        assert_eq!(
            session.handle_key(ShortcutKey::Escape, ShortcutModifiers::default()),
            Some(ShortcutAction::DismissContextMenu)
        );
        assert!(session.scene().selected().is_some());
        assert_eq!(
            session.handle_key(ShortcutKey::Escape, ShortcutModifiers::default()),
            Some(ShortcutAction::ClearSelection)
        );
        assert!(session.scene().selected().is_none());
    }

    #[test]
    fn undo_and_redo_round_trip_a_deletion() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        let placed = session.assets().to_vec();
        session.delete_selected();

        let undo = ShortcutModifiers::new(true, false);
        assert_eq!(
            session.handle_key(ShortcutKey::Character('z'), undo),
            Some(ShortcutAction::Undo)
        );
        assert_eq!(session.assets(), placed.as_slice());
        session.wait_for_loads();
        assert!(session.bitmaps().contains(&asset_id));

        assert!(session.redo());
        assert!(session.assets().is_empty());
        assert!(!session.bitmaps().contains(&asset_id));
        assert!(!session.redo());
    }

    #[test]
    fn undo_to_empty_canvas_releases_bitmaps() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        assert!(session.undo());
        assert!(session.assets().is_empty());
        assert!(!session.bitmaps().contains(&asset_id));
        assert!(!session.undo());
    }

    #[test]
    fn new_edit_after_undo_discards_redo() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        session.apply_effect(&asset_id, EffectEdit::Rotation(45.0)).unwrap();
        session.undo();
        session.apply_effect(&asset_id, EffectEdit::Invert(true)).unwrap();

        assert!(!session.history().can_redo());
        let effects = session.scene().get(&asset_id).unwrap().effects.clone().unwrap();
        assert_eq!(effects.transform.rotation, 0.0);
        assert!(effects.filter.invert);
    }

    #[test]
    fn removing_a_stop_below_the_floor_is_rejected_with_a_notice() {
        let notifier = RecordingNotifier::default();
        let mut session = session_with(notifier.clone());
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        let entries = session.history().len();

        let result = session.remove_gradient_stop(&asset_id, GradientTarget::Simple, 0);
        assert!(matches!(
            result,
            Err(CanvasError::Effect(EffectError::GradientStopUnderflow))
        ));
        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(notifier.messages()[0].1, NotificationLevel::Warning);
        assert!(session.scene().get(&asset_id).unwrap().effects.is_none());
        assert_eq!(session.history().len(), entries);

        session
            .add_gradient_stop(
                &asset_id,
                GradientTarget::Simple,
                ColorStop::new(Color::WHITE, 50.0),
            )
            .unwrap();
        let removed = session
            .remove_gradient_stop(&asset_id, GradientTarget::Simple, 1)
            .unwrap();
        assert_eq!(removed.position, 50.0);
    }

    #[test]
    fn gradient_area_drag_lands_on_advanced_gradient() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        let preview = PreviewDimensions {
            width: 400.0,
            height: 240.0,
        };

        assert!(session.begin_gradient_area(&asset_id, preview, CanvasPoint::new(100.0, 40.0)));
        session.update_gradient_area(CanvasPoint::new(20.0, 200.0));
        let area = session.commit_gradient_area().unwrap().unwrap();
        assert_eq!(
            area,
            GradientArea {
                start_x: 20.0,
                start_y: 40.0,
                end_x: 100.0,
                end_y: 200.0,
            }
        );
        let config = session
            .scene()
            .get(&asset_id)
            .unwrap()
            .effects
            .clone()
            .unwrap()
            .advanced_gradient
            .unwrap();
        assert_eq!(config.area, Some(area));
        assert_eq!(config.preview_dimensions, preview);

        assert!(session.begin_gradient_area(&asset_id, preview, CanvasPoint::new(5.0, 5.0)));
        assert_eq!(session.commit_gradient_area().unwrap(), None);
    }

    #[test]
    fn listeners_receive_asset_list_on_mutation() {
        let mut session = session();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        session.subscribe(Box::new(move |assets: &[PlacedAsset]| {
            sink.borrow_mut().push(assets.len());
        }));

        place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        session.pointer_move(CanvasPoint::new(10.0, 10.0));
        session.delete_selected();
        assert_eq!(*seen.borrow(), vec![1, 0]);
    }

    #[test]
    fn render_decorates_only_the_selected_asset() {
        let mut session = session();
        place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        place(&mut session, "/posters/wide.png", CanvasPoint::new(400.0, 400.0));
        let (width, height) = session.backing_size();
        let mut surface = RecordingSurface::new(width, height);
        session.render(&mut surface);

        let images = surface
            .commands()
            .iter()
            .filter(|command| matches!(command, DrawCommand::DrawImage { .. }))
            .count();
        let hints = surface
            .commands()
            .iter()
            .filter(|command| matches!(command, DrawCommand::FillText { .. }))
            .count();
        assert_eq!(images, 2);
        assert_eq!(hints, 1);
        assert!(!session.needs_redraw());
    }

    #[test]
    fn export_crops_to_placed_assets() {
        let mut session = session();
        assert!(matches!(
            session.export(),
            Err(CanvasError::Export(crate::export::ExportError::EmptyCanvasExport))
        ));
        place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        let raster = session.export().unwrap();
        assert_eq!((raster.width, raster.height), (100, 50));
        assert!(raster.skipped.is_empty());
    }

    #[test]
    fn export_follows_runtime_pixel_ratio() {
        let mut session = session();
        place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        assert!(session.set_device_pixel_ratio(2.0));
        assert_eq!(session.backing_size(), (1600, 1200));

        let raster = session.export().unwrap();
        assert_eq!((raster.width, raster.height), (200, 100));
    }

    #[test]
    fn huge_blur_is_clamped_and_renders() {
        let mut session = session();
        let asset_id = place(&mut session, "/posters/wide.png", CanvasPoint::new(150.0, 150.0));
        session.apply_effect(&asset_id, EffectEdit::Blur(1.0e7)).unwrap();
        let effects = session.scene().get(&asset_id).unwrap().effects.clone().unwrap();
        assert_eq!(effects.filter.blur, crate::editor::effects::MAX_BLUR_PX);

        let (width, height) = session.backing_size();
        let mut surface = PixmapSurface::new(width, height).unwrap();
        session.render(&mut surface);
        assert_eq!(surface.to_rgba_image().dimensions(), (width, height));
    }

    #[test]
    fn clear_canvas_drops_assets_and_bitmaps_as_one_step() {
        let mut session = session();
        let first = place(&mut session, "/posters/wide.png", CanvasPoint::new(100.0, 100.0));
        place(&mut session, "/posters/logo.png", CanvasPoint::new(400.0, 400.0));
        let entries = session.history().len();

        assert_eq!(session.clear_canvas(), 2);
        assert!(session.assets().is_empty());
        assert!(session.bitmaps().is_empty());
        assert_eq!(session.history().len(), entries + 1);
        assert_eq!(session.clear_canvas(), 0);

        assert!(session.undo());
        assert_eq!(session.assets().len(), 2);
        session.wait_for_loads();
        assert!(session.bitmaps().contains(&first));
        assert_eq!(session.bitmaps().len(), 2);
    }
}

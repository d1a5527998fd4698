use std::sync::mpsc;
use std::sync::Arc;

use super::{resolve_url, AssetLoadError, AssetPayload, BitmapCache, DecodedBitmap, ImageFetcher};
use crate::editor::AssetId;
use crate::geometry::CanvasPoint;

/// Why a bitmap was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadPurpose {
    /// A drop from the asset picker; success appends a new asset.
    Place {
        payload: AssetPayload,
        drop_point: CanvasPoint,
    },
    /// Re-decoding the bitmap of an asset that came back through undo/redo.
    Restore,
}

/// Result of one finished load, as drained by [`AssetLoader::poll`].
#[derive(Debug)]
pub struct LoadCompletion {
    pub asset_id: AssetId,
    pub url: String,
    pub purpose: LoadPurpose,
    /// Natural bitmap size on success. The bitmap itself is already in the cache.
    pub result: Result<(u32, u32), AssetLoadError>,
}

struct PendingLoad {
    asset_id: AssetId,
    url: String,
    purpose: LoadPurpose,
    receiver: mpsc::Receiver<Result<DecodedBitmap, AssetLoadError>>,
}

/// Runs fetch+decode on worker threads. Results are only observed through [`AssetLoader::poll`],
/// so the cache and scene stay on the owning thread. Dropping the loader discards pending results.
pub struct AssetLoader {
    base_origin: String,
    fetcher: Arc<dyn ImageFetcher>,
    pending: Vec<PendingLoad>,
}

impl AssetLoader {
    pub fn new(base_origin: impl Into<String>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            base_origin: base_origin.into(),
            fetcher,
            pending: Vec::new(),
        }
    }

    pub fn resolve(&self, src: &str) -> String {
        resolve_url(&self.base_origin, src)
    }

    pub fn fetcher(&self) -> Arc<dyn ImageFetcher> {
        Arc::clone(&self.fetcher)
    }

    /// Starts a placement load for a dropped payload. Returns the resolved URL.
    pub fn request(
        &mut self,
        asset_id: AssetId,
        payload: AssetPayload,
        drop_point: CanvasPoint,
    ) -> String {
        let url = self.resolve(&payload.src);
        self.spawn(
            asset_id,
            url.clone(),
            LoadPurpose::Place {
                payload,
                drop_point,
            },
        );
        url
    }

    /// Starts a restore load for an already-placed asset.
    pub fn request_restore(&mut self, asset_id: AssetId, url: String) {
        if self.is_pending(&asset_id) {
            return;
        }
        self.spawn(asset_id, url, LoadPurpose::Restore);
    }

    pub fn is_pending(&self, asset_id: &AssetId) -> bool {
        self.pending.iter().any(|load| &load.asset_id == asset_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn spawn(&mut self, asset_id: AssetId, url: String, purpose: LoadPurpose) {
        let (tx, rx) = mpsc::channel();
        let fetcher = Arc::clone(&self.fetcher);
        let worker_url = url.clone();
        std::thread::spawn(move || {
            let result = fetcher
                .fetch(&worker_url)
                .and_then(|bytes| DecodedBitmap::decode(&worker_url, &bytes));
            let _ = tx.send(result);
        });
        tracing::debug!(asset = %asset_id, %url, "image load started");
        self.pending.push(PendingLoad {
            asset_id,
            url,
            purpose,
            receiver: rx,
        });
    }

    /// Drains finished loads without blocking, in completion order.
    pub fn poll(&mut self, cache: &mut BitmapCache) -> Vec<LoadCompletion> {
        let mut completions = Vec::new();
        let mut still_pending = Vec::with_capacity(self.pending.len());
        for load in self.pending.drain(..) {
            match load.receiver.try_recv() {
                Ok(result) => completions.push(finish(load, result, cache)),
                Err(mpsc::TryRecvError::Empty) => still_pending.push(load),
                Err(mpsc::TryRecvError::Disconnected) => {
                    let url = load.url.clone();
                    completions.push(finish(load, Err(AssetLoadError::WorkerGone { url }), cache));
                }
            }
        }
        self.pending = still_pending;
        completions
    }

    /// Blocks until every pending load has finished.
    pub fn wait_all(&mut self, cache: &mut BitmapCache) -> Vec<LoadCompletion> {
        self.pending
            .drain(..)
            .map(|load| {
                let result = load.receiver.recv().unwrap_or_else(|_| {
                    Err(AssetLoadError::WorkerGone {
                        url: load.url.clone(),
                    })
                });
                finish(load, result, cache)
            })
            .collect()
    }
}

fn finish(
    load: PendingLoad,
    result: Result<DecodedBitmap, AssetLoadError>,
    cache: &mut BitmapCache,
) -> LoadCompletion {
    let result = result.map(|bitmap| {
        let size = (bitmap.width(), bitmap.height());
        cache.insert(load.asset_id.clone(), bitmap);
        size
    });
    if let Err(err) = &result {
        tracing::warn!(asset = %load.asset_id, url = %load.url, %err, "image load failed");
    }
    LoadCompletion {
        asset_id: load.asset_id,
        url: load.url,
        purpose: load.purpose,
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::png_bytes;
    use crate::assets::{AssetKind, StaticFetcher};

    fn payload(src: &str) -> AssetPayload {
        AssetPayload {
            id: "img-1".to_string(),
            src: src.to_string(),
            kind: AssetKind::AiImage,
            data: serde_json::Value::Null,
        }
    }

    fn loader() -> AssetLoader {
        let fetcher = StaticFetcher::new()
            .with_image("https://cdn.example/a.png", png_bytes(40, 20, [9, 9, 9, 255]));
        AssetLoader::new("https://cdn.example", Arc::new(fetcher))
    }

    #[test]
    fn successful_load_inserts_bitmap_under_asset_id() {
        let mut loader = loader();
        let mut cache = BitmapCache::new();
        let id = AssetId::from("img-1-1");
        let url = loader.request(id.clone(), payload("/a.png"), CanvasPoint::new(5.0, 5.0));
        assert_eq!(url, "https://cdn.example/a.png");

        let completions = loader.wait_all(&mut cache);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].result.as_ref().unwrap(), &(40, 20));
        assert!(cache.contains(&id));
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn failed_load_leaves_cache_untouched() {
        let mut loader = loader();
        let mut cache = BitmapCache::new();
        loader.request(AssetId::from("x"), payload("/missing.png"), CanvasPoint::default());

        let completions = loader.wait_all(&mut cache);
        assert!(completions[0].result.is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn restore_requests_are_not_duplicated_while_pending() {
        let mut loader = loader();
        let id = AssetId::from("img-1-1");
        loader.request_restore(id.clone(), "https://cdn.example/a.png".to_string());
        loader.request_restore(id.clone(), "https://cdn.example/a.png".to_string());
        assert_eq!(loader.pending_count(), 1);

        let mut cache = BitmapCache::new();
        let completions = loader.wait_all(&mut cache);
        assert_eq!(completions[0].purpose, LoadPurpose::Restore);
        assert!(cache.contains(&id));
    }

    #[test]
    fn poll_eventually_drains_completed_loads() {
        let mut loader = loader();
        let mut cache = BitmapCache::new();
        loader.request(AssetId::from("a"), payload("/a.png"), CanvasPoint::default());

        let mut drained = Vec::new();
        for _ in 0..200 {
            drained.extend(loader.poll(&mut cache));
            if !drained.is_empty() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(drained.len(), 1);
        assert_eq!(loader.pending_count(), 0);
    }
}

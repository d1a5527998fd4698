//! Asset loading: payloads from the asset picker, URL resolution, fetching and decoding.

pub mod data_url;
mod fetch;
mod loader;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::AssetId;

pub use fetch::{HttpFetcher, ImageFetcher, LocalFetcher, StaticFetcher};
pub use loader::{AssetLoader, LoadCompletion, LoadPurpose};

#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("no route to fetch {url}")]
    Unreachable { url: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{url} exceeds the {limit} byte download limit")]
    TooLarge { url: String, limit: u64 },
    #[error("malformed data url: {reason}")]
    InvalidDataUrl { reason: String },
    #[error("failed to decode image from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image {url} has zero size")]
    EmptyImage { url: String },
    #[error("load worker for {url} exited without a result")]
    WorkerGone { url: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    AiImage,
    TitleLogo,
    Tagline,
}

impl AssetKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AiImage => "ai-image",
            Self::TitleLogo => "title-logo",
            Self::Tagline => "tagline",
        }
    }
}

/// Drag payload reported by the asset picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPayload {
    pub id: String,
    pub src: String,
    pub kind: AssetKind,
    #[serde(default)]
    pub data: serde_json::Value,
}

static NEXT_BITMAP_KEY: AtomicU64 = AtomicU64::new(1);

/// Decoded RGBA pixels. Cloning shares the pixel buffer; equality is buffer identity.
#[derive(Clone)]
pub struct DecodedBitmap {
    key: u64,
    image: Arc<RgbaImage>,
}

impl fmt::Debug for DecodedBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedBitmap")
            .field("key", &self.key)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for DecodedBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl DecodedBitmap {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            key: NEXT_BITMAP_KEY.fetch_add(1, Ordering::Relaxed),
            image: Arc::new(image),
        }
    }

    pub fn decode(url: &str, bytes: &[u8]) -> Result<Self, AssetLoadError> {
        let image = image::load_from_memory(bytes)
            .map_err(|source| AssetLoadError::Decode {
                url: url.to_string(),
                source,
            })?
            .to_rgba8();
        if image.width() == 0 || image.height() == 0 {
            return Err(AssetLoadError::EmptyImage {
                url: url.to_string(),
            });
        }
        Ok(Self::new(image))
    }

    /// Identity of the pixel buffer, stable across clones. Used as a cache key by surfaces.
    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Decoded bitmaps keyed by placed-asset id, so one source image placed twice has two entries.
#[derive(Debug, Default, Clone)]
pub struct BitmapCache {
    entries: HashMap<AssetId, DecodedBitmap>,
}

impl BitmapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &AssetId) -> Option<&DecodedBitmap> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, id: AssetId, bitmap: DecodedBitmap) {
        self.entries.insert(id, bitmap);
    }

    pub(crate) fn release(&mut self, id: &AssetId) -> Option<DecodedBitmap> {
        self.entries.remove(id)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Resolves `src` against `base_origin`. Absolute, protocol-relative, `data:`, `blob:` and
/// `file:` references pass through unchanged.
pub fn resolve_url(base_origin: &str, src: &str) -> String {
    let src = src.trim();
    const PASS_THROUGH: [&str; 5] = ["http://", "https://", "data:", "blob:", "file://"];
    if PASS_THROUGH.iter().any(|prefix| src.starts_with(prefix)) {
        return src.to_string();
    }

    let base = base_origin.trim_end_matches('/');
    if let Some(rest) = src.strip_prefix("//") {
        let scheme = base.split_once("://").map_or("https", |(scheme, _)| scheme);
        return format!("{scheme}://{rest}");
    }
    if src.starts_with('/') {
        format!("{base}{src}")
    } else {
        format!("{base}/{src}")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_url_joins_root_relative_paths_to_origin() {
        assert_eq!(
            resolve_url("https://cdn.example/", "/media/poster.png"),
            "https://cdn.example/media/poster.png"
        );
        assert_eq!(
            resolve_url("https://cdn.example", "media/poster.png"),
            "https://cdn.example/media/poster.png"
        );
    }

    #[test]
    fn resolve_url_keeps_absolute_references() {
        for src in [
            "https://other.example/a.png",
            "data:image/png;base64,AAAA",
            "file:///tmp/a.png",
        ] {
            assert_eq!(resolve_url("https://cdn.example", src), src);
        }
        assert_eq!(
            resolve_url("http://cdn.example", "//img.example/a.png"),
            "http://img.example/a.png"
        );
    }

    #[test]
    fn payload_deserializes_picker_json() {
        let payload: AssetPayload = serde_json::from_str(
            r#"{"id":"logo-7","src":"/media/logo.png","kind":"title-logo","data":{"dialect":"bhojpuri"}}"#,
        )
        .unwrap();
        assert_eq!(payload.kind, AssetKind::TitleLogo);
        assert_eq!(payload.data["dialect"], "bhojpuri");
    }

    #[test]
    fn decode_rejects_garbage_bytes() {
        let err = DecodedBitmap::decode("mem://bad", b"not an image").unwrap_err();
        assert!(matches!(err, AssetLoadError::Decode { .. }));
    }

    #[test]
    fn decoded_bitmap_clones_share_key() {
        let bytes = testing::png_bytes(4, 2, [255, 0, 0, 255]);
        let bitmap = DecodedBitmap::decode("mem://red", &bytes).unwrap();
        let clone = bitmap.clone();
        assert_eq!(bitmap.key(), clone.key());
        assert_eq!((clone.width(), clone.height()), (4, 2));
    }
}

use std::collections::HashMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use super::{data_url, AssetLoadError};

/// Source of raw image bytes for a resolved URL. Implementations run on load worker threads.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetLoadError>;
}

/// Serves `data:` URLs, `file://` URLs and URLs under `base_origin` mapped onto `asset_dir`.
#[derive(Debug, Clone)]
pub struct LocalFetcher {
    base_origin: String,
    asset_dir: Option<PathBuf>,
}

impl LocalFetcher {
    pub fn new(base_origin: impl Into<String>, asset_dir: Option<PathBuf>) -> Self {
        Self {
            base_origin: base_origin.into().trim_end_matches('/').to_string(),
            asset_dir,
        }
    }

    fn origin_path(&self, url: &str) -> Option<PathBuf> {
        let dir = self.asset_dir.as_ref()?;
        let rest = url.strip_prefix(&self.base_origin)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(rest.trim_start_matches('/'));
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        Some(dir.join(relative))
    }
}

impl ImageFetcher for LocalFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetLoadError> {
        if url.starts_with("data:") {
            return data_url::decode(url);
        }
        let path = match url.strip_prefix("file://") {
            Some(path) => PathBuf::from(path),
            None => self
                .origin_path(url)
                .ok_or_else(|| AssetLoadError::Unreachable {
                    url: url.to_string(),
                })?,
        };
        std::fs::read(&path).map_err(|source| AssetLoadError::Io { path, source })
    }
}

/// Fetches `http(s)` URLs with a blocking agent and hands every other scheme to a
/// [`LocalFetcher`]. Blocking is fine here: fetches run on load worker threads.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    max_bytes: u64,
    fallback: LocalFetcher,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64, fallback: LocalFetcher) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("poster-canvas/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            max_bytes,
            fallback,
        }
    }

    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, AssetLoadError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|source| AssetLoadError::Http {
                url: url.to_string(),
                source: Box::new(source),
            })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|source| AssetLoadError::Body {
                url: url.to_string(),
                source,
            })?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(AssetLoadError::TooLarge {
                url: url.to_string(),
                limit: self.max_bytes,
            });
        }
        tracing::debug!(%url, bytes = bytes.len(), "asset fetched");
        Ok(bytes)
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetLoadError> {
        if is_http(url) {
            self.fetch_remote(url)
        } else {
            self.fallback.fetch(url)
        }
    }
}

fn is_http(url: &str) -> bool {
    let scheme = url.split_once("://").map(|(scheme, _)| scheme);
    matches!(scheme, Some(s) if s.eq_ignore_ascii_case("http") || s.eq_ignore_ascii_case("https"))
}

/// In-memory URL table. Useful for hosts that prefetch assets and for tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.images.insert(url.into(), bytes);
        self
    }
}

impl ImageFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetLoadError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| AssetLoadError::Unreachable {
                url: url.to_string(),
            })
    }
}

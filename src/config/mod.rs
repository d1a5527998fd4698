use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::geometry::CanvasSize;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    MissingHomeDirectory,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

const APP_DIR: &str = "poster-canvas";
const APP_CONFIG_FILE: &str = "config.json";
const CONFIG_PATH_VAR: &str = "POSTER_CANVAS_CONFIG";

/// Canvas settings from `config.json`. Every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Origin that root-relative asset paths are resolved against.
    pub base_origin: String,
    /// Local directory that mirrors `base_origin`. When unset, assets are fetched over HTTP.
    pub asset_dir: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
    /// Responses larger than this are rejected before decoding.
    pub max_fetch_bytes: u64,
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub device_pixel_ratio: f64,
    /// Dropped images are scaled down to fit a square of this side.
    pub max_drop_dimension: f64,
    pub min_asset_size: f64,
    pub handle_size: f64,
    pub history_limit: usize,
    pub desktop_notifications: bool,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_origin: "http://localhost:8000".to_string(),
            asset_dir: None,
            fetch_timeout_secs: 20,
            max_fetch_bytes: 32 * 1024 * 1024,
            canvas_width: 800.0,
            canvas_height: 600.0,
            device_pixel_ratio: 1.0,
            max_drop_dimension: 200.0,
            min_asset_size: 20.0,
            handle_size: 8.0,
            history_limit: 100,
            desktop_notifications: false,
        }
    }
}

impl CanvasConfig {
    pub fn canvas_size(&self) -> CanvasSize {
        CanvasSize::new(self.canvas_width.max(1.0), self.canvas_height.max(1.0))
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

pub fn load_canvas_config() -> CanvasConfig {
    load_canvas_config_from(&ConfigLocation::from_env())
}

fn load_canvas_config_from(location: &ConfigLocation) -> CanvasConfig {
    let path = match location.resolve() {
        Ok(path) => path,
        Err(err) => {
            tracing::debug!(%err, "no config location, using defaults");
            return CanvasConfig::default();
        }
    };
    if !path.exists() {
        if location.explicit.is_some() {
            tracing::warn!(path = %path.display(), "configured canvas config file is missing");
        }
        return CanvasConfig::default();
    }
    CanvasConfig::load_from_path(&path).unwrap_or_else(|err| {
        tracing::warn!(%err, "using default canvas config");
        CanvasConfig::default()
    })
}

/// Where `config.json` is looked up: `POSTER_CANVAS_CONFIG` when set, otherwise the XDG
/// config directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ConfigLocation {
    explicit: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl ConfigLocation {
    fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var_os(name)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        };
        Self {
            explicit: var(CONFIG_PATH_VAR),
            xdg_config_home: var("XDG_CONFIG_HOME"),
            home: var("HOME"),
        }
    }

    fn resolve(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        let root = match (&self.xdg_config_home, &self.home) {
            (Some(xdg), _) => xdg.clone(),
            (None, Some(home)) => home.join(".config"),
            (None, None) => return Err(ConfigError::MissingHomeDirectory),
        };
        Ok(root.join(APP_DIR).join(APP_CONFIG_FILE))
    }
}

//! Configuration management.
//!
//! Config is stored at `<config_dir>/firemap/config.toml`. Every section and
//! field is optional; a missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::extract::DEFAULT_CONTEXT_WINDOW;

const CONFIG_DIR: &str = "firemap";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub geocoding: GeocodingConfig,
    pub map: MapConfig,
    pub batch: BatchConfig,
    pub planning: PlanningConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Width of the context window attached to each candidate, in characters.
    pub context_window: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// Place-search endpoint (Nominatim-compatible).
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub result_limit: u32,
    /// Query suffixes tried in order; "" is the bare name.
    pub fallback_suffixes: Vec<String>,
    pub cache: bool,
    /// Overrides `~/.firemap/geocache.json`.
    pub cache_path: Option<PathBuf>,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".into(),
            user_agent: concat!("firemap/", env!("CARGO_PKG_VERSION"), " (wildfire-annotator)").into(),
            timeout_secs: 10,
            result_limit: 1,
            fallback_suffixes: crate::location::DEFAULT_FALLBACK_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cache: true,
            cache_path: None,
        }
    }
}

impl GeocodingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub tile_url: String,
    pub attribution: String,
    /// `[lat, lng]` of the default world view.
    pub default_center: [f64; 2],
    pub default_zoom: u8,
    /// Zoom used when focusing a marker.
    pub focus_zoom: u8,
    /// Duration of the fly-to camera transition.
    pub fly_duration_ms: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            attribution: "&copy; OpenStreetMap contributors".into(),
            default_center: [20.0, 0.0],
            default_zoom: 3,
            focus_zoom: 10,
            fly_duration_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Pause between placements of one response.
    pub delay_ms: u64,
    /// `clear()` suppresses placements still pending in a running batch.
    pub clear_cancels_pending: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: 1000,
            clear_cancels_pending: true,
        }
    }
}

impl BatchConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    pub endpoint: String,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:5000/plan".into(),
        }
    }
}

impl Config {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from a specific file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(io_err)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }
}

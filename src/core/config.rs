//! Map and tile loader configuration.
//!
//! Both records deserialize from JSON with every field optional; missing
//! fields take the values of the `Default` preset.

use crate::core::constants::{DEFAULT_MARGIN_TILES, DEFAULT_REQUEST_TIMEOUT_MS, USER_AGENT};
use crate::core::geo::LatLng;
use crate::tiles::cache::{default_cache_dir, DiskCache};
use crate::tiles::source::TileServerConfig;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the HTTP tile fetcher and its disk cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoaderConfig {
    pub user_agent: String,
    pub request_timeout_ms: u64,
    /// Overrides the per-user cache directory
    pub cache_dir: Option<PathBuf>,
}

impl TileLoaderConfig {
    /// Short timeout and a cache under the system temp directory
    pub fn for_testing() -> Self {
        Self {
            user_agent: format!("{} (test)", USER_AGENT),
            request_timeout_ms: 2_000,
            cache_dir: Some(std::env::temp_dir().join("mapview-test-cache")),
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn cache(&self) -> DiskCache {
        DiskCache::new(self.cache_dir())
    }
}

impl Default for TileLoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache_dir: None,
        }
    }
}

/// Everything needed to bring up a [`crate::Map`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Initial centre of the view
    pub center: LatLng,
    pub zoom: u8,
    /// Canvas size in pixels
    pub size: (u32, u32),
    /// Extra ring of tiles fetched around the visible area
    pub margin_tiles: u32,
    pub tile_server: TileServerConfig,
    pub loader: TileLoaderConfig,
}

impl MapConfig {
    pub fn new(center: LatLng, zoom: u8, size: (u32, u32)) -> Self {
        Self {
            center,
            zoom,
            size,
            ..Default::default()
        }
    }

    pub fn with_tile_server(mut self, server: TileServerConfig) -> Self {
        self.tile_server = server;
        self
    }

    pub fn with_loader(mut self, loader: TileLoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_margin(mut self, margin_tiles: u32) -> Self {
        self.margin_tiles = margin_tiles;
        self
    }

    /// Parses and validates a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("loading map configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.tile_server.validate()?;
        if !self.center.is_valid() {
            return Err(MapError::InvalidConfig(format!(
                "center ({}, {}) is outside the map",
                self.center.lat, self.center.lng
            )));
        }
        if self.zoom > self.tile_server.max_zoom {
            return Err(MapError::InvalidConfig(format!(
                "zoom {} exceeds the maximum zoom {} of '{}'",
                self.zoom, self.tile_server.max_zoom, self.tile_server.name
            )));
        }
        if self.size.0 == 0 || self.size.1 == 0 {
            return Err(MapError::InvalidConfig(format!(
                "canvas size {}x{} is empty",
                self.size.0, self.size.1
            )));
        }
        Ok(())
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: LatLng::default(),
            zoom: 2,
            size: (800, 600),
            margin_tiles: DEFAULT_MARGIN_TILES,
            tile_server: TileServerConfig::default(),
            loader: TileLoaderConfig::default(),
        }
    }
}

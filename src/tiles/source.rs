use crate::core::constants::{DEFAULT_MAX_ZOOM, MAX_SUPPORTED_ZOOM, TILE_SIZE};
use crate::core::geo::TileCoord;
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Trait representing anything that can produce tile URLs for a given coordinate.
pub trait TileSource: Send + Sync {
    /// Build a URL for the requested `coord`.
    fn url(&self, coord: TileCoord) -> String;

    /// Pixel size of one tile
    fn tile_size(&self) -> (u32, u32) {
        (TILE_SIZE, TILE_SIZE)
    }

    /// Deepest zoom level the source serves
    fn max_zoom(&self) -> u8 {
        DEFAULT_MAX_ZOOM
    }
}

/// Static description of a raster tile server.
///
/// Created once at configuration time and shared read-only (behind an `Arc`)
/// by every tile that references it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileServerConfig {
    pub name: String,
    /// URL with `{subdomain}`, `{x}`, `{y}` and `{z}` placeholders
    pub url_template: String,
    pub subdomains: Vec<String>,
    /// Maximum number of concurrent downloads against this server
    #[serde(default = "default_thread_limit")]
    pub thread_limit: usize,
    #[serde(default = "default_tile_size")]
    pub tile_size: (u32, u32),
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    #[serde(default)]
    pub attribution: String,
}

fn default_thread_limit() -> usize {
    1
}

fn default_tile_size() -> (u32, u32) {
    (TILE_SIZE, TILE_SIZE)
}

fn default_max_zoom() -> u8 {
    DEFAULT_MAX_ZOOM
}

impl TileServerConfig {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>, subdomains: &[&str]) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            subdomains: subdomains.iter().map(|s| s.to_string()).collect(),
            thread_limit: default_thread_limit(),
            tile_size: default_tile_size(),
            max_zoom: default_max_zoom(),
            attribution: String::new(),
        }
    }

    pub fn with_thread_limit(mut self, thread_limit: usize) -> Self {
        self.thread_limit = thread_limit;
        self
    }

    pub fn with_tile_size(mut self, width: u32, height: u32) -> Self {
        self.tile_size = (width, height);
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    /// The standard OpenStreetMap tile servers
    pub fn openstreetmap() -> Self {
        Self::new(
            "OpenStreetMap",
            "https://{subdomain}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            &["a", "b", "c"],
        )
        .with_thread_limit(2)
        .with_max_zoom(19)
        .with_attribution("© OpenStreetMap contributors")
    }

    /// OpenTopoMap topographic tiles
    pub fn opentopomap() -> Self {
        Self::new(
            "OpenTopoMap",
            "https://{subdomain}.tile.opentopomap.org/{z}/{x}/{y}.png",
            &["a", "b", "c"],
        )
        .with_thread_limit(2)
        .with_max_zoom(17)
        .with_attribution("© OpenStreetMap contributors, SRTM | © OpenTopoMap (CC-BY-SA)")
    }

    /// Subdomain used for every request. Always the first entry; requests are
    /// not spread across subdomains.
    pub fn subdomain(&self) -> &str {
        self.subdomains.first().map(String::as_str).unwrap_or("")
    }

    /// File extension of the served images, taken from the URL template.
    pub fn file_extension(&self) -> &str {
        self.url_template
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("png")
    }

    /// Rejects descriptors that cannot address tiles.
    pub fn validate(&self) -> Result<()> {
        if self.subdomains.is_empty() {
            return Err(MapError::InvalidConfig(format!(
                "tile server '{}' has no subdomains",
                self.name
            )));
        }
        if self.thread_limit == 0 {
            return Err(MapError::InvalidConfig(format!(
                "tile server '{}' needs a thread limit of at least 1",
                self.name
            )));
        }
        if self.tile_size.0 == 0 || self.tile_size.1 == 0 {
            return Err(MapError::InvalidConfig(format!(
                "tile server '{}' has an empty tile size",
                self.name
            )));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(MapError::InvalidConfig(format!(
                "tile server '{}' declares max zoom {}, at most {} is supported",
                self.name, self.max_zoom, MAX_SUPPORTED_ZOOM
            )));
        }
        for placeholder in ["{x}", "{y}", "{z}"] {
            if !self.url_template.contains(placeholder) {
                return Err(MapError::InvalidConfig(format!(
                    "url template '{}' is missing {}",
                    self.url_template, placeholder
                )));
            }
        }
        Ok(())
    }
}

impl Default for TileServerConfig {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

impl TileSource for TileServerConfig {
    fn url(&self, coord: TileCoord) -> String {
        self.url_template
            .replace("{subdomain}", self.subdomain())
            .replace("{x}", &coord.x.to_string())
            .replace("{y}", &coord.y.to_string())
            .replace("{z}", &coord.z.to_string())
    }

    fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_uses_first_subdomain() {
        let server = TileServerConfig::new(
            "test provider",
            "http://{subdomain}.tile.test_provider.org/{z}/{x}/{y}.png",
            &["a", "b"],
        );
        assert_eq!(
            server.url(TileCoord::new(2331, 1185, 12)),
            "http://a.tile.test_provider.org/12/2331/1185.png"
        );
        // No rotation between calls or between tiles
        assert_eq!(
            server.url(TileCoord::new(2332, 1186, 12)),
            "http://a.tile.test_provider.org/12/2332/1186.png"
        );
    }

    #[test]
    fn test_osm_preset() {
        let osm = TileServerConfig::openstreetmap();
        assert_eq!(osm.thread_limit, 2);
        assert_eq!(osm.tile_size, (256, 256));
        assert_eq!(osm.file_extension(), "png");
        assert!(osm.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_broken_servers() {
        let no_subdomains = TileServerConfig::new("x", "http://{subdomain}/{z}/{x}/{y}.png", &[]);
        assert!(matches!(no_subdomains.validate(), Err(MapError::InvalidConfig(_))));

        let no_z = TileServerConfig::new("x", "http://{subdomain}/{x}/{y}.png", &["a"]);
        assert!(no_z.validate().is_err());

        let no_threads = TileServerConfig::openstreetmap().with_thread_limit(0);
        assert!(no_threads.validate().is_err());
    }

    #[test]
    fn test_validate_caps_max_zoom() {
        assert!(TileServerConfig::openstreetmap().with_max_zoom(31).validate().is_ok());
        for max_zoom in [32, 40, u8::MAX] {
            let server = TileServerConfig::openstreetmap().with_max_zoom(max_zoom);
            assert!(matches!(server.validate(), Err(MapError::InvalidConfig(_))));
        }

        let json = r#"{
            "name": "deep",
            "url_template": "https://{subdomain}.example.org/{z}/{x}/{y}.png",
            "subdomains": ["tiles"],
            "max_zoom": 40
        }"#;
        let server: TileServerConfig = serde_json::from_str(json).unwrap();
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_file_extension_fallback() {
        let server = TileServerConfig::new("wms", "http://{subdomain}/tiles?z={z}&x={x}&y={y}", &["a"]);
        assert_eq!(server.file_extension(), "png");
        let jpeg = TileServerConfig::new("sat", "http://{subdomain}/{z}/{x}/{y}.jpeg", &["a"]);
        assert_eq!(jpeg.file_extension(), "jpeg");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "name": "custom",
            "url_template": "https://{subdomain}.example.org/{z}/{x}/{y}.png",
            "subdomains": ["tiles"]
        }"#;
        let server: TileServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(server.thread_limit, 1);
        assert_eq!(server.tile_size, (256, 256));
        assert_eq!(server.max_zoom, 19);
        assert_eq!(server.subdomain(), "tiles");
    }
}

//! Tile addressing: from a tile address and its server to a download URL and
//! a rectangle on the canvas.

use super::source::{TileServerConfig, TileSource};
use crate::core::bounds::Bounds;
use crate::core::geo::{Point, TileCoord};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// One tile on one server.
///
/// Specs are created on demand whenever the visible range is recomputed.
/// Two specs are equal when x, y, zoom, URL template, subdomains and tile size
/// all match; the server name, thread limit and attribution do not take part.
#[derive(Debug, Clone)]
pub struct TileSpec {
    pub coord: TileCoord,
    pub server: Arc<TileServerConfig>,
}

impl TileSpec {
    pub fn new(coord: TileCoord, server: Arc<TileServerConfig>) -> Self {
        Self { coord, server }
    }

    pub fn x(&self) -> u32 {
        self.coord.x
    }

    pub fn y(&self) -> u32 {
        self.coord.y
    }

    pub fn zoom(&self) -> u8 {
        self.coord.z
    }

    pub fn tile_size(&self) -> (u32, u32) {
        self.server.tile_size
    }

    /// URL the tile is downloaded from
    pub fn download_url(&self) -> String {
        self.server.url(self.coord)
    }

    /// Canvas rectangle of the tile given the pixel offset of the projection
    /// origin from the canvas top-left corner.
    pub fn canvas_rect(&self, origin_offset: Point) -> Bounds {
        let (width, height) = self.tile_size();
        let min = Point::new(
            self.coord.x as f64 * width as f64 + origin_offset.x,
            self.coord.y as f64 * height as f64 + origin_offset.y,
        );
        Bounds::from_min_size(min, width as f64, height as f64)
    }
}

impl PartialEq for TileSpec {
    fn eq(&self, other: &Self) -> bool {
        self.coord == other.coord
            && (Arc::ptr_eq(&self.server, &other.server)
                || (self.server.url_template == other.server.url_template
                    && self.server.subdomains == other.server.subdomains
                    && self.server.tile_size == other.server.tile_size))
    }
}

impl Eq for TileSpec {}

impl Hash for TileSpec {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.coord.hash(state);
        self.server.url_template.hash(state);
        self.server.subdomains.hash(state);
        self.server.tile_size.hash(state);
    }
}

impl std::fmt::Display for TileSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.coord, self.server.name)
    }
}

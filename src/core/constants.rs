//! Engine-wide constants. Keeping them in a single place makes it easier to
//! tweak the magic numbers shared by projection, viewport and loader.

/// Default square tile size in pixels.
pub const TILE_SIZE: u32 = 256;

/// Web-Mercator latitude cutoff in degrees; the projection is undefined beyond it.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Longitude limit in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Highest zoom level any tile server preset advertises.
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Deepest zoom level a tile server may declare. Tile indices are `u32`, and
/// at this level a full row of tiles still has a `u32` count.
pub const MAX_SUPPORTED_ZOOM: u8 = 31;

/// Extra rings of tiles requested around the visible area.
pub const DEFAULT_MARGIN_TILES: u32 = 2;

/// User-Agent sent with every tile request. Public tile servers (e.g.
/// OpenStreetMap) reject anonymous clients.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for tile downloads, in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Name of the per-user cache directory.
pub const CACHE_DIR_NAME: &str = "mapview";

//! Web-Mercator projection and slippy-map tile addressing.
//!
//! Three coordinate spaces meet here:
//!
//! * geographic degrees ([`LatLng`]),
//! * the normalized projected plane, where the whole world maps onto
//!   `[0, 1) x [0, 1)` with `(0, 0)` at the north-west corner ([`Coordinate`]),
//! * tile units at a zoom level, where the plane is scaled by `2^zoom`
//!   ([`TileCoord`] for the integer addresses).
//!
//! Every conversion in the crate goes through the functions in this module so
//! that there is exactly one computation path per operation.

use crate::core::constants::{MAX_LATITUDE, MAX_LONGITUDE};
use crate::{MapError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of tiles along one axis at `zoom`.
#[inline]
pub fn zoom_scale(zoom: u8) -> f64 {
    2_f64.powi(zoom as i32)
}

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether the point lies inside the Web-Mercator domain
    pub fn is_valid(&self) -> bool {
        self.lat.abs() <= MAX_LATITUDE && self.lng.abs() <= MAX_LONGITUDE
    }

    /// Projects onto the normalized plane, failing outside the projection domain
    pub fn coordinate(&self) -> Result<Coordinate> {
        Coordinate::from_lat_lon(self.lat, self.lng)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a point in screen or pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

}

impl Default for Point {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A point on the normalized Web-Mercator plane.
///
/// `x` grows eastwards from the antimeridian, `y` grows southwards from the
/// northern latitude cutoff. Values are immutable: every transform returns a
/// new coordinate. Equality is exact component equality, which is sound as
/// long as both sides were produced by the same sequence of operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    x: f64,
    y: f64,
}

impl Coordinate {
    /// Wraps raw plane coordinates. Any finite pair is accepted; points
    /// outside `[0, 1]` are simply off the map.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    /// Projects latitude/longitude (degrees) onto the plane.
    ///
    /// Fails with [`MapError::OutOfRange`] when `|lat| > 85.0511287798` or
    /// `|lon| > 180`. Geographic input is never clamped.
    pub fn from_lat_lon(lat: f64, lon: f64) -> Result<Self> {
        Ok(Self::new(lon_to_x(lon)?, lat_to_y(lat)?))
    }

    /// Inverse projection back to degrees.
    pub fn to_lat_lon(&self) -> LatLng {
        let lng = self.x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * self.y)).sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }

    /// Position in tile units at `zoom`.
    ///
    /// Both axes are clamped into `[0, 2^zoom - 1]` so that any point, even
    /// one just outside the projection, addresses a valid edge tile. With
    /// `truncate` the result is floored to whole tiles.
    pub fn to_tile_coordinates(&self, zoom: u8, truncate: bool) -> (f64, f64) {
        let scale = zoom_scale(zoom);
        let max = scale - 1.0;
        let tile_x = (self.x * scale).clamp(0.0, max);
        let tile_y = (self.y * scale).clamp(0.0, max);
        if truncate {
            (tile_x.floor(), tile_y.floor())
        } else {
            (tile_x, tile_y)
        }
    }

    /// Address of the tile containing this point at `zoom`.
    pub fn tile(&self, zoom: u8) -> TileCoord {
        let (x, y) = self.to_tile_coordinates(zoom, true);
        TileCoord::new(x as u32, y as u32, zoom)
    }

    /// Returns the coordinate `(dx, dy)` screen pixels away at the given zoom
    /// and tile size. Panning and origin translation both go through here,
    /// with the sign of the offset selecting the direction.
    pub fn with_pixel_offset(&self, dx: f64, dy: f64, zoom: u8, tile_size: (u32, u32)) -> Self {
        let scale = zoom_scale(zoom);
        Self::new(
            self.x + dx / (scale * tile_size.0 as f64),
            self.y + dy / (scale * tile_size.1 as f64),
        )
    }

    /// Absolute pixel position of this point on the world bitmap at `zoom`.
    pub fn to_pixels(&self, zoom: u8, tile_size: (u32, u32)) -> Point {
        let scale = zoom_scale(zoom);
        Point::new(
            self.x * scale * tile_size.0 as f64,
            self.y * scale * tile_size.1 as f64,
        )
    }
}

fn lon_to_x(lon: f64) -> Result<f64> {
    if !(-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lon) {
        return Err(MapError::OutOfRange {
            what: "longitude",
            value: lon,
            min: -MAX_LONGITUDE,
            max: MAX_LONGITUDE,
        });
    }
    Ok((lon + 180.0) / 360.0)
}

fn lat_to_y(lat: f64) -> Result<f64> {
    if !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat) {
        return Err(MapError::OutOfRange {
            what: "latitude",
            value: lat,
            min: -MAX_LATITUDE,
            max: MAX_LATITUDE,
        });
    }
    let lat_rad = lat.to_radians();
    Ok((1.0 - lat_rad.tan().asinh() / PI) / 2.0)
}

/// Represents a tile coordinate in the slippy map tile system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Largest valid x/y index at this tile's zoom level
    pub fn max_index(zoom: u8) -> u32 {
        (zoom_scale(zoom) as u64 - 1) as u32
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Inclusive rectangle of tile addresses at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min: TileCoord,
    pub max: TileCoord,
}

impl TileRange {
    /// Builds the range spanned by two tiles of the same zoom, in any order.
    pub fn spanning(a: TileCoord, b: TileCoord) -> Self {
        debug_assert_eq!(a.z, b.z);
        Self {
            min: TileCoord::new(a.x.min(b.x), a.y.min(b.y), a.z),
            max: TileCoord::new(a.x.max(b.x), a.y.max(b.y), a.z),
        }
    }

    /// Grows the range by `margin` tiles on every side, clamped to the valid
    /// tile indices of the zoom level.
    pub fn expanded(&self, margin: u32) -> Self {
        let max_index = TileCoord::max_index(self.min.z);
        let z = self.min.z;
        Self {
            min: TileCoord::new(
                self.min.x.saturating_sub(margin),
                self.min.y.saturating_sub(margin),
                z,
            ),
            max: TileCoord::new(
                self.max.x.saturating_add(margin).min(max_index),
                self.max.y.saturating_add(margin).min(max_index),
                z,
            ),
        }
    }

    pub fn zoom(&self) -> u8 {
        self.min.z
    }

    /// Number of tiles in the range
    pub fn len(&self) -> usize {
        let columns = self.max.x as u64 - self.min.x as u64 + 1;
        let rows = self.max.y as u64 - self.min.y as u64 + 1;
        (columns * rows) as usize
    }

    /// A range always holds at least one tile
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Scans the rectangle column by column: x outer, y inner.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> {
        let TileRange { min, max } = *self;
        (min.x..=max.x).flat_map(move |x| (min.y..=max.y).map(move |y| TileCoord::new(x, y, min.z)))
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Range of tiles covering the box at `zoom`.
    pub fn tile_range(&self, zoom: u8) -> Result<TileRange> {
        let nw = Coordinate::from_lat_lon(self.north_east.lat, self.south_west.lng)?;
        let se = Coordinate::from_lat_lon(self.south_west.lat, self.north_east.lng)?;
        Ok(TileRange::spanning(nw.tile(zoom), se.tile(zoom)))
    }

    /// Every tile covering the box at `zoom`, x-major.
    pub fn tiles(&self, zoom: u8) -> Result<Vec<TileCoord>> {
        Ok(self.tile_range(zoom)?.iter().collect())
    }
}

/// Tiles needed to fill a `window_size` pixel window centred on `center`.
pub fn tiles_around_center(
    center: LatLng,
    zoom: u8,
    window_size: (u32, u32),
    tile_size: (u32, u32),
) -> Result<Vec<TileCoord>> {
    let (center_x, center_y) = center.coordinate()?.to_tile_coordinates(zoom, false);
    let half_x = window_size.0 as f64 / tile_size.0 as f64 / 2.0;
    let half_y = window_size.1 as f64 / tile_size.1 as f64 / 2.0;
    let max = TileCoord::max_index(zoom) as f64;
    let to_index = |v: f64| v.floor().clamp(0.0, max) as u32;

    let range = TileRange::spanning(
        TileCoord::new(to_index(center_x - half_x), to_index(center_y - half_y), zoom),
        TileCoord::new(to_index(center_x + half_x), to_index(center_y + half_y), zoom),
    );
    Ok(range.iter().collect())
}

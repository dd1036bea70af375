//! Viewport tracking: where the canvas looks on the projected plane, which
//! tiles it needs, and which ones it already shows.
//!
//! The viewport is owned by the GUI thread and has no internal locking.
//! Tiles fetched on worker threads reach it through [`Viewport::on_tile_arrived`],
//! called from the control thread after draining the loader channel.

use crate::core::bounds::Bounds;
use crate::core::constants::DEFAULT_MARGIN_TILES;
use crate::core::geo::{Coordinate, Point, TileRange};
use crate::tiles::source::TileServerConfig;
use crate::tiles::spec::TileSpec;
use crate::{MapError, Result};
use fxhash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Pan gesture state.
///
/// While dragging, the offset is the total displacement since the drag
/// started; the origin itself only moves on commit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { dx: f64, dy: f64 },
}

impl DragState {
    /// Pending displacement in pixels, zero when idle
    pub fn offset(&self) -> Point {
        match *self {
            DragState::Idle => Point::new(0.0, 0.0),
            DragState::Dragging { dx, dy } => Point::new(dx, dy),
        }
    }
}

/// Opaque handle a [`TileDrawer`] returns for a drawn tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawHandle(pub u64);

/// Image source handed to the drawer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileImage<'a> {
    /// Local file holding the downloaded raster
    File(&'a Path),
    /// No image is available, draw a placeholder
    Missing,
}

/// Drawing side of the GUI.
///
/// Implementations must not fail: when the image cannot be decoded they draw
/// a placeholder (solid gray) in `rect` instead.
pub trait TileDrawer {
    fn draw_tile(&mut self, spec: &TileSpec, rect: Bounds, image: TileImage<'_>) -> DrawHandle;
}

/// Visible area of the map on the projected plane.
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Projected point under the top-left canvas pixel, drag excluded
    origin: Coordinate,
    zoom: u8,
    size: (u32, u32),
    drag: DragState,
    tile_size: (u32, u32),
    max_zoom: u8,
    margin: u32,
    displayed: FxHashMap<TileSpec, DrawHandle>,
}

impl Viewport {
    /// Viewport of `size` pixels centred on `lat`/`lon` at `zoom`.
    ///
    /// Fails when the position lies outside the projection or the zoom is
    /// deeper than the server supports.
    pub fn centered_at(
        lat: f64,
        lon: f64,
        zoom: u8,
        size: (u32, u32),
        server: &TileServerConfig,
    ) -> Result<Self> {
        check_zoom(zoom, server.max_zoom)?;
        let mut viewport = Self {
            origin: Coordinate::new(0.0, 0.0),
            zoom,
            size,
            drag: DragState::Idle,
            tile_size: server.tile_size,
            max_zoom: server.max_zoom,
            margin: DEFAULT_MARGIN_TILES,
            displayed: FxHashMap::default(),
        };
        viewport.center_on(lat, lon, zoom)?;
        Ok(viewport)
    }

    /// Tile margin used by [`Viewport::drag_update`] and [`Viewport::resize`]
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn tile_size(&self) -> (u32, u32) {
        self.tile_size
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn pending_drag(&self) -> DragState {
        self.drag
    }

    /// Moves the view so that `lat`/`lon` sits in the middle of the canvas.
    /// Any pending drag is discarded.
    pub fn center_on(&mut self, lat: f64, lon: f64, zoom: u8) -> Result<()> {
        check_zoom(zoom, self.max_zoom)?;
        let center = Coordinate::from_lat_lon(lat, lon)?;
        let origin = center.with_pixel_offset(
            -(self.size.0 as f64) / 2.0,
            -(self.size.1 as f64) / 2.0,
            zoom,
            self.tile_size,
        );
        self.set_origin(origin, zoom);
        Ok(())
    }

    /// Places `origin` at the top-left corner without re-anchoring.
    /// `zoom` is capped at the maximum zoom; any pending drag is discarded.
    pub fn set_origin(&mut self, origin: Coordinate, zoom: u8) {
        self.origin = origin;
        self.zoom = zoom.min(self.max_zoom);
        self.drag = DragState::Idle;
    }

    /// Pixel offset of the projection origin from the canvas top-left corner.
    pub fn origin_offset(&self) -> Point {
        let pixels = self.origin.to_pixels(self.zoom, self.tile_size);
        Point::new(-pixels.x, -pixels.y)
    }

    /// Records the total drag displacement so far and returns the tiles the
    /// dragged view needs.
    pub fn drag_update(&mut self, dx: f64, dy: f64) -> TileRange {
        self.drag = DragState::Dragging { dx, dy };
        self.visible_tile_range(self.margin)
    }

    /// Folds the pending drag into the origin.
    pub fn drag_commit(&mut self) {
        if let DragState::Dragging { dx, dy } = self.drag {
            self.origin = self.origin.with_pixel_offset(-dx, -dy, self.zoom, self.tile_size);
            self.drag = DragState::Idle;
        }
    }

    /// Changes the zoom level keeping the map point under `canvas_point` fixed
    /// on screen. Zoom levels outside `0..=max_zoom` are ignored and `false`
    /// is returned. A pending drag is committed first.
    pub fn zoom_at_point(&mut self, canvas_point: Point, new_zoom: i32) -> bool {
        if new_zoom < 0 || new_zoom > self.max_zoom as i32 {
            log::debug!("ignoring zoom to level {}", new_zoom);
            return false;
        }
        self.drag_commit();

        let new_zoom = new_zoom as u8;
        let focus = self
            .origin
            .with_pixel_offset(canvas_point.x, canvas_point.y, self.zoom, self.tile_size);
        self.origin = focus.with_pixel_offset(-canvas_point.x, -canvas_point.y, new_zoom, self.tile_size);
        self.zoom = new_zoom;
        true
    }

    /// Changes the canvas size. The top-left corner stays put.
    pub fn resize(&mut self, width: u32, height: u32) -> TileRange {
        self.size = (width, height);
        self.visible_tile_range(self.margin)
    }

    /// Projected point under a canvas pixel, pending drag included.
    pub fn coordinate_at(&self, canvas_x: f64, canvas_y: f64) -> Coordinate {
        let drag = self.drag.offset();
        self.origin
            .with_pixel_offset(canvas_x - drag.x, canvas_y - drag.y, self.zoom, self.tile_size)
    }

    /// Tiles covering the canvas plus `margin` tiles on each side.
    ///
    /// Never empty: at the edges of the world the range is clamped onto the
    /// valid tile indices.
    pub fn visible_tile_range(&self, margin: u32) -> TileRange {
        let drag = self.drag.offset();
        let min = self
            .origin
            .with_pixel_offset(-drag.x, -drag.y, self.zoom, self.tile_size);
        let max = min.with_pixel_offset(self.size.0 as f64, self.size.1 as f64, self.zoom, self.tile_size);
        TileRange::spanning(min.tile(self.zoom), max.tile(self.zoom)).expanded(margin)
    }

    /// Tiles in the visible range that are not displayed yet, x-major.
    pub fn tiles_to_fetch(&self, margin: u32, server: &Arc<TileServerConfig>) -> Vec<TileSpec> {
        self.visible_tile_range(margin)
            .iter()
            .map(|coord| TileSpec::new(coord, Arc::clone(server)))
            .filter(|spec| !self.displayed.contains_key(spec))
            .collect()
    }

    /// Registers a fetched tile and asks the drawer to show it.
    ///
    /// The rectangle is computed from the origin as it is now, not as it was
    /// when the tile was requested. Returns `None` if the tile is already
    /// displayed, in which case the drawer is not called.
    pub fn on_tile_arrived(
        &mut self,
        spec: TileSpec,
        image: TileImage<'_>,
        drawer: &mut dyn TileDrawer,
    ) -> Option<DrawHandle> {
        if self.displayed.contains_key(&spec) {
            return None;
        }
        let rect = spec.canvas_rect(self.origin_offset());
        let handle = drawer.draw_tile(&spec, rect, image);
        self.displayed.insert(spec, handle);
        Some(handle)
    }

    /// Where a tile shows on the canvas right now, following the pending drag.
    pub fn screen_rect(&self, spec: &TileSpec) -> Bounds {
        spec.canvas_rect(self.origin_offset()).translate(self.drag.offset())
    }

    pub fn is_displayed(&self, spec: &TileSpec) -> bool {
        self.displayed.contains_key(spec)
    }

    pub fn displayed_tiles(&self) -> impl Iterator<Item = (&TileSpec, &DrawHandle)> {
        self.displayed.iter()
    }

    pub fn displayed_count(&self) -> usize {
        self.displayed.len()
    }
}

fn check_zoom(zoom: u8, max_zoom: u8) -> Result<()> {
    if zoom > max_zoom {
        return Err(MapError::OutOfRange {
            what: "zoom",
            value: zoom as f64,
            min: 0.0,
            max: max_zoom as f64,
        });
    }
    Ok(())
}

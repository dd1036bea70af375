use crate::core::config::MapConfig;
use crate::core::geo::{LatLng, Point, TileRange};
use crate::core::viewport::{TileDrawer, TileImage, Viewport};
use crate::tiles::loader::TileLoader;
use crate::tiles::source::TileServerConfig;
use crate::Result;
use std::sync::Arc;

/// Ties the viewport to a tile loader and exposes the GUI-facing API.
///
/// All methods run on the control thread. The loader's worker threads only
/// talk back through [`Map::process_arrivals`].
pub struct Map {
    viewport: Viewport,
    server: Arc<TileServerConfig>,
    loader: TileLoader,
}

impl Map {
    /// Builds the viewport and an HTTP-backed loader from `config`.
    pub fn new(config: MapConfig) -> Result<Self> {
        config.validate()?;
        let server = Arc::new(config.tile_server.clone());
        let loader = TileLoader::from_config(Arc::clone(&server), &config.loader)?;
        Self::with_loader(config, loader)
    }

    /// Same as [`Map::new`] with a caller supplied loader. The loader's server
    /// replaces the one in `config`.
    pub fn with_loader(config: MapConfig, loader: TileLoader) -> Result<Self> {
        let server = Arc::clone(loader.server());
        server.validate()?;
        let viewport = Viewport::centered_at(
            config.center.lat,
            config.center.lng,
            config.zoom,
            config.size,
            &server,
        )?
        .with_margin(config.margin_tiles);

        log::info!(
            "map centred on ({}, {}) at zoom {} using {}",
            config.center.lat,
            config.center.lng,
            config.zoom,
            server.name
        );
        Ok(Self {
            viewport,
            server,
            loader,
        })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn server(&self) -> &Arc<TileServerConfig> {
        &self.server
    }

    pub fn loader(&self) -> &TileLoader {
        &self.loader
    }

    pub fn zoom(&self) -> u8 {
        self.viewport.zoom()
    }

    /// Geographic position under the middle of the canvas
    pub fn center(&self) -> LatLng {
        let (width, height) = self.viewport.size();
        self.viewport
            .coordinate_at(width as f64 / 2.0, height as f64 / 2.0)
            .to_lat_lon()
    }

    /// Pan in progress; `(dx, dy)` is the total displacement since the drag began.
    pub fn on_drag_update(&mut self, dx: f64, dy: f64) -> Result<TileRange> {
        let range = self.viewport.drag_update(dx, dy);
        self.request_visible()?;
        Ok(range)
    }

    pub fn on_drag_commit(&mut self) {
        self.viewport.drag_commit();
    }

    /// Zooms by `zoom_delta` levels around `canvas_point`. Returns whether the
    /// zoom level changed; levels outside the server's range are ignored.
    pub fn on_zoom(&mut self, canvas_point: Point, zoom_delta: i32) -> Result<bool> {
        let target = self.viewport.zoom() as i32 + zoom_delta;
        if zoom_delta == 0 || !self.viewport.zoom_at_point(canvas_point, target) {
            return Ok(false);
        }
        log::debug!("zoomed to level {}", target);
        self.request_visible()?;
        Ok(true)
    }

    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<TileRange> {
        let range = self.viewport.resize(width, height);
        self.request_visible()?;
        Ok(range)
    }

    /// Recentres the view, keeping the canvas size.
    pub fn set_view(&mut self, center: LatLng, zoom: u8) -> Result<()> {
        self.viewport.center_on(center.lat, center.lng, zoom)?;
        self.request_visible()?;
        Ok(())
    }

    /// Sends every visible tile that is neither displayed nor already requested
    /// to the loader. Returns the number of tiles newly queued.
    pub fn request_visible(&mut self) -> Result<usize> {
        let wanted = self.viewport.tiles_to_fetch(self.viewport.margin(), &self.server);
        self.loader.request(wanted)
    }

    /// Hands every finished tile to the viewport and `drawer`. Returns how many
    /// tiles were drawn.
    pub fn process_arrivals(&mut self, drawer: &mut dyn TileDrawer) -> usize {
        let mut drawn = 0;
        for arrival in self.loader.poll() {
            let image = TileImage::File(&arrival.path);
            if self.viewport.on_tile_arrived(arrival.spec, image, drawer).is_some() {
                drawn += 1;
            }
        }
        drawn
    }

    /// Tiles queued or downloading
    pub fn in_flight(&self) -> usize {
        self.loader.in_flight()
    }

    pub fn is_loading(&self) -> bool {
        !self.loader.is_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bounds::Bounds;
    use crate::core::geo::TileCoord;
    use crate::core::viewport::DrawHandle;
    use crate::tiles::cache::DiskCache;
    use crate::tiles::loader::TileFetcher;
    use crate::tiles::spec::TileSpec;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct CountingFetcher {
        urls: Mutex<Vec<String>>,
    }

    impl TileFetcher for CountingFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.urls.lock().unwrap().push(url.to_string());
            Ok(vec![0u8; 4])
        }
    }

    #[derive(Default)]
    struct Canvas {
        tiles: Vec<(TileSpec, Bounds)>,
    }

    impl TileDrawer for Canvas {
        fn draw_tile(&mut self, spec: &TileSpec, rect: Bounds, image: TileImage<'_>) -> DrawHandle {
            assert!(matches!(image, TileImage::File(path) if path.is_file()));
            self.tiles.push((spec.clone(), rect));
            DrawHandle(self.tiles.len() as u64)
        }
    }

    fn helsinki_map(dir: &std::path::Path, fetcher: Arc<CountingFetcher>) -> Map {
        let config = MapConfig::new(LatLng::new(60.1641, 24.9402), 12, (700, 500));
        let server = Arc::new(config.tile_server.clone().with_thread_limit(4));
        let loader = TileLoader::new(server, DiskCache::new(dir), fetcher);
        Map::with_loader(config, loader).unwrap()
    }

    fn drain(map: &mut Map, canvas: &mut Canvas, expected: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while canvas.tiles.len() < expected && Instant::now() < deadline {
            map.process_arrivals(canvas);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_visible_tiles_are_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let mut map = helsinki_map(dir.path(), fetcher.clone());
        let mut canvas = Canvas::default();

        assert_eq!(map.request_visible().unwrap(), 56);
        // Already queued
        assert_eq!(map.request_visible().unwrap(), 0);

        drain(&mut map, &mut canvas, 56);
        assert_eq!(canvas.tiles.len(), 56);
        assert_eq!(fetcher.urls.lock().unwrap().len(), 56);
        assert_eq!(map.viewport().displayed_count(), 56);
        assert_eq!(map.request_visible().unwrap(), 0);
    }

    #[test]
    fn test_configured_margin_drives_requests() {
        let dir = tempfile::tempdir().unwrap();
        let config = MapConfig::new(LatLng::new(60.1641, 24.9402), 12, (700, 500)).with_margin(1);
        let server = Arc::new(config.tile_server.clone());
        let loader = TileLoader::new(server, DiskCache::new(dir.path()), Arc::new(CountingFetcher::default()));
        let mut map = Map::with_loader(config, loader).unwrap();

        assert_eq!(map.viewport().margin(), 1);
        // 2329..=2334 x 1183..=1187
        assert_eq!(map.request_visible().unwrap(), 30);
    }

    #[test]
    fn test_drag_requests_revealed_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CountingFetcher::default());
        let mut map = helsinki_map(dir.path(), fetcher);
        map.request_visible().unwrap();

        let range = map.on_drag_update(-512.0, -512.0).unwrap();
        assert_eq!(range.max, TileCoord::new(2337, 1190, 12));
        map.on_drag_commit();

        let mut canvas = Canvas::default();
        // 8x7 initially, 8x7 after the drag, 6x5 overlap
        drain(&mut map, &mut canvas, 56 + 56 - 30);
        assert_eq!(canvas.tiles.len(), 82);
    }

    #[test]
    fn test_zoom_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = helsinki_map(dir.path(), Arc::new(CountingFetcher::default()));

        assert!(!map.on_zoom(Point::new(350.0, 250.0), 8).unwrap());
        assert!(!map.on_zoom(Point::new(350.0, 250.0), -13).unwrap());
        assert!(!map.on_zoom(Point::new(350.0, 250.0), 0).unwrap());
        assert_eq!(map.zoom(), 12);

        assert!(map.on_zoom(Point::new(350.0, 250.0), 1).unwrap());
        assert_eq!(map.zoom(), 13);
        let center = map.center();
        assert!((center.lat - 60.1641).abs() < 1e-9);
        assert!((center.lng - 24.9402).abs() < 1e-9);
    }

    #[test]
    fn test_set_view_and_resize() {
        let dir = tempfile::tempdir().unwrap();
        let mut map = helsinki_map(dir.path(), Arc::new(CountingFetcher::default()));

        map.set_view(LatLng::new(59.3315, 18.0560), 13).unwrap();
        assert_eq!(map.zoom(), 13);
        assert!(map.set_view(LatLng::new(95.0, 0.0), 13).is_err());

        let range = map.on_resize(1024, 768).unwrap();
        assert_eq!(map.viewport().size(), (1024, 768));
        assert!(range.len() > 56);
    }
}

use mapview::{
    Bounds, Coordinate, DiskCache, DrawHandle, LatLng, LatLngBounds, Map, MapConfig, MapError,
    Point, TileCoord, TileDrawer, TileFetcher, TileImage, TileLoader, TileServerConfig, TileSpec,
    Viewport,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const HELSINKI: LatLng = LatLng {
    lat: 60.1641,
    lng: 24.9402,
};

/// Serves a tiny payload for every URL and remembers what was asked for
#[derive(Default)]
struct MemoryFetcher {
    requested: Mutex<Vec<String>>,
}

impl TileFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> mapview::Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        if url.contains("/13/") {
            return Err(MapError::Http {
                status: 503,
                url: url.to_string(),
            });
        }
        Ok(b"tile".to_vec())
    }
}

#[derive(Default)]
struct RecordingDrawer {
    drawn: Vec<(TileCoord, Bounds)>,
}

impl TileDrawer for RecordingDrawer {
    fn draw_tile(&mut self, spec: &TileSpec, rect: Bounds, _image: TileImage<'_>) -> DrawHandle {
        self.drawn.push((spec.coord, rect));
        DrawHandle(self.drawn.len() as u64)
    }
}

fn map_with_fetcher(cache_dir: &std::path::Path, fetcher: Arc<MemoryFetcher>) -> anyhow::Result<Map> {
    let config = MapConfig::new(HELSINKI, 12, (700, 500));
    let server = Arc::new(config.tile_server.clone());
    let loader = TileLoader::new(server, DiskCache::new(cache_dir), fetcher);
    Ok(Map::with_loader(config, loader)?)
}

fn wait_for(map: &mut Map, drawer: &mut RecordingDrawer, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while drawer.drawn.len() < count && Instant::now() < deadline {
        map.process_arrivals(drawer);
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_projection_scenarios() -> anyhow::Result<()> {
    let point = Coordinate::from_lat_lon(HELSINKI.lat, HELSINKI.lng)?;
    let (x, y) = point.to_tile_coordinates(12, false);
    assert!((x - 2331.7640533333333).abs() < 1e-9);
    assert!((y - 1185.7334442480528).abs() < 1e-9);
    assert_eq!(point.to_tile_coordinates(12, true), (2331.0, 1185.0));

    for (lat, lon) in [(86.0, 0.0), (-86.0, 0.0), (60.0, 181.0), (60.0, -200.0)] {
        assert!(matches!(
            Coordinate::from_lat_lon(lat, lon),
            Err(MapError::OutOfRange { .. })
        ));
    }

    let tiles: HashSet<TileCoord> = LatLngBounds::from_coords(60.15198, 24.90550, 60.17582, 24.96273)
        .tiles(12)?
        .into_iter()
        .collect();
    let expected: HashSet<TileCoord> = [(2331, 1185), (2331, 1186), (2332, 1185), (2332, 1186)]
        .into_iter()
        .map(|(x, y)| TileCoord::new(x, y, 12))
        .collect();
    assert_eq!(tiles, expected);
    Ok(())
}

#[test]
fn test_viewport_scenario() -> anyhow::Result<()> {
    let server = Arc::new(TileServerConfig::openstreetmap());
    let mut viewport = Viewport::centered_at(HELSINKI.lat, HELSINKI.lng, 12, (700, 500), &server)?;
    let offset = viewport.origin_offset();
    assert!((offset.x + 596581.5976533333).abs() < 1e-6);
    assert!((offset.y + 303297.7617275015).abs() < 1e-6);

    let origin = viewport.origin();
    viewport.drag_update(120.0, -80.0);
    viewport.drag_commit();
    viewport.drag_update(-120.0, 80.0);
    viewport.drag_commit();
    assert!((viewport.origin().x() - origin.x()).abs() < 1e-12);
    assert!((viewport.origin().y() - origin.y()).abs() < 1e-12);

    let top_left = viewport.origin();
    assert!(viewport.zoom_at_point(Point::new(0.0, 0.0), 15));
    assert_eq!(viewport.origin(), top_left);
    Ok(())
}

#[test]
fn test_fetch_pipeline() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let fetcher = Arc::new(MemoryFetcher::default());
    let mut map = map_with_fetcher(dir.path(), fetcher.clone())?;
    let mut drawer = RecordingDrawer::default();

    assert_eq!(map.request_visible()?, 56);
    wait_for(&mut map, &mut drawer, 56);
    assert_eq!(drawer.drawn.len(), 56);

    // Every tile lands where the current origin says it should
    let offset = map.viewport().origin_offset();
    for (coord, rect) in &drawer.drawn {
        assert_eq!(rect.min.x, coord.x as f64 * 256.0 + offset.x);
        assert_eq!(rect.min.y, coord.y as f64 * 256.0 + offset.y);
        assert_eq!(rect.width(), 256.0);
    }

    // The disk cache is shared with a fresh map: nothing goes to the network
    let fetched = fetcher.requested.lock().unwrap().len();
    let mut second = map_with_fetcher(dir.path(), fetcher.clone())?;
    let mut second_drawer = RecordingDrawer::default();
    second.request_visible()?;
    second.process_arrivals(&mut second_drawer);
    assert_eq!(second_drawer.drawn.len(), 56);
    assert_eq!(fetcher.requested.lock().unwrap().len(), fetched);
    Ok(())
}

#[test]
fn test_failed_tiles_stay_missing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let fetcher = Arc::new(MemoryFetcher::default());
    let mut map = map_with_fetcher(dir.path(), fetcher.clone())?;
    let mut drawer = RecordingDrawer::default();

    // Zoom 13 tiles always fail
    assert!(map.on_zoom(Point::new(350.0, 250.0), 1)?);
    let deadline = Instant::now() + Duration::from_secs(5);
    while map.is_loading() && Instant::now() < deadline {
        map.process_arrivals(&mut drawer);
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(drawer.drawn.is_empty());
    assert_eq!(map.viewport().displayed_count(), 0);

    let attempts = fetcher.requested.lock().unwrap().len();
    assert!(attempts > 0);
    assert_eq!(map.request_visible()?, 0);
    assert_eq!(fetcher.requested.lock().unwrap().len(), attempts);
    Ok(())
}

#[test]
fn test_config_file_drives_map() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("map.json");
    std::fs::write(
        &path,
        r#"{
            "center": { "lat": 59.3315, "lng": 18.0560 },
            "zoom": 13,
            "size": [700, 500],
            "margin_tiles": 1
        }"#,
    )?;

    let config = MapConfig::from_file(&path)?;
    let server = Arc::new(config.tile_server.clone());
    let loader = TileLoader::new(server, DiskCache::new(dir.path()), Arc::new(MemoryFetcher::default()));
    let map = Map::with_loader(config, loader)?;

    let offset = map.viewport().origin_offset();
    assert!((offset.x + 1153409.8236444446).abs() < 1e-6);
    assert!((offset.y + 616473.2951275909).abs() < 1e-6);
    assert_eq!(map.viewport().margin(), 1);
    Ok(())
}

#[cfg(feature = "egui")]
#[test]
fn test_widget_keeps_state_between_frames() -> anyhow::Result<()> {
    use mapview::{MapWidget, TileLoaderConfig};

    let dir = tempfile::tempdir()?;
    // Nothing listens on the discard port, downloads fail fast
    let server = TileServerConfig::new("local", "http://{subdomain}:9/{z}/{x}/{y}.png", &["127.0.0.1"]);
    let config = MapConfig::new(HELSINKI, 12, (700, 500))
        .with_tile_server(server)
        .with_loader(TileLoaderConfig::for_testing().with_cache_dir(dir.path()));
    let widget = MapWidget::with_config(config).size(egui::Vec2::new(300.0, 200.0));

    let ctx = egui::Context::default();
    for _ in 0..2 {
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.add(widget.clone());
            });
        });
    }

    let state = widget.with_map(&ctx, |map| (map.zoom(), map.viewport().size()));
    assert_eq!(state, Some((12, (300, 200))));
    Ok(())
}

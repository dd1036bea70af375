use mapview::{
    Bounds, DrawHandle, LatLng, LatLngBounds, Map, MapConfig, Point, TileDrawer, TileImage,
    TileSpec,
};
use std::time::{Duration, Instant};

/// Prints every tile instead of drawing it
#[derive(Default)]
struct PrintingDrawer {
    drawn: u64,
}

impl TileDrawer for PrintingDrawer {
    fn draw_tile(&mut self, spec: &TileSpec, rect: Bounds, image: TileImage<'_>) -> DrawHandle {
        self.drawn += 1;
        match image {
            TileImage::File(path) => println!(
                "   tile {} at ({:.0}, {:.0}) from {}",
                spec,
                rect.min.x,
                rect.min.y,
                path.display()
            ),
            TileImage::Missing => println!("   tile {} missing", spec),
        }
        DrawHandle(self.drawn)
    }
}

/// Example of using mapview in headless mode without any UI
fn main() -> mapview::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("mapview headless example");
    println!("========================");

    let config = MapConfig::new(LatLng::new(60.1641, 24.9402), 12, (700, 500));
    let mut map = Map::new(config)?;
    let viewport = map.viewport();
    let offset = viewport.origin_offset();
    println!("Map created at zoom {}", viewport.zoom());
    println!("   origin offset: ({:.4}, {:.4})", offset.x, offset.y);
    let range = viewport.visible_tile_range(viewport.margin());
    println!("   visible tiles: {} .. {} ({} tiles)", range.min, range.max, range.len());

    let bbox = LatLngBounds::from_coords(60.15198, 24.90550, 60.17582, 24.96273);
    let covering: Vec<String> = bbox.tiles(12)?.iter().map(|t| t.to_string()).collect();
    println!("   city centre tiles: {}", covering.join(", "));

    println!("\nFetching tiles from {}", map.server().name);
    let queued = map.request_visible()?;
    println!("   queued {} tiles", queued);

    let mut drawer = PrintingDrawer::default();
    drain(&mut map, &mut drawer, Duration::from_secs(20));

    println!("\nDragging half a screen to the east");
    let range = map.on_drag_update(-350.0, 0.0)?;
    map.on_drag_commit();
    println!("   visible tiles now {} .. {}", range.min, range.max);
    drain(&mut map, &mut drawer, Duration::from_secs(20));

    println!("\nZooming in at the canvas centre");
    map.on_zoom(Point::new(350.0, 250.0), 1)?;
    let center = map.center();
    println!("   zoom {} centred on {:.4}, {:.4}", map.zoom(), center.lat, center.lng);
    drain(&mut map, &mut drawer, Duration::from_secs(20));

    println!("\nDone: {} tiles drawn", drawer.drawn);
    Ok(())
}

/// Processes arrivals until the loader goes idle or `timeout` passes.
/// Failed downloads never arrive, so the timeout is what ends a bad run.
fn drain(map: &mut Map, drawer: &mut PrintingDrawer, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        map.process_arrivals(drawer);
        if !map.is_loading() {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    if map.is_loading() {
        println!("   gave up waiting, {} tiles still in flight", map.in_flight());
    }
}

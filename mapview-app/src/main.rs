use anyhow::Context as _;
use mapview::{LatLng, MapConfig, MapWidget, TileServerConfig};

/// Standalone map viewer application.
///
/// Usage: `mapview-app [config.json]`. Without a configuration file the map
/// opens on Helsinki at zoom 12 with OpenStreetMap tiles.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => MapConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path))?,
        None => MapConfig::new(LatLng::new(60.1641, 24.9402), 12, (700, 500)),
    };
    log::info!("tile cache at {}", config.loader.cache_dir().display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.size.0 as f32 + 220.0, config.size.1 as f32 + 40.0])
            .with_title("mapview"),
        ..Default::default()
    };

    eframe::run_native(
        "mapview-app",
        options,
        Box::new(move |_cc| Box::new(MapViewApp::new(config))),
    )
    .map_err(|e| anyhow::anyhow!("event loop failed: {}", e))
}

const PRESETS: [(&str, f64, f64, u8); 4] = [
    ("Helsinki", 60.1641, 24.9402, 12),
    ("Stockholm", 59.3315, 18.0560, 13),
    ("Tallinn", 59.4370, 24.7536, 12),
    ("Oslo", 59.9139, 10.7522, 11),
];

struct MapViewApp {
    config: MapConfig,
    servers: Vec<TileServerConfig>,
    selected_server: usize,
    selected_preset: Option<&'static str>,
}

impl MapViewApp {
    fn new(config: MapConfig) -> Self {
        let mut servers = vec![TileServerConfig::openstreetmap(), TileServerConfig::opentopomap()];
        let selected_server = match servers.iter().position(|s| *s == config.tile_server) {
            Some(index) => index,
            None => {
                servers.insert(0, config.tile_server.clone());
                0
            }
        };
        Self {
            config,
            servers,
            selected_server,
            selected_preset: None,
        }
    }

    /// One map state per tile server, so switching servers keeps each view.
    fn widget(&self) -> MapWidget {
        let server = self.servers[self.selected_server].clone();
        MapWidget::with_config(self.config.clone())
            .id(("mapview_map", server.name.clone()))
            .tile_server(server)
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tiles");
        for (index, server) in self.servers.iter().enumerate() {
            ui.radio_value(&mut self.selected_server, index, server.name.as_str());
        }

        ui.separator();
        ui.heading("Go to");
        let ctx = ui.ctx().clone();
        let widget = self.widget();
        for (name, lat, lng, zoom) in PRESETS {
            if ui
                .selectable_label(self.selected_preset == Some(name), name)
                .clicked()
            {
                self.selected_preset = Some(name);
                let moved = widget.with_map(&ctx, |map| map.set_view(LatLng::new(lat, lng), zoom));
                if let Some(Err(e)) = moved {
                    log::warn!("cannot move to {}: {}", name, e);
                }
            }
        }

        ui.separator();
        widget.with_map(&ctx, |map| {
            let center = map.center();
            ui.label(format!("Center: {:.4}, {:.4}", center.lat, center.lng));
            ui.label(format!("Zoom: {}", map.zoom()));
            ui.label(format!("Tiles shown: {}", map.viewport().displayed_count()));
            ui.label(format!("Tiles loading: {}", map.in_flight()));
        });
    }
}

impl eframe::App for MapViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("controls")
            .resizable(false)
            .exact_width(200.0)
            .show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                ui.add(self.widget());
            });
    }
}

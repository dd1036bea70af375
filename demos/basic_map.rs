use eframe::egui;
use mapview::{ui::UiMapExt, LatLng, MapWidget, Point};

/// Smallest possible map application: one widget filling the window, plus
/// zoom buttons driving the same map state through `MapWidget::with_map`.
struct MapApp;

impl eframe::App for MapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let handle = MapWidget::new();
                if let Some(center) = handle.with_map(ctx, |map| map.center()) {
                    ui.label(format!("{:.4}, {:.4}", center.lat, center.lng));
                }
                if ui.button("Zoom In").clicked() {
                    zoom_by(ctx, &handle, 1);
                }
                if ui.button("Zoom Out").clicked() {
                    zoom_by(ctx, &handle, -1);
                }
                if ui.button("Helsinki").clicked() {
                    let moved = handle.with_map(ctx, |map| map.set_view(LatLng::new(60.1641, 24.9402), 12));
                    if let Some(Err(e)) = moved {
                        log::warn!("cannot move the map: {}", e);
                    }
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.map_at_zoom(60.1641, 24.9402, 12);
        });
    }
}

fn zoom_by(ctx: &egui::Context, handle: &MapWidget, delta: i32) {
    handle.with_map(ctx, |map| {
        let (width, height) = map.viewport().size();
        let middle = Point::new(width as f64 / 2.0, height as f64 / 2.0);
        if let Err(e) = map.on_zoom(middle, delta) {
            log::warn!("zoom failed: {}", e);
        }
    });
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([900.0, 700.0]),
        ..Default::default()
    };

    eframe::run_native("mapview basic map", options, Box::new(|_cc| Box::new(MapApp)))
}

pub mod widget;

pub use widget::{MapWidget, TextureDrawer};

pub trait UiMapExt {
    fn map(&mut self) -> egui::Response;

    fn map_at(&mut self, lat: f64, lng: f64) -> egui::Response;

    fn map_at_zoom(&mut self, lat: f64, lng: f64, zoom: u8) -> egui::Response;
}

impl UiMapExt for egui::Ui {
    fn map(&mut self) -> egui::Response {
        self.add(MapWidget::new())
    }

    fn map_at(&mut self, lat: f64, lng: f64) -> egui::Response {
        self.add(MapWidget::new().center(lat, lng))
    }

    fn map_at_zoom(&mut self, lat: f64, lng: f64, zoom: u8) -> egui::Response {
        self.add(MapWidget::new().center(lat, lng).zoom(zoom))
    }
}

use crate::{
    core::{
        bounds::Bounds,
        config::MapConfig,
        geo::{LatLng, Point},
        map::Map,
        viewport::{DrawHandle, TileDrawer, TileImage},
    },
    tiles::{source::TileServerConfig, spec::TileSpec},
};
use egui::{Color32, ColorImage, Pos2, Rect, Response, Sense, TextureHandle, Ui, Vec2, Widget};
use fxhash::FxHashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BACKGROUND: Color32 = Color32::from_rgb(230, 230, 230);
const PLACEHOLDER: Color32 = Color32::from_gray(160);

/// Immediate-mode map widget.
///
/// The builder is cheap and meant to be recreated every frame; the map state
/// (viewport, tile loader, textures) lives in egui's memory under the widget
/// id and survives between frames.
///
/// ```no_run
/// # fn show(ui: &mut egui::Ui) {
/// ui.add(mapview::MapWidget::new().center(60.1641, 24.9402).zoom(12));
/// # }
/// ```
#[derive(Clone)]
pub struct MapWidget {
    pub config: MapConfig,
    pub size: Option<Vec2>,
    pub interactive: bool,
    pub show_attribution: bool,
    pub id: egui::Id,
}

impl Default for MapWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl MapWidget {
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    pub fn with_config(config: MapConfig) -> Self {
        Self {
            config,
            size: None,
            interactive: true,
            show_attribution: true,
            id: egui::Id::new("mapview_map"),
        }
    }

    /// Initial centre. Only used when the map state is first created.
    pub fn center(mut self, lat: f64, lng: f64) -> Self {
        self.config.center = LatLng::new(lat, lng);
        self
    }

    /// Initial zoom level
    pub fn zoom(mut self, zoom: u8) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn tile_server(mut self, server: TileServerConfig) -> Self {
        self.config.tile_server = server;
        self
    }

    /// Fixed widget size, otherwise all available space is used
    pub fn size(mut self, size: Vec2) -> Self {
        self.size = Some(size);
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn attribution(mut self, show: bool) -> Self {
        self.show_attribution = show;
        self
    }

    /// Distinguishes several maps in one UI
    pub fn id(mut self, id: impl std::hash::Hash) -> Self {
        self.id = egui::Id::new(id);
        self
    }

    /// Runs `f` on the map stored under this widget's id. Returns `None` before
    /// the widget has been shown once or when the map failed to initialize.
    pub fn with_map<R>(&self, ctx: &egui::Context, f: impl FnOnce(&mut Map) -> R) -> Option<R> {
        let state = ctx.memory(|mem| mem.data.get_temp::<Arc<Mutex<WidgetState>>>(self.id))?;
        let mut state = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &mut *state {
            WidgetState::Ready(map_state) => Some(f(&mut map_state.map)),
            WidgetState::Failed(_) => None,
        }
    }

    fn state(&self, ctx: &egui::Context, rect: Rect) -> Arc<Mutex<WidgetState>> {
        if let Some(state) = ctx.memory(|mem| mem.data.get_temp::<Arc<Mutex<WidgetState>>>(self.id)) {
            return state;
        }

        let mut config = self.config.clone();
        config.size = canvas_size(rect);
        let state = match Map::new(config) {
            Ok(map) => WidgetState::Ready(MapState {
                map,
                drawer: TextureDrawer::new(ctx.clone()),
                drag: Vec2::ZERO,
            }),
            Err(e) => {
                log::error!("failed to create map: {}", e);
                WidgetState::Failed(e.to_string())
            }
        };
        let state = Arc::new(Mutex::new(state));
        ctx.memory_mut(|mem| mem.data.insert_temp(self.id, Arc::clone(&state)));
        state
    }
}

impl Widget for MapWidget {
    fn ui(self, ui: &mut Ui) -> Response {
        let desired_size = self.size.unwrap_or_else(|| ui.available_size());
        let (rect, response) = ui.allocate_exact_size(desired_size, Sense::click_and_drag());

        let state = self.state(ui.ctx(), rect);
        let mut state = match state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        match &mut *state {
            WidgetState::Ready(map_state) => {
                if self.interactive {
                    map_state.handle_input(ui, rect, &response);
                }
                map_state.sync(rect);
                map_state.paint(ui, rect, self.show_attribution);
                if map_state.map.is_loading() {
                    ui.ctx().request_repaint_after(Duration::from_millis(50));
                }
            }
            WidgetState::Failed(message) => {
                let painter = ui.painter_at(rect);
                painter.rect_filled(rect, 0.0, Color32::from_rgb(255, 200, 200));
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    format!("Map failed to initialize: {}", message),
                    egui::FontId::proportional(14.0),
                    Color32::from_rgb(150, 0, 0),
                );
            }
        }

        response
    }
}

enum WidgetState {
    Ready(MapState),
    Failed(String),
}

struct MapState {
    map: Map,
    drawer: TextureDrawer,
    /// Total displacement of the current drag gesture
    drag: Vec2,
}

impl MapState {
    fn handle_input(&mut self, ui: &Ui, rect: Rect, response: &Response) {
        if response.dragged() {
            let delta = response.drag_delta();
            if delta != Vec2::ZERO {
                self.drag += delta;
                if let Err(e) = self.map.on_drag_update(self.drag.x as f64, self.drag.y as f64) {
                    log::warn!("tile request failed: {}", e);
                }
            }
        }
        if response.drag_released() {
            self.map.on_drag_commit();
            self.drag = Vec2::ZERO;
        }

        if let Some(pointer) = response.hover_pos() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let at = pointer - rect.min;
                let delta = if scroll > 0.0 { 1 } else { -1 };
                match self.map.on_zoom(Point::new(at.x as f64, at.y as f64), delta) {
                    // The zoom folded the drag so far into the origin
                    Ok(true) => self.drag = Vec2::ZERO,
                    Ok(false) => {}
                    Err(e) => log::warn!("tile request failed: {}", e),
                }
            }
        }
    }

    /// Follows widget resizes, requests missing tiles and uploads arrivals.
    fn sync(&mut self, rect: Rect) {
        let size = canvas_size(rect);
        let result = if size != self.map.viewport().size() {
            self.map.on_resize(size.0, size.1).map(|_| 0)
        } else {
            self.map.request_visible()
        };
        if let Err(e) = result {
            log::warn!("tile request failed: {}", e);
        }
        self.map.process_arrivals(&mut self.drawer);
    }

    fn paint(&self, ui: &Ui, rect: Rect, show_attribution: bool) {
        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 0.0, BACKGROUND);

        let viewport = self.map.viewport();
        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
        for (spec, handle) in viewport.displayed_tiles() {
            if spec.zoom() != viewport.zoom() {
                continue;
            }
            let tile_rect = to_screen(rect, viewport.screen_rect(spec));
            if !rect.intersects(tile_rect) {
                continue;
            }
            match self.drawer.textures.get(handle) {
                Some(TileTexture::Loaded(texture)) => {
                    painter.image(texture.id(), tile_rect, uv, Color32::WHITE);
                }
                Some(TileTexture::Placeholder) | None => {
                    painter.rect_filled(tile_rect, 0.0, PLACEHOLDER);
                }
            }
        }

        let attribution = &self.map.server().attribution;
        if show_attribution && !attribution.is_empty() {
            painter.text(
                rect.right_bottom() - Vec2::new(4.0, 2.0),
                egui::Align2::RIGHT_BOTTOM,
                attribution,
                egui::FontId::proportional(11.0),
                Color32::from_gray(60),
            );
        }
    }
}

fn canvas_size(rect: Rect) -> (u32, u32) {
    (rect.width().max(1.0) as u32, rect.height().max(1.0) as u32)
}

fn to_screen(canvas: Rect, bounds: Bounds) -> Rect {
    Rect::from_min_max(
        Pos2::new(
            canvas.min.x + bounds.min.x as f32,
            canvas.min.y + bounds.min.y as f32,
        ),
        Pos2::new(
            canvas.min.x + bounds.max.x as f32,
            canvas.min.y + bounds.max.y as f32,
        ),
    )
}

enum TileTexture {
    Loaded(TextureHandle),
    Placeholder,
}

/// Uploads tile images as egui textures. Tiles that cannot be decoded are
/// remembered as placeholders and painted gray.
pub struct TextureDrawer {
    ctx: egui::Context,
    textures: FxHashMap<DrawHandle, TileTexture>,
    next_handle: u64,
}

impl TextureDrawer {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            textures: FxHashMap::default(),
            next_handle: 0,
        }
    }

    /// Whether the tile behind `handle` has a real texture
    pub fn has_texture(&self, handle: DrawHandle) -> bool {
        matches!(self.textures.get(&handle), Some(TileTexture::Loaded(_)))
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn load(&self, spec: &TileSpec, path: &Path) -> crate::Result<TextureHandle> {
        let rgba = image::open(path)?.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let image = ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
        Ok(self
            .ctx
            .load_texture(format!("tile_{}", spec), image, egui::TextureOptions::LINEAR))
    }
}

impl TileDrawer for TextureDrawer {
    fn draw_tile(&mut self, spec: &TileSpec, _rect: Bounds, image: TileImage<'_>) -> DrawHandle {
        let texture = match image {
            TileImage::File(path) => match self.load(spec, path) {
                Ok(texture) => TileTexture::Loaded(texture),
                Err(e) => {
                    log::warn!("cannot decode tile {} at {}: {}", spec, path.display(), e);
                    TileTexture::Placeholder
                }
            },
            TileImage::Missing => TileTexture::Placeholder,
        };

        let handle = DrawHandle(self.next_handle);
        self.next_handle += 1;
        self.textures.insert(handle, texture);
        self.ctx.request_repaint();
        handle
    }
}

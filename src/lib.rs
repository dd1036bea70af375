//! # mapview
//!
//! Slippy-map engine for desktop map widgets.
//!
//! The crate covers the parts of a tiled map that do not depend on a GUI
//! toolkit: Web-Mercator projection, tile addressing, viewport tracking
//! (drag, zoom, visible tile ranges) and a threaded tile fetcher backed by a
//! disk cache. An optional egui widget (`egui` feature) puts it on screen.

pub mod core;
pub mod tiles;

#[cfg(feature = "egui")]
pub mod ui;

pub mod prelude;

pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::Bounds,
    config::{MapConfig, TileLoaderConfig},
    geo::{Coordinate, LatLng, LatLngBounds, Point, TileCoord, TileRange},
    map::Map,
    viewport::{DragState, DrawHandle, TileDrawer, TileImage, Viewport},
};

pub use crate::tiles::{
    cache::DiskCache,
    loader::{HttpFetcher, TileArrival, TileFetcher, TileLoader},
    source::{TileServerConfig, TileSource},
    spec::TileSpec,
};

#[cfg(feature = "egui")]
pub use crate::ui::{MapWidget, UiMapExt};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, MapError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("{what} out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Http { status: u16, url: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Error type alias for convenience
pub type Error = MapError;

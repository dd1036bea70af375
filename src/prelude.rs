//! Prelude module for common mapview types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use mapview::prelude::*;`

pub use crate::core::{
    bounds::Bounds,
    config::{MapConfig, TileLoaderConfig},
    geo::{tiles_around_center, Coordinate, LatLng, LatLngBounds, Point, TileCoord, TileRange},
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
pub use crate::ui::{MapWidget, TextureDrawer, UiMapExt};

pub use crate::{MapError, Result};

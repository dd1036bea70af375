use crate::core::geo::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in canvas pixels, `min` at the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    /// Creates new bounds from two points
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(Point::new(min_x, min_y), Point::new(max_x, max_y))
    }

    /// Creates bounds from the top-left corner and a size
    pub fn from_min_size(min: Point, width: f64, height: f64) -> Self {
        Self::new(min, Point::new(min.x + width, min.y + height))
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Returns the same rectangle shifted by `delta`
    pub fn translate(&self, delta: Point) -> Bounds {
        Bounds::new(self.min.add(&delta), self.max.add(&delta))
    }

}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(Point::new(0.0, 0.0), Point::new(0.0, 0.0))
    }
}

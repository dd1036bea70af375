pub mod cache;
pub mod loader;
pub mod source;
pub mod spec;

// Re-exports for convenience
pub use cache::DiskCache;
pub use loader::{TileArrival, TileLoader};
pub use source::{TileServerConfig, TileSource};
pub use spec::TileSpec;

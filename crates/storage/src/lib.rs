//! Storage for the Landsat tile service.
//!
//! Provides:
//! - The scene catalog loaded from the scene-list CSV
//! - The on-disk tile cache with per-key single-flight computation

pub mod catalog;
pub mod scene;
pub mod single_flight;
pub mod tile_cache;

pub use catalog::{CatalogError, SceneCatalog};
pub use scene::Scene;
pub use single_flight::SingleFlight;
pub use tile_cache::{CacheKey, CacheStatsSnapshot, TileCache, TileCacheStats};

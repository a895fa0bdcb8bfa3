//! Common types and utilities shared across the Landsat tile service crates.

pub mod error;
pub mod extent;
pub mod geotransform;
pub mod grid;
pub mod pyramid;

pub use error::{TileError, TileResult};
pub use extent::{clamp, clamp_above, clamp_below, Extent};
pub use geotransform::AffineTransform;
pub use grid::{BandGrid, PixelArray};
pub use pyramid::{Quadrant, Tile, TileAddress, TilePyramid};

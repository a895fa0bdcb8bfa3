//! Elevation sampling over regular height grids.

pub mod heightfield;
pub mod interpolation;

pub use heightfield::{HeightField, HeightFieldError};
pub use interpolation::Interpolation;

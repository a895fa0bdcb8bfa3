//! Raster access for the Landsat tile service.
//!
//! A [`Dataset`] wraps any [`RasterSource`] with its inverted geotransform and
//! answers "give me these bands over this extent at this size". Scenes from
//! the catalog become datasets through a [`SceneMaterializer`].

pub mod error;
pub mod geotiff;
pub mod materialize;
pub mod memory;
pub mod resample;
pub mod source;
pub mod window;

pub use error::{RasterError, RasterResult};
pub use geotiff::GeoTiffRaster;
pub use materialize::{GdalConfig, GdalMaterializer, SceneMaterializer};
pub use memory::MemoryRaster;
pub use source::{Dataset, RasterSource};
pub use window::{compute_window, PixelWindow};

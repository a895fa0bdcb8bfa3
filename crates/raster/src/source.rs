//! Raster sources and the georeferenced dataset wrapper.

use std::fmt;
use std::sync::Arc;

use tile_common::geotransform::GeoMapper;
use tile_common::{AffineTransform, BandGrid, Extent, PixelArray};
use tracing::debug;

use crate::error::{RasterError, RasterResult};
use crate::resample;
use crate::window::{compute_window, PixelWindow};

/// Random access to the pixels of a multi-band raster.
///
/// Bands are numbered from 1.
pub trait RasterSource: Send + Sync {
    /// Raster size as (width, height) in pixels.
    fn size(&self) -> (usize, usize);

    fn band_count(&self) -> usize;

    /// Pixel to geographic transform.
    fn geotransform(&self) -> AffineTransform;

    /// Read a window of one band at native resolution.
    fn read_window(&self, band: usize, window: &PixelWindow) -> RasterResult<BandGrid>;

    /// Read the same window of several bands, in the order given.
    ///
    /// Sources that decode all bands of a pixel together should override this
    /// so each block is decoded once per call.
    fn read_windows(&self, bands: &[usize], window: &PixelWindow) -> RasterResult<Vec<BandGrid>> {
        bands
            .iter()
            .map(|&band| self.read_window(band, window))
            .collect()
    }
}

/// Check a band number and window against a source before reading.
pub(crate) fn check_read(
    source: &dyn RasterSource,
    band: usize,
    window: &PixelWindow,
) -> RasterResult<()> {
    let count = source.band_count();
    if band == 0 || band > count {
        return Err(RasterError::BandOutOfRange { band, count });
    }
    let (width, height) = source.size();
    if !window.fits(width, height) {
        return Err(RasterError::WindowOutOfBounds {
            min_x: window.x_off as i64,
            min_y: window.y_off as i64,
            max_x: (window.x_off + window.width) as i64,
            max_y: (window.y_off + window.height) as i64,
            width,
            height,
        });
    }
    Ok(())
}

/// A raster source with its geotransform inverted and extent computed.
///
/// Cloning is cheap; the underlying source is shared.
#[derive(Clone)]
pub struct Dataset {
    name: String,
    source: Arc<dyn RasterSource>,
    mapper: GeoMapper,
    extent: Extent,
}

impl Dataset {
    /// Wrap a source. Fails if its geotransform is not invertible.
    pub fn new(name: impl Into<String>, source: Arc<dyn RasterSource>) -> RasterResult<Self> {
        let name = name.into();
        let transform = source.geotransform();
        let mapper =
            GeoMapper::new(transform).ok_or_else(|| RasterError::SingularTransform(name.clone()))?;
        let (width, height) = source.size();
        let extent = transform.raster_extent(width, height);

        Ok(Self {
            name,
            source,
            mapper,
            extent,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Geographic extent from the lower-left and upper-right pixel corners.
    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    pub fn size(&self) -> (usize, usize) {
        self.source.size()
    }

    pub fn band_count(&self) -> usize {
        self.source.band_count()
    }

    /// Band numbers `1..=band_count`.
    pub fn all_bands(&self) -> Vec<usize> {
        (1..=self.band_count()).collect()
    }

    pub fn pixel_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        self.mapper.pixel_to_geo(x, y)
    }

    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.mapper.geo_to_pixel(x, y)
    }

    /// Pixel window covering a geographic extent.
    pub fn window_for(&self, extent: &Extent) -> RasterResult<PixelWindow> {
        compute_window(&self.mapper, &self.extent, self.size(), extent)
    }

    /// Sample one band over `extent` into a `buf_rows` x `buf_cols` grid.
    pub fn read_band(
        &self,
        band: usize,
        extent: &Extent,
        buf_rows: usize,
        buf_cols: usize,
    ) -> RasterResult<BandGrid> {
        let window = self.window_for(extent)?;
        self.read_resampled(band, &window, buf_rows, buf_cols)
    }

    /// Sample several bands over `extent`, stacked in the order given.
    pub fn read_bands(
        &self,
        bands: &[usize],
        extent: &Extent,
        buf_rows: usize,
        buf_cols: usize,
    ) -> RasterResult<PixelArray> {
        if bands.is_empty() {
            return Err(RasterError::Invalid("no bands requested".to_string()));
        }
        let window = self.window_for(extent)?;
        debug!(
            dataset = %self.name,
            x_off = window.x_off,
            y_off = window.y_off,
            width = window.width,
            height = window.height,
            "Reading bands"
        );

        for &band in bands {
            check_read(self.source.as_ref(), band, &window)?;
        }
        let grids: Vec<BandGrid> = self
            .source
            .read_windows(bands, &window)?
            .iter()
            .map(|native| resample::nearest(native, buf_rows, buf_cols))
            .collect();

        PixelArray::stack(&grids).map_err(|e| RasterError::Invalid(e.to_string()))
    }

    fn read_resampled(
        &self,
        band: usize,
        window: &PixelWindow,
        buf_rows: usize,
        buf_cols: usize,
    ) -> RasterResult<BandGrid> {
        check_read(self.source.as_ref(), band, window)?;
        let native = self.source.read_window(band, window)?;
        Ok(resample::nearest(&native, buf_rows, buf_cols))
    }
}

impl fmt::Debug for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dataset")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("bands", &self.band_count())
            .field("extent", &self.extent)
            .finish()
    }
}

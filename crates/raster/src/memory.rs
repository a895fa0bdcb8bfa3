//! In-memory raster source.

use tile_common::{AffineTransform, BandGrid};

use crate::error::{RasterError, RasterResult};
use crate::source::{check_read, RasterSource};
use crate::window::PixelWindow;

/// A raster held entirely in memory, one row-major buffer per band.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    width: usize,
    height: usize,
    transform: AffineTransform,
    bands: Vec<Vec<f32>>,
}

impl MemoryRaster {
    pub fn new(
        width: usize,
        height: usize,
        transform: AffineTransform,
        bands: Vec<Vec<f32>>,
    ) -> RasterResult<Self> {
        if bands.is_empty() {
            return Err(RasterError::Invalid("raster has no bands".to_string()));
        }
        if let Some((i, band)) = bands
            .iter()
            .enumerate()
            .find(|(_, b)| b.len() != width * height)
        {
            return Err(RasterError::Invalid(format!(
                "band {} has {} samples, expected {}",
                i + 1,
                band.len(),
                width * height
            )));
        }
        Ok(Self {
            width,
            height,
            transform,
            bands,
        })
    }

    /// Build a raster by evaluating `f(band, col, row)` for every sample.
    pub fn from_fn(
        width: usize,
        height: usize,
        band_count: usize,
        transform: AffineTransform,
        f: impl Fn(usize, usize, usize) -> f32,
    ) -> Self {
        let bands = (1..=band_count)
            .map(|band| {
                let mut data = Vec::with_capacity(width * height);
                for row in 0..height {
                    for col in 0..width {
                        data.push(f(band, col, row));
                    }
                }
                data
            })
            .collect();
        Self {
            width,
            height,
            transform,
            bands,
        }
    }
}

impl RasterSource for MemoryRaster {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn band_count(&self) -> usize {
        self.bands.len()
    }

    fn geotransform(&self) -> AffineTransform {
        self.transform
    }

    fn read_window(&self, band: usize, window: &PixelWindow) -> RasterResult<BandGrid> {
        check_read(self, band, window)?;
        let src = &self.bands[band - 1];

        let mut data = Vec::with_capacity(window.width * window.height);
        for row in window.y_off..window.y_off + window.height {
            let start = row * self.width + window.x_off;
            data.extend_from_slice(&src[start..start + window.width]);
        }

        Ok(BandGrid {
            rows: window.height,
            cols: window.width,
            data,
        })
    }
}

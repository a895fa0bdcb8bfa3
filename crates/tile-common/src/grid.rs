//! Pixel arrays produced by raster reads and stored in the tile cache.

use serde::{Deserialize, Serialize};

use crate::{TileError, TileResult};

/// A single-band 2D array, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandGrid {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl BandGrid {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> TileResult<Self> {
        if data.len() != rows * cols {
            return Err(TileError::Internal(format!(
                "band grid of {}x{} needs {} values, got {}",
                rows,
                cols,
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.data[row * self.cols + col])
    }
}

/// A rows x cols x bands array with the bands of each pixel stored
/// contiguously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelArray {
    pub rows: usize,
    pub cols: usize,
    pub bands: usize,
    pub data: Vec<f32>,
}

impl PixelArray {
    pub fn new(rows: usize, cols: usize, bands: usize, data: Vec<f32>) -> TileResult<Self> {
        let expected = rows * cols * bands;
        if data.len() != expected {
            return Err(TileError::Internal(format!(
                "pixel array of {}x{}x{} needs {} values, got {}",
                rows,
                cols,
                bands,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            bands,
            data,
        })
    }

    /// Stack single-band grids of equal shape along the band axis.
    pub fn stack(grids: &[BandGrid]) -> TileResult<Self> {
        let first = grids
            .first()
            .ok_or_else(|| TileError::InvalidRequest("no bands to stack".to_string()))?;
        let (rows, cols) = (first.rows, first.cols);

        if let Some(odd) = grids.iter().find(|g| g.rows != rows || g.cols != cols) {
            return Err(TileError::Internal(format!(
                "cannot stack {}x{} band with {}x{} band",
                odd.rows, odd.cols, rows, cols
            )));
        }

        let bands = grids.len();
        let mut data = Vec::with_capacity(rows * cols * bands);
        for i in 0..rows * cols {
            for grid in grids {
                data.push(grid.data[i]);
            }
        }

        Ok(Self {
            rows,
            cols,
            bands,
            data,
        })
    }

    pub fn get(&self, row: usize, col: usize, band: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols || band >= self.bands {
            return None;
        }
        Some(self.data[(row * self.cols + col) * self.bands + band])
    }

    /// Number of samples (rows * cols * bands).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<BandGrid> for PixelArray {
    fn from(grid: BandGrid) -> Self {
        Self {
            rows: grid.rows,
            cols: grid.cols,
            bands: 1,
            data: grid.data,
        }
    }
}

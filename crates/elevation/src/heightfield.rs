//! Height grid with geographic placement.
//!
//! Samples are addressed by column `c` (x) and row `r` (y). Column 0 lies on
//! the extent's west edge and row 0 on its south edge; the last column and
//! row land exactly on the east and north edges, so the sample spacing is
//! `extent size / (dimension - 1)`.

use tile_common::Extent;

use crate::interpolation::{bilinear, weighted_average, Corners, Interpolation, Neighbourhood};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HeightFieldError {
    #[error("height grid must have at least one column and one row, got {width}x{height}")]
    Empty { width: usize, height: usize },

    #[error("height grid of {width}x{height} needs {expected} samples, got {actual}")]
    SizeMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

/// An immutable 2D height grid covering a geographic extent.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    /// Row-major: sample (c, r) lives at `r * width + c`
    heights: Vec<f64>,
    extent: Extent,
}

impl HeightField {
    pub fn new(
        width: usize,
        height: usize,
        heights: Vec<f64>,
        extent: Extent,
    ) -> Result<Self, HeightFieldError> {
        if width == 0 || height == 0 {
            return Err(HeightFieldError::Empty { width, height });
        }
        let expected = width * height;
        if heights.len() != expected {
            return Err(HeightFieldError::SizeMismatch {
                width,
                height,
                expected,
                actual: heights.len(),
            });
        }
        Ok(Self {
            width,
            height,
            heights,
            extent,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn extent(&self) -> &Extent {
        &self.extent
    }

    /// Stored sample at an integer cell.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.heights[row * self.width + col])
    }

    fn at(&self, col: usize, row: usize) -> f64 {
        self.heights[row * self.width + col]
    }

    /// Elevation at a fractional pixel position.
    ///
    /// Returns `None` when `(c, r)` lies outside `[0, width-1] x [0, height-1]`.
    pub fn elevation_at_pixel(&self, c: f64, r: f64, mode: Interpolation) -> Option<f64> {
        if c.is_nan() || r.is_nan() {
            return None;
        }
        let max_c = (self.width - 1) as f64;
        let max_r = (self.height - 1) as f64;
        if c < 0.0 || c > max_c || r < 0.0 || r > max_r {
            return None;
        }

        let value = match mode {
            Interpolation::Nearest => self.at(c as usize, r as usize),
            Interpolation::Bilinear => {
                let (n, corners) = self.neighbourhood(c, r);
                bilinear(c, r, &n, &corners)
            }
            // The average blend weights the clamped corners by the remainders
            // against the truncated cell, not against col_min/row_min.
            Interpolation::Average => {
                let (_, corners) = self.neighbourhood(c, r);
                weighted_average(c, r, &corners)
            }
        };
        Some(value)
    }

    fn neighbourhood(&self, c: f64, r: f64) -> (Neighbourhood, Corners) {
        let n = Neighbourhood::around(c, r, self.width, self.height);
        let corners = Corners {
            ll: self.at(n.col_min, n.row_min),
            ul: self.at(n.col_min, n.row_max),
            lr: self.at(n.col_max, n.row_min),
            ur: self.at(n.col_max, n.row_max),
        };
        (n, corners)
    }

    /// Elevation at a geographic location.
    pub fn elevation_at_location(&self, x: f64, y: f64, mode: Interpolation) -> Option<f64> {
        let (c, r) = self.location_to_pixel(x, y)?;
        self.elevation_at_pixel(c, r, mode)
    }

    /// Fractional pixel position of a geographic location.
    ///
    /// `None` for single-column or single-row grids, whose spacing is undefined.
    pub fn location_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.width < 2 || self.height < 2 {
            return None;
        }
        let x_interval = self.extent.width() / (self.width - 1) as f64;
        let y_interval = self.extent.height() / (self.height - 1) as f64;
        let px = (x - self.extent.min_x) / x_interval;
        let py = (y - self.extent.min_y) / y_interval;
        Some((px, py))
    }
}

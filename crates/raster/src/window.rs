//! Pixel read windows for geographic extents.

use tile_common::geotransform::GeoMapper;
use tile_common::Extent;

use crate::error::{RasterError, RasterResult};

/// Distance from an integer below which a pixel coordinate is treated as
/// that integer before rounding outwards.
const PIXEL_SNAP_EPSILON: f64 = 1e-6;

/// A rectangular block of source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub x_off: usize,
    pub y_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(x_off: usize, y_off: usize, width: usize, height: usize) -> Self {
        Self {
            x_off,
            y_off,
            width,
            height,
        }
    }

    /// Whether the window lies inside a raster of the given size.
    pub fn fits(&self, raster_width: usize, raster_height: usize) -> bool {
        self.x_off + self.width <= raster_width && self.y_off + self.height <= raster_height
    }
}

fn snap(v: f64) -> f64 {
    let rounded = v.round();
    if (v - rounded).abs() < PIXEL_SNAP_EPSILON {
        rounded
    } else {
        v
    }
}

/// Compute the pixel window covering `requested` within a dataset.
///
/// The overlap of the dataset extent and the request is mapped through the
/// inverse transform. The min corner is floored and the max corner ceiled, so
/// the window always covers the overlap. Windows reaching outside the raster
/// are rejected rather than clipped, and a window that collapses to zero
/// width or height counts as no overlap.
pub fn compute_window(
    mapper: &GeoMapper,
    dataset_extent: &Extent,
    raster_size: (usize, usize),
    requested: &Extent,
) -> RasterResult<PixelWindow> {
    let no_overlap = || RasterError::NoIntersection {
        dataset: dataset_extent.to_string(),
        requested: requested.to_string(),
    };

    let inter = dataset_extent.intersection(requested).ok_or_else(no_overlap)?;

    // Lower-left maps to (min col, max row), upper-right to (max col, min row)
    let (ax, ay) = mapper.geo_to_pixel(inter.min_x, inter.min_y);
    let (bx, by) = mapper.geo_to_pixel(inter.max_x, inter.max_y);

    let min_x = snap(ax.min(bx)).floor() as i64;
    let min_y = snap(ay.min(by)).floor() as i64;
    let max_x = snap(ax.max(bx)).ceil() as i64;
    let max_y = snap(ay.max(by)).ceil() as i64;

    let (width, height) = raster_size;
    if min_x < 0 || min_y < 0 || max_x > width as i64 || max_y > height as i64 {
        return Err(RasterError::WindowOutOfBounds {
            min_x,
            min_y,
            max_x,
            max_y,
            width,
            height,
        });
    }

    if max_x == min_x || max_y == min_y {
        return Err(no_overlap());
    }

    Ok(PixelWindow::new(
        min_x as usize,
        min_y as usize,
        (max_x - min_x) as usize,
        (max_y - min_y) as usize,
    ))
}

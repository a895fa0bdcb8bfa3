//! Affine geotransforms between pixel and geographic coordinates.

use serde::{Deserialize, Serialize};

use crate::Extent;

/// Determinant magnitude below which a transform is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-15;

/// A 2D affine transform in GDAL coefficient order.
///
/// Maps pixel coordinates (x, y) to geographic coordinates (X, Y):
///   X = c0 + c1 * x + c2 * y
///   Y = c3 + c4 * x + c5 * y
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub coefficients: [f64; 6],
}

impl AffineTransform {
    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64, c4: f64, c5: f64) -> Self {
        Self {
            coefficients: [c0, c1, c2, c3, c4, c5],
        }
    }

    /// Create from a GDAL-style geotransform array.
    pub fn from_gdal(gt: &[f64; 6]) -> Self {
        Self { coefficients: *gt }
    }

    /// Convert to a GDAL-style geotransform array.
    pub fn to_gdal(&self) -> [f64; 6] {
        self.coefficients
    }

    /// North-up transform with the given top-left origin and pixel size.
    /// `pixel_height` is positive; rows grow southwards.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self::new(origin_x, pixel_width, 0.0, origin_y, 0.0, -pixel_height)
    }

    /// Determinant of the 2x2 linear part.
    pub fn determinant(&self) -> f64 {
        let c = &self.coefficients;
        c[1] * c[5] - c[2] * c[4]
    }

    /// Apply the transform to a point.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let c = &self.coefficients;
        let out_x = c[0] + c[1] * x + c[2] * y;
        let out_y = c[3] + c[4] * x + c[5] * y;
        (out_x, out_y)
    }

    /// Compute the inverse transform, or `None` if the transform is singular.
    pub fn invert(&self) -> Option<AffineTransform> {
        let det = self.determinant();
        if det.abs() < SINGULAR_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let c = &self.coefficients;

        Some(AffineTransform::new(
            (c[2] * c[3] - c[0] * c[5]) * inv_det,
            c[5] * inv_det,
            -c[2] * inv_det,
            (-c[1] * c[3] + c[0] * c[4]) * inv_det,
            -c[4] * inv_det,
            c[1] * inv_det,
        ))
    }

    /// Geographic extent covered by a raster of `width` x `height` pixels.
    ///
    /// Uses the lower-left pixel corner `(0, height)` and the upper-right
    /// corner `(width, 0)`, which is exact for north-up rasters.
    pub fn raster_extent(&self, width: usize, height: usize) -> Extent {
        let (llx, lly) = self.apply(0.0, height as f64);
        let (urx, ury) = self.apply(width as f64, 0.0);
        Extent::new(llx, lly, urx, ury)
    }
}

/// A transform paired with its precomputed inverse.
///
/// Construction fails for singular transforms, so a `GeoMapper` can always
/// convert in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoMapper {
    forward: AffineTransform,
    inverse: AffineTransform,
}

impl GeoMapper {
    pub fn new(forward: AffineTransform) -> Option<Self> {
        forward.invert().map(|inverse| Self { forward, inverse })
    }

    pub fn forward(&self) -> &AffineTransform {
        &self.forward
    }

    pub fn inverse(&self) -> &AffineTransform {
        &self.inverse
    }

    /// Pixel coordinates to geographic coordinates.
    pub fn pixel_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        self.forward.apply(x, y)
    }

    /// Geographic coordinates to (fractional) pixel coordinates.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.inverse.apply(x, y)
    }
}

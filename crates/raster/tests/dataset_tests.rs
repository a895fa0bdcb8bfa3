//! Tests for extent reads through a Dataset.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use raster::{Dataset, MemoryRaster, PixelWindow, RasterError, RasterResult, RasterSource};
use tile_common::{AffineTransform, BandGrid, Extent, TileError};

/// 40 x 20 pixels of 0.25 degrees covering (-5, 40) to (5, 45).
/// Sample value encodes band, column and row.
fn dataset() -> Dataset {
    let raster = MemoryRaster::from_fn(
        40,
        20,
        3,
        AffineTransform::north_up(-5.0, 45.0, 0.25, 0.25),
        |band, col, row| (band * 10000 + row * 100 + col) as f32,
    );
    Dataset::new("LC80010012015001LGN00", Arc::new(raster)).unwrap()
}

// ============================================================================
// Georeferencing
// ============================================================================

#[test]
fn test_dataset_extent_from_corners() {
    let ds = dataset();
    assert_eq!(*ds.extent(), Extent::new(-5.0, 40.0, 5.0, 45.0));
    assert_eq!(ds.all_bands(), vec![1, 2, 3]);
}

#[test]
fn test_pixel_geo_round_trip() {
    let ds = dataset();
    for &(px, py) in &[(0.0, 0.0), (13.5, 7.25), (40.0, 20.0)] {
        let (x, y) = ds.pixel_to_geo(px, py);
        let (bx, by) = ds.geo_to_pixel(x, y);
        assert_relative_eq!(bx, px, epsilon = 1e-9);
        assert_relative_eq!(by, py, epsilon = 1e-9);
    }
}

#[test]
fn test_singular_transform_rejected() {
    let raster = MemoryRaster::from_fn(
        4,
        4,
        1,
        AffineTransform::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
        |_, _, _| 0.0,
    );
    let err = Dataset::new("flat", Arc::new(raster)).unwrap_err();
    assert!(matches!(err, RasterError::SingularTransform(_)));
    assert!(matches!(TileError::from(err), TileError::TransformSingular(_)));
}

// ============================================================================
// Windows
// ============================================================================

#[test]
fn test_window_for_tile_inside_dataset() {
    let ds = dataset();
    let window = ds.window_for(&Extent::new(0.0, 42.0, 1.0, 43.0)).unwrap();
    assert_eq!(window, PixelWindow::new(20, 8, 4, 4));
}

#[test]
fn test_window_for_disjoint_tile() {
    let ds = dataset();
    let err = ds
        .window_for(&Extent::new(10.0, 42.0, 11.0, 43.0))
        .unwrap_err();
    assert!(matches!(err, RasterError::NoIntersection { .. }));
    assert_eq!(TileError::from(err).http_status_code(), 404);
}

// ============================================================================
// Reads
// ============================================================================

#[test]
fn test_read_band_native_resolution() {
    let ds = dataset();
    let grid = ds
        .read_band(2, &Extent::new(0.0, 42.0, 1.0, 43.0), 4, 4)
        .unwrap();
    assert_eq!(grid.rows, 4);
    assert_eq!(grid.cols, 4);
    // Top-left of the window is column 20, row 8
    assert_eq!(grid.get(0, 0), Some(20820.0));
    assert_eq!(grid.get(3, 3), Some(21123.0));
}

#[test]
fn test_read_band_resamples_to_buffer() {
    let ds = dataset();
    let grid = ds
        .read_band(1, &Extent::new(0.0, 42.0, 1.0, 43.0), 8, 8)
        .unwrap();
    assert_eq!(grid.data.len(), 64);
    assert_eq!(grid.get(0, 0), Some(10820.0));
    assert_eq!(grid.get(0, 1), Some(10820.0));
    assert_eq!(grid.get(7, 7), Some(11123.0));
}

#[test]
fn test_read_bands_stacks_in_requested_order() {
    let ds = dataset();
    let array = ds
        .read_bands(&[3, 1], &Extent::new(0.0, 42.0, 1.0, 43.0), 2, 2)
        .unwrap();
    assert_eq!(array.bands, 2);
    assert_eq!(array.rows, 2);
    let (b3, b1) = (array.get(0, 0, 0).unwrap(), array.get(0, 0, 1).unwrap());
    assert_eq!(b3 - b1, 20000.0);
}

#[test]
fn test_read_bands_rejects_missing_band() {
    let ds = dataset();
    let err = ds
        .read_bands(&[1, 4], &Extent::new(0.0, 42.0, 1.0, 43.0), 2, 2)
        .unwrap_err();
    assert!(matches!(err, RasterError::BandOutOfRange { band: 4, count: 3 }));
}

#[test]
fn test_read_partially_overlapping_tile() {
    let ds = dataset();
    // Only the eastern half of this tile overlaps the dataset
    let array = ds
        .read_bands(&[1], &Extent::new(-7.0, 40.0, -3.0, 45.0), 16, 16)
        .unwrap();
    assert_eq!(array.len(), 256);
    assert_eq!(array.get(0, 0, 0), Some(10000.0));
}

/// Counts single-band and multi-band reads against an inner raster.
struct CountingRaster {
    inner: MemoryRaster,
    single_reads: AtomicUsize,
    multi_reads: AtomicUsize,
}

impl RasterSource for CountingRaster {
    fn size(&self) -> (usize, usize) {
        self.inner.size()
    }

    fn band_count(&self) -> usize {
        self.inner.band_count()
    }

    fn geotransform(&self) -> AffineTransform {
        self.inner.geotransform()
    }

    fn read_window(&self, band: usize, window: &PixelWindow) -> RasterResult<BandGrid> {
        self.single_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read_window(band, window)
    }

    fn read_windows(&self, bands: &[usize], window: &PixelWindow) -> RasterResult<Vec<BandGrid>> {
        self.multi_reads.fetch_add(1, Ordering::SeqCst);
        bands
            .iter()
            .map(|&band| self.inner.read_window(band, window))
            .collect()
    }
}

#[test]
fn test_read_bands_issues_one_multi_band_read() {
    let source = Arc::new(CountingRaster {
        inner: MemoryRaster::from_fn(
            40,
            20,
            3,
            AffineTransform::north_up(-5.0, 45.0, 0.25, 0.25),
            |band, col, row| (band * 10000 + row * 100 + col) as f32,
        ),
        single_reads: AtomicUsize::new(0),
        multi_reads: AtomicUsize::new(0),
    });
    let ds = Dataset::new("counted", source.clone()).unwrap();

    let array = ds
        .read_bands(&[1, 2, 3], &Extent::new(0.0, 42.0, 1.0, 43.0), 4, 4)
        .unwrap();
    assert_eq!(array.get(0, 0, 2), Some(30820.0));
    assert_eq!(source.multi_reads.load(Ordering::SeqCst), 1);
    assert_eq!(source.single_reads.load(Ordering::SeqCst), 0);
}

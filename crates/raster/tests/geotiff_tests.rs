//! Tests for the GeoTIFF raster source.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use raster::{Dataset, GeoTiffRaster, PixelWindow, RasterError, RasterSource};
use tempfile::TempDir;
use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;
use tile_common::Extent;

const WIDTH: u32 = 12;
const HEIGHT: u32 = 10;

fn sample(band: usize, col: usize, row: usize) -> u16 {
    (band * 1000 + row * 20 + col) as u16
}

/// Three-band 16-bit GeoTIFF with 0.5 degree pixels, top-left at (100, -20),
/// written in strips of three rows.
fn write_rgb16(path: &Path) {
    let mut data = Vec::with_capacity((WIDTH * HEIGHT * 3) as usize);
    for row in 0..HEIGHT as usize {
        for col in 0..WIDTH as usize {
            for band in 1..=3 {
                data.push(sample(band, col, row));
            }
        }
    }

    let mut file = File::create(path).unwrap();
    let mut tiff = TiffEncoder::new(&mut file).unwrap();
    let mut image = tiff.new_image::<colortype::RGB16>(WIDTH, HEIGHT).unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[0.5f64, 0.5, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 100.0, -20.0, 0.0][..])
        .unwrap();
    image.rows_per_strip(3).unwrap();
    image.write_data(&data).unwrap();
}

fn open() -> (TempDir, GeoTiffRaster) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scene.tif");
    write_rgb16(&path);
    let raster = GeoTiffRaster::open(&path).unwrap();
    (dir, raster)
}

#[test]
fn test_open_reads_layout_and_georeferencing() {
    let (_dir, raster) = open();
    assert_eq!(raster.size(), (12, 10));
    assert_eq!(raster.band_count(), 3);

    let t = raster.geotransform().to_gdal();
    assert_eq!(t, [100.0, 0.5, 0.0, -20.0, 0.0, -0.5]);
}

#[test]
fn test_read_window_spanning_strips() {
    let (_dir, raster) = open();
    // Rows 2..7 cross three strips
    let grid = raster
        .read_window(2, &PixelWindow::new(4, 2, 3, 5))
        .unwrap();
    assert_eq!(grid.rows, 5);
    assert_eq!(grid.cols, 3);
    for r in 0..5 {
        for c in 0..3 {
            assert_eq!(
                grid.get(r, c),
                Some(sample(2, c + 4, r + 2) as f32),
                "pixel ({}, {})",
                r,
                c
            );
        }
    }
}

#[test]
fn test_read_window_last_partial_strip() {
    let (_dir, raster) = open();
    let grid = raster
        .read_window(3, &PixelWindow::new(10, 9, 2, 1))
        .unwrap();
    assert_eq!(grid.data, vec![sample(3, 10, 9) as f32, sample(3, 11, 9) as f32]);
}

#[test]
fn test_read_windows_matches_single_band_reads() {
    let (_dir, raster) = open();
    let window = PixelWindow::new(3, 1, 7, 8);
    let grids = raster.read_windows(&[3, 1, 2], &window).unwrap();
    assert_eq!(grids.len(), 3);
    for (grid, band) in grids.iter().zip([3, 1, 2]) {
        assert_eq!(*grid, raster.read_window(band, &window).unwrap());
    }
    assert_eq!(grids[0].get(7, 6), Some(sample(3, 9, 8) as f32));
}

#[test]
fn test_read_windows_rejects_missing_band() {
    let (_dir, raster) = open();
    let err = raster
        .read_windows(&[1, 4], &PixelWindow::new(0, 0, 2, 2))
        .unwrap_err();
    assert!(matches!(err, RasterError::BandOutOfRange { band: 4, count: 3 }));
}

#[test]
fn test_read_window_outside_raster() {
    let (_dir, raster) = open();
    let err = raster
        .read_window(1, &PixelWindow::new(10, 0, 4, 1))
        .unwrap_err();
    assert!(matches!(err, RasterError::WindowOutOfBounds { .. }));
}

#[test]
fn test_dataset_over_geotiff() {
    let (_dir, raster) = open();
    let ds = Dataset::new("scene", Arc::new(raster)).unwrap();
    assert_eq!(*ds.extent(), Extent::new(100.0, -25.0, 106.0, -20.0));

    let array = ds
        .read_bands(&ds.all_bands(), &Extent::new(101.0, -22.0, 102.0, -21.0), 2, 2)
        .unwrap();
    assert_eq!(array.bands, 3);
    assert_eq!(array.get(0, 0, 0), Some(sample(1, 2, 2) as f32));
    assert_eq!(array.get(1, 1, 2), Some(sample(3, 3, 3) as f32));
}

#[test]
fn test_open_without_georeferencing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.tif");
    {
        let mut file = File::create(&path).unwrap();
        let mut tiff = TiffEncoder::new(&mut file).unwrap();
        tiff.write_image::<colortype::Gray8>(2, 2, &[0u8, 1, 2, 3])
            .unwrap();
    }
    let err = GeoTiffRaster::open(&path).unwrap_err();
    assert!(matches!(err, RasterError::Invalid(_)));
}

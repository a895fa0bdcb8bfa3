//! GeoTIFF raster source.
//!
//! Georeferencing comes from the ModelTransformation tag when present,
//! otherwise from ModelTiepoint + ModelPixelScale. Reads decode only the
//! strips or tiles that overlap the requested window; samples must be
//! pixel-interleaved.

use std::fs::File;
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tile_common::{AffineTransform, BandGrid};
use tracing::debug;

use crate::error::{RasterError, RasterResult};
use crate::source::{check_read, RasterSource};
use crate::window::PixelWindow;

const TAG_MODEL_TRANSFORMATION: u16 = 34264;

/// A GeoTIFF on local disk.
#[derive(Debug, Clone)]
pub struct GeoTiffRaster {
    path: PathBuf,
    width: usize,
    height: usize,
    chunk_width: usize,
    chunk_height: usize,
    chunks_across: usize,
    samples_per_pixel: usize,
    transform: AffineTransform,
}

impl GeoTiffRaster {
    pub fn open(path: impl AsRef<Path>) -> RasterResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut decoder = open_decoder(&path)?;

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let chunk_width = chunk_width.max(1) as usize;
        let chunk_height = chunk_height.max(1) as usize;

        let samples_per_pixel = decoder
            .find_tag(Tag::SamplesPerPixel)?
            .map(|v| v.into_u16())
            .transpose()?
            .unwrap_or(1)
            .max(1) as usize;

        let transform = read_geotransform(&mut decoder)
            .ok_or_else(|| RasterError::Invalid(format!("{} has no georeferencing", path.display())))?;

        debug!(
            path = %path.display(),
            width,
            height,
            bands = samples_per_pixel,
            "Opened GeoTIFF"
        );

        Ok(Self {
            path,
            width,
            height,
            chunk_width,
            chunk_height,
            chunks_across: width.div_ceil(chunk_width),
            samples_per_pixel,
            transform,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_decoder(path: &Path) -> RasterResult<Decoder<File>> {
    let decoder = Decoder::new(File::open(path)?)?;
    Ok(decoder.with_limits(Limits::unlimited()))
}

fn read_geotransform(decoder: &mut Decoder<File>) -> Option<AffineTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION)) {
        if m.len() >= 8 {
            return Some(AffineTransform::new(m[3], m[0], m[1], m[7], m[4], m[5]));
        }
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // Tie point (i, j, k) -> (x, y, z)
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(AffineTransform::north_up(origin_x, origin_y, scale[0], scale[1]))
}

fn into_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f32::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}

impl RasterSource for GeoTiffRaster {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn band_count(&self) -> usize {
        self.samples_per_pixel
    }

    fn geotransform(&self) -> AffineTransform {
        self.transform
    }

    fn read_window(&self, band: usize, window: &PixelWindow) -> RasterResult<BandGrid> {
        let mut grids = self.read_windows(&[band], window)?;
        Ok(grids.swap_remove(0))
    }

    fn read_windows(&self, bands: &[usize], window: &PixelWindow) -> RasterResult<Vec<BandGrid>> {
        for &band in bands {
            check_read(self, band, window)?;
        }
        let mut out: Vec<BandGrid> = bands
            .iter()
            .map(|_| BandGrid::filled(window.height, window.width, f32::NAN))
            .collect();
        if window.width == 0 || window.height == 0 || bands.is_empty() {
            return Ok(out);
        }

        let mut decoder = open_decoder(&self.path)?;
        let spp = self.samples_per_pixel;

        let first_cx = window.x_off / self.chunk_width;
        let last_cx = (window.x_off + window.width - 1) / self.chunk_width;
        let first_cy = window.y_off / self.chunk_height;
        let last_cy = (window.y_off + window.height - 1) / self.chunk_height;

        // Each overlapping chunk is decoded once and scattered into every band
        for cy in first_cy..=last_cy {
            for cx in first_cx..=last_cx {
                let index = (cy * self.chunks_across + cx) as u32;
                let (data_w, data_h) = decoder.chunk_data_dimensions(index);
                let (data_w, data_h) = (data_w as usize, data_h as usize);
                let values = into_f32(decoder.read_chunk(index)?);
                if values.len() < data_w * data_h * spp {
                    return Err(RasterError::Decode(format!(
                        "chunk {} of {} has {} samples, expected {}",
                        index,
                        self.path.display(),
                        values.len(),
                        data_w * data_h * spp
                    )));
                }

                let chunk_x0 = cx * self.chunk_width;
                let chunk_y0 = cy * self.chunk_height;

                let col_start = window.x_off.max(chunk_x0);
                let col_end = (window.x_off + window.width).min(chunk_x0 + data_w);
                let row_start = window.y_off.max(chunk_y0);
                let row_end = (window.y_off + window.height).min(chunk_y0 + data_h);

                for row in row_start..row_end {
                    let src_row = (row - chunk_y0) * data_w;
                    let dst_row = (row - window.y_off) * window.width;
                    for col in col_start..col_end {
                        let src = (src_row + col - chunk_x0) * spp;
                        let dst = dst_row + col - window.x_off;
                        for (grid, &band) in out.iter_mut().zip(bands) {
                            grid.data[dst] = values[src + band - 1];
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

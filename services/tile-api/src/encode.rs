//! Scaling raw tile arrays to 8-bit images and encoding them.

use std::io::Cursor;

use image::{DynamicImage, GrayAlphaImage, GrayImage, ImageOutputFormat, RgbImage, RgbaImage};
use tile_common::{clamp, PixelArray, TileError, TileResult};

const JPEG_QUALITY: u8 = 90;

/// Image formats a tile can be served as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Tiff,
}

impl OutputFormat {
    /// Format for a request file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> TileResult<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "tif" | "tiff" => Ok(Self::Tiff),
            _ => Err(TileError::UnsupportedOutputFormat(ext.to_string())),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Tiff => "image/tiff",
        }
    }
}

/// Map raw samples linearly onto 0..=255 with `v * 255 / scale`.
///
/// Out-of-range values saturate and NaN becomes 0.
pub fn scale_to_u8(data: &[f32], scale: f64) -> Vec<u8> {
    let factor = 255.0 / scale;
    data.iter()
        .map(|&v| {
            let scaled = v as f64 * factor;
            if scaled.is_nan() {
                0
            } else {
                clamp(scaled, 0.0, 255.0) as u8
            }
        })
        .collect()
}

/// Scale and encode a tile array. Supports 1 to 4 bands (gray, gray+alpha,
/// RGB, RGBA); JPEG output drops any alpha band.
pub fn encode(array: &PixelArray, scale: f64, format: OutputFormat) -> TileResult<Vec<u8>> {
    let width = u32::try_from(array.cols).map_err(|_| TileError::Encode("tile too wide".into()))?;
    let height =
        u32::try_from(array.rows).map_err(|_| TileError::Encode("tile too tall".into()))?;
    let pixels = scale_to_u8(&array.data, scale);
    let size_err = || TileError::Encode("pixel buffer does not match tile size".to_string());

    let image = match array.bands {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, pixels).ok_or_else(size_err)?),
        2 => DynamicImage::ImageLumaA8(
            GrayAlphaImage::from_raw(width, height, pixels).ok_or_else(size_err)?,
        ),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, pixels).ok_or_else(size_err)?),
        4 => DynamicImage::ImageRgba8(
            RgbaImage::from_raw(width, height, pixels).ok_or_else(size_err)?,
        ),
        n => {
            return Err(TileError::Encode(format!(
                "cannot encode {} bands as an image",
                n
            )))
        }
    };

    let (image, output) = match format {
        OutputFormat::Png => (image, ImageOutputFormat::Png),
        OutputFormat::Tiff => (image, ImageOutputFormat::Tiff),
        OutputFormat::Jpeg => {
            let opaque = if image.color().has_alpha() {
                if array.bands == 2 {
                    DynamicImage::ImageLuma8(image.to_luma8())
                } else {
                    DynamicImage::ImageRgb8(image.to_rgb8())
                }
            } else {
                image
            };
            (opaque, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        }
    };

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), output)
        .map_err(|e| TileError::Encode(e.to_string()))?;
    Ok(bytes)
}

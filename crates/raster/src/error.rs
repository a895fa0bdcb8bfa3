//! Error types for raster access and scene materialization.

use thiserror::Error;

use tile_common::TileError;

/// Errors that can occur while reading rasters or materializing scenes.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The dataset geotransform has no inverse.
    #[error("geotransform of {0} is not invertible")]
    SingularTransform(String),

    /// The requested extent does not overlap the dataset.
    #[error("dataset extent {dataset} does not overlap {requested}")]
    NoIntersection { dataset: String, requested: String },

    /// The computed pixel window falls outside the raster.
    #[error("pixel window ({min_x}, {min_y}, {max_x}, {max_y}) exceeds raster size {width}x{height}")]
    WindowOutOfBounds {
        min_x: i64,
        min_y: i64,
        max_x: i64,
        max_y: i64,
        width: usize,
        height: usize,
    },

    /// Band index outside `1..=band_count`.
    #[error("band {band} out of range, dataset has {count} bands")]
    BandOutOfRange { band: usize, count: usize },

    /// Invalid raster layout or metadata.
    #[error("invalid raster: {0}")]
    Invalid(String),

    /// Failed to decode raster data.
    #[error("failed to decode raster: {0}")]
    Decode(String),

    /// Failed to download a scene band.
    #[error("download failed: {0}")]
    Download(String),

    /// An external raster tool failed.
    #[error("command failed: {0}")]
    Command(String),

    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<RasterError> for TileError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::SingularTransform(name) => TileError::TransformSingular(name),
            RasterError::NoIntersection { dataset, requested } => {
                TileError::NoRasterIntersection { dataset, requested }
            }
            RasterError::WindowOutOfBounds {
                min_x,
                min_y,
                max_x,
                max_y,
                width,
                height,
            } => TileError::WindowOutOfBounds {
                min_x,
                min_y,
                max_x,
                max_y,
                width,
                height,
            },
            RasterError::Download(msg) | RasterError::Command(msg) => TileError::Materialize(msg),
            other => TileError::RasterRead(other.to_string()),
        }
    }
}

/// Result type for raster operations.
pub type RasterResult<T> = std::result::Result<T, RasterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_errors_keep_their_status() {
        let err: TileError = RasterError::NoIntersection {
            dataset: "(0, 0, 1, 1)".to_string(),
            requested: "(5, 5, 6, 6)".to_string(),
        }
        .into();
        assert_eq!(err.http_status_code(), 404);

        let err: TileError = RasterError::WindowOutOfBounds {
            min_x: -1,
            min_y: 0,
            max_x: 10,
            max_y: 10,
            width: 10,
            height: 10,
        }
        .into();
        assert_eq!(err.error_code(), "WindowOutOfBounds");
    }

    #[test]
    fn test_tool_failures_become_materialize_errors() {
        let err: TileError = RasterError::Command("gdalwarp exited with 1".to_string()).into();
        assert!(matches!(err, TileError::Materialize(_)));

        let err: TileError = RasterError::Decode("bad strip".to_string()).into();
        assert!(matches!(err, TileError::RasterRead(_)));
    }
}

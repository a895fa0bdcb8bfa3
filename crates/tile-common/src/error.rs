//! Error types for the Landsat tile service.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Primary error type for tile operations.
///
/// Every variant is recoverable at the request level: it fails the one
/// request that produced it and leaves shared state untouched. The type is
/// `Clone` so a single computed result can be handed to every caller that
/// waited on it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TileError {
    // === Request Errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Zoom level {zoom} is below the minimum zoom {min_zoom}")]
    ZoomBelowMinimum { zoom: u32, min_zoom: u32 },

    #[error("Requested format not supported: {0}")]
    UnsupportedOutputFormat(String),

    // === Data Errors ===
    #[error("No scene with known cloud cover covers tile {0}")]
    NoCoveringScene(String),

    #[error("Dataset extent {dataset} does not overlap requested extent {requested}")]
    NoRasterIntersection { dataset: String, requested: String },

    #[error("Pixel window ({min_x}, {min_y}, {max_x}, {max_y}) exceeds raster size {width}x{height}")]
    WindowOutOfBounds {
        min_x: i64,
        min_y: i64,
        max_x: i64,
        max_y: i64,
        width: usize,
        height: usize,
    },

    #[error("Geotransform is not invertible: {0}")]
    TransformSingular(String),

    #[error("Failed to read raster: {0}")]
    RasterRead(String),

    #[error("Failed to materialize scene: {0}")]
    Materialize(String),

    // === Infrastructure Errors ===
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Encoding failed: {0}")]
    Encode(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl TileError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            TileError::InvalidRequest(_) => "InvalidRequest",
            TileError::ZoomBelowMinimum { .. } => "ZoomBelowMinimum",
            TileError::UnsupportedOutputFormat(_) => "UnsupportedOutputFormat",
            TileError::NoCoveringScene(_) => "NoCoveringScene",
            TileError::NoRasterIntersection { .. } => "NoRasterIntersection",
            TileError::WindowOutOfBounds { .. } => "WindowOutOfBounds",
            TileError::TransformSingular(_) => "TransformSingular",
            TileError::RasterRead(_) => "RasterReadFailed",
            TileError::Materialize(_) => "MaterializeFailed",
            TileError::Cache(_) => "CacheError",
            TileError::Encode(_) => "EncodeFailed",
            TileError::Internal(_) => "NoApplicableCode",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::InvalidRequest(_)
            | TileError::ZoomBelowMinimum { .. }
            | TileError::UnsupportedOutputFormat(_) => 400,

            TileError::NoCoveringScene(_)
            | TileError::NoRasterIntersection { .. }
            | TileError::WindowOutOfBounds { .. } => 404,

            TileError::Materialize(_) => 502,

            _ => 500,
        }
    }
}

impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::Internal(err.to_string())
    }
}

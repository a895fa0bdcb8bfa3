//! Tile endpoint: `GET /tiles/{z}/{x}/{y}.{ext}`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tile_common::{TileAddress, TileError, TileResult};
use tracing::{error, info, instrument, warn};

use crate::encode::{self, OutputFormat};
use crate::state::AppState;

/// A parsed tile request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub address: TileAddress,
    pub format: OutputFormat,
}

impl TileRequest {
    /// Parse the `z`, `x` and `y.ext` path segments.
    pub fn parse(z: &str, x: &str, y_ext: &str) -> TileResult<Self> {
        let (y, ext) = y_ext
            .rsplit_once('.')
            .ok_or_else(|| TileError::InvalidRequest(format!("missing file extension in {:?}", y_ext)))?;

        let number = |name: &str, value: &str| {
            value
                .parse::<u32>()
                .map_err(|_| TileError::InvalidRequest(format!("invalid {}: {:?}", name, value)))
        };

        Ok(Self {
            address: TileAddress::new(number("z", z)?, number("x", x)?, number("y", y)?),
            format: OutputFormat::from_extension(ext)?,
        })
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// JSON error response with the status for the error kind.
pub fn error_response(err: &TileError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorBody {
        code: err.error_code(),
        message: err.to_string(),
    };
    (status, Json(body)).into_response()
}

/// GET /tiles/:z/:x/:y_ext
#[instrument(skip(state))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y_ext)): Path<(String, String, String)>,
) -> Response {
    let start = Instant::now();
    state.metrics.record_request();

    match render_tile(&state, &z, &x, &y_ext).await {
        Ok((bytes, format)) => {
            state.metrics.record_render(start.elapsed());
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, format.content_type())],
                bytes,
            )
                .into_response()
        }
        Err(err) => {
            state.metrics.record_error(err.error_code());
            if err.http_status_code() >= 500 {
                error!(error = %err, code = err.error_code(), "Tile request failed");
            } else {
                warn!(error = %err, code = err.error_code(), "Tile request rejected");
            }
            error_response(&err)
        }
    }
}

/// Run the tile pipeline: validate, locate the tile, pick a scene, then load
/// the tile from cache or extract it from the materialized scene, and encode.
pub async fn render_tile(
    state: &AppState,
    z: &str,
    x: &str,
    y_ext: &str,
) -> TileResult<(Vec<u8>, OutputFormat)> {
    let request = TileRequest::parse(z, x, y_ext)?;
    let address = request.address;

    if address.z < state.config.min_zoom {
        return Err(TileError::ZoomBelowMinimum {
            zoom: address.z,
            min_zoom: state.config.min_zoom,
        });
    }

    let tile = state.pyramid.checked_tile(address)?;

    let scene = state
        .catalog
        .select_scene(&tile.bounds)
        .ok_or_else(|| TileError::NoCoveringScene(address.to_string()))?;

    let size = state.config.tile_size;
    let computed = AtomicBool::new(false);

    // The scene is only materialized when the tile is not already cached
    let array = state
        .cache
        .fetch_or_compute(&scene.entity_id, &tile, |tile| {
            computed.store(true, Ordering::Relaxed);
            async move {
                let dataset = state.dataset_for(scene).await?;
                info!(
                    scene = %dataset.name(),
                    bounds = %tile.bounds,
                    "Reading tile from scene"
                );
                let bands = dataset.all_bands();
                tokio::task::spawn_blocking(move || {
                    dataset
                        .read_bands(&bands, &tile.bounds, size, size)
                        .map_err(TileError::from)
                })
                .await
                .map_err(|e| TileError::Internal(format!("tile read task failed: {}", e)))?
            }
        })
        .await?;

    if computed.load(Ordering::Relaxed) {
        state.metrics.record_cache_miss();
    } else {
        state.metrics.record_cache_hit();
    }

    let scale = state.config.radiometric_scale;
    let format = request.format;
    let bytes = tokio::task::spawn_blocking(move || encode::encode(&array, scale, format))
        .await
        .map_err(|e| TileError::Internal(format!("encode task failed: {}", e)))??;

    Ok((bytes, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = TileRequest::parse("9", "300", "140.png").unwrap();
        assert_eq!(request.address, TileAddress::new(9, 300, 140));
        assert_eq!(request.format, OutputFormat::Png);
    }

    #[test]
    fn test_parse_rejects_bad_segments() {
        assert!(matches!(
            TileRequest::parse("9", "abc", "1.png"),
            Err(TileError::InvalidRequest(_))
        ));
        assert!(matches!(
            TileRequest::parse("9", "1", "1"),
            Err(TileError::InvalidRequest(_))
        ));
        assert!(matches!(
            TileRequest::parse("-1", "1", "1.png"),
            Err(TileError::InvalidRequest(_))
        ));
        assert!(matches!(
            TileRequest::parse("9", "1", "1.gif"),
            Err(TileError::UnsupportedOutputFormat(_))
        ));
    }
}

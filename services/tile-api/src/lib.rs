//! HTTP tile server for cloud-free Landsat imagery.
//!
//! Tiles are addressed as `/tiles/{z}/{x}/{y}.{ext}` over a geographic
//! (EPSG:4326) pyramid. Each tile is cut from the least cloudy scene covering
//! it and cached on disk.

pub mod config;
pub mod encode;
pub mod handlers;
pub mod metrics;
pub mod state;

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub use config::TileServiceConfig;
pub use state::AppState;

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/tiles/:z/:x/:y_ext", get(handlers::tile_handler))
        .route("/health", get(handlers::health_handler))
        .route("/ready", get(handlers::ready_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

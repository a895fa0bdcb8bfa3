//! HTTP request handlers.

mod health;
mod tiles;

pub use health::{health_handler, metrics_handler, ready_handler};
pub use tiles::{error_response, render_tile, tile_handler, TileRequest};

//! Landsat tile server.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::extract::Extension;
use clap::Parser;
use tile_api::{router, AppState, TileServiceConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tile-api")]
#[command(about = "Serves cloud-free Landsat 8 map tiles")]
struct Args {
    /// Listen port
    #[arg(default_value_t = 8000, env = "TILE_PORT")]
    port: u16,

    /// Listen host
    #[arg(long, default_value = "0.0.0.0", env = "TILE_HOST")]
    host: String,

    /// Scene-list CSV
    #[arg(long, default_value = "scene_list.csv", env = "TILE_SCENE_LIST")]
    scene_list: PathBuf,

    /// Tile cache directory
    #[arg(long, default_value = "cache", env = "TILE_CACHE_DIR")]
    cache_dir: PathBuf,

    /// Directory for downloaded and warped scenes
    #[arg(long, default_value = "/data/landsat8_temp", env = "TILE_SCENE_DIR")]
    scene_dir: PathBuf,

    /// Lowest zoom level served
    #[arg(long, default_value_t = 8, env = "TILE_MIN_ZOOM")]
    min_zoom: u32,

    /// Tile width and height in pixels
    #[arg(long, default_value_t = 256, env = "TILE_SIZE")]
    tile_size: usize,

    /// Scene bands to stack, in output order
    #[arg(long, value_delimiter = ',', default_value = "4,3,2", env = "TILE_BANDS")]
    bands: Vec<u8>,

    /// Raw sample value shown as full brightness
    #[arg(long, env = "TILE_RADIOMETRIC_SCALE")]
    radiometric_scale: f64,

    /// Log filter directive
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TILE_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

impl Args {
    fn config(&self) -> TileServiceConfig {
        TileServiceConfig {
            host: self.host.clone(),
            port: self.port,
            scene_list: self.scene_list.clone(),
            cache_dir: self.cache_dir.clone(),
            scene_dir: self.scene_dir.clone(),
            min_zoom: self.min_zoom,
            tile_size: self.tile_size,
            bands: self.bands.clone(),
            radiometric_scale: self.radiometric_scale,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let config = args.config();
    let addr = config.listen_addr()?;
    info!(
        scene_list = %config.scene_list.display(),
        min_zoom = config.min_zoom,
        tile_size = config.tile_size,
        "Starting tile server"
    );

    let state = Arc::new(AppState::new(config)?);
    let app = router(state).layer(Extension(prometheus_handle));

    info!(address = %addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

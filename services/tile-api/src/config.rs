//! Service configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Runtime configuration for the tile service.
#[derive(Debug, Clone)]
pub struct TileServiceConfig {
    pub host: String,
    pub port: u16,
    /// Scene-list CSV loaded at startup
    pub scene_list: PathBuf,
    /// Root of the tile cache
    pub cache_dir: PathBuf,
    /// Where downloaded and warped scenes are kept
    pub scene_dir: PathBuf,
    /// Requests below this zoom are rejected
    pub min_zoom: u32,
    /// Output tile width and height in pixels
    pub tile_size: usize,
    /// Scene bands stacked into each tile, in output order
    pub bands: Vec<u8>,
    /// Raw value that maps to full brightness (255)
    pub radiometric_scale: f64,
}

impl TileServiceConfig {
    /// Defaults for everything except the radiometric scale, which has no
    /// sensible default and must always be supplied.
    pub fn with_scale(radiometric_scale: f64) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            scene_list: PathBuf::from("scene_list.csv"),
            cache_dir: PathBuf::from("cache"),
            scene_dir: PathBuf::from("/data/landsat8_temp"),
            min_zoom: 8,
            tile_size: 256,
            bands: vec![4, 3, 2],
            radiometric_scale,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.radiometric_scale.is_finite() || self.radiometric_scale <= 0.0 {
            bail!(
                "radiometric scale must be a positive number, got {}",
                self.radiometric_scale
            );
        }
        if self.tile_size == 0 {
            bail!("tile size must be at least 1 pixel");
        }
        if self.bands.is_empty() {
            bail!("at least one band is required");
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

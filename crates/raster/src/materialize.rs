//! Turning catalog scenes into local, readable datasets.
//!
//! The GDAL materializer downloads the configured bands of a scene, stacks
//! them with `gdalbuildvrt -separate` and warps the stack to EPSG:4326 with
//! `gdalwarp`. The warped GeoTIFF is the scene's dataset; once it exists the
//! scene is never downloaded again.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use storage::Scene;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::error::{RasterError, RasterResult};
use crate::geotiff::GeoTiffRaster;
use crate::source::Dataset;

/// Makes a scene available as a dataset, fetching and preparing it if needed.
///
/// Implementations may be slow on first use of a scene; callers are expected
/// to coalesce concurrent requests for the same scene.
#[async_trait]
pub trait SceneMaterializer: Send + Sync {
    async fn materialize(&self, scene: &Scene) -> RasterResult<Dataset>;
}

/// Configuration for [`GdalMaterializer`].
#[derive(Debug, Clone)]
pub struct GdalConfig {
    /// Directory holding downloaded bands and warped scenes
    pub scene_dir: PathBuf,
    /// Scene band numbers to download, in output band order
    pub bands: Vec<u8>,
    /// HTTP request timeout for band downloads
    pub request_timeout: Duration,
    pub gdalbuildvrt: String,
    pub gdalwarp: String,
}

impl Default for GdalConfig {
    fn default() -> Self {
        Self {
            scene_dir: PathBuf::from("/data/landsat8_temp"),
            bands: vec![4, 3, 2],
            request_timeout: Duration::from_secs(600),
            gdalbuildvrt: "gdalbuildvrt".to_string(),
            gdalwarp: "gdalwarp".to_string(),
        }
    }
}

/// Materializer backed by HTTP downloads and the GDAL command-line tools.
pub struct GdalMaterializer {
    client: Client,
    config: GdalConfig,
}

impl GdalMaterializer {
    pub fn new(config: GdalConfig) -> RasterResult<Self> {
        if config.bands.is_empty() {
            return Err(RasterError::Invalid("no scene bands configured".to_string()));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RasterError::Download(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Path of the warped dataset for a scene.
    pub fn dataset_path(&self, scene: &Scene) -> PathBuf {
        self.config
            .scene_dir
            .join(format!("{}.tif", scene.entity_id))
    }

    fn band_filename(scene: &Scene, band: u8) -> String {
        format!("{}_B{}.TIF", scene.entity_id, band)
    }

    async fn download_band(&self, scene: &Scene, band: u8) -> RasterResult<PathBuf> {
        let filename = Self::band_filename(scene, band);
        let dest = self.config.scene_dir.join(&filename);
        if fs::try_exists(&dest).await? {
            debug!(path = %dest.display(), "Band already downloaded");
            return Ok(dest);
        }

        let url = format!("{}/{}", scene.root_url(), filename);
        info!(url = %url, dest = %dest.display(), "Downloading band");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RasterError::Download(format!("{}: {}", url, e)))?;

        let partial = self.config.scene_dir.join(format!("{}.partial", filename));
        let mut file = fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RasterError::Download(format!("{}: {}", url, e)))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        fs::rename(&partial, &dest).await?;
        Ok(dest)
    }

    async fn build(&self, scene: &Scene, output: &Path) -> RasterResult<()> {
        let mut band_files = Vec::with_capacity(self.config.bands.len());
        for &band in &self.config.bands {
            band_files.push(self.download_band(scene, band).await?);
        }

        let merged = self
            .config
            .scene_dir
            .join(format!("{}_merged.vrt", scene.entity_id));
        let warped = self
            .config
            .scene_dir
            .join(format!("{}.tif.partial", scene.entity_id));

        let mut stack_args: Vec<OsString> = vec![merged.clone().into(), "-separate".into()];
        stack_args.extend(band_files.into_iter().map(OsString::from));

        let warp_args: Vec<OsString> = vec![
            "-overwrite".into(),
            "-of".into(),
            "GTiff".into(),
            "-co".into(),
            "INTERLEAVE=PIXEL".into(),
            "-co".into(),
            "TILED=YES".into(),
            "-t_srs".into(),
            "EPSG:4326".into(),
            "-r".into(),
            "bilinear".into(),
            merged.into(),
            warped.clone().into(),
        ];

        let buildvrt = self.config.gdalbuildvrt.clone();
        let gdalwarp = self.config.gdalwarp.clone();
        tokio::task::spawn_blocking(move || {
            run_tool(&buildvrt, &stack_args)?;
            run_tool(&gdalwarp, &warp_args)
        })
        .await
        .map_err(|e| RasterError::Command(format!("tool task failed: {}", e)))??;

        fs::rename(&warped, output).await?;
        Ok(())
    }
}

fn run_tool(program: &str, args: &[OsString]) -> RasterResult<()> {
    debug!(program, ?args, "Running raster tool");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| RasterError::Command(format!("failed to run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(RasterError::Command(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[async_trait]
impl SceneMaterializer for GdalMaterializer {
    #[instrument(skip(self, scene), fields(scene = %scene.entity_id))]
    async fn materialize(&self, scene: &Scene) -> RasterResult<Dataset> {
        let path = self.dataset_path(scene);
        if !fs::try_exists(&path).await? {
            fs::create_dir_all(&self.config.scene_dir).await?;
            self.build(scene, &path).await?;
            info!(path = %path.display(), "Scene materialized");
        }

        let raster = tokio::task::spawn_blocking(move || GeoTiffRaster::open(path))
            .await
            .map_err(|e| RasterError::Decode(format!("open task failed: {}", e)))??;

        Dataset::new(scene.entity_id.clone(), Arc::new(raster))
    }
}

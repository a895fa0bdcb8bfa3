//! Application state shared by all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use dashmap::DashMap;
use raster::{Dataset, GdalConfig, GdalMaterializer, SceneMaterializer};
use storage::{Scene, SceneCatalog, SingleFlight, TileCache};
use tile_common::{TilePyramid, TileResult};
use tracing::info;

use crate::config::TileServiceConfig;
use crate::metrics::MetricsCollector;

/// Shared application state.
pub struct AppState {
    pub config: TileServiceConfig,
    pub pyramid: TilePyramid,
    /// Read-only after startup
    pub catalog: Arc<SceneCatalog>,
    pub cache: TileCache,
    pub materializer: Arc<dyn SceneMaterializer>,
    pub metrics: MetricsCollector,
    /// Scenes already materialized, by entity id
    datasets: DashMap<String, Dataset>,
    scene_flights: SingleFlight<String, Dataset>,
}

impl AppState {
    /// Build state from configuration: load the scene list and set up the
    /// GDAL materializer.
    pub fn new(config: TileServiceConfig) -> Result<Self> {
        config.validate()?;

        let catalog = SceneCatalog::load_csv(&config.scene_list)
            .with_context(|| format!("failed to load {}", config.scene_list.display()))?;

        let materializer = GdalMaterializer::new(GdalConfig {
            scene_dir: config.scene_dir.clone(),
            bands: config.bands.clone(),
            ..GdalConfig::default()
        })
        .context("failed to create scene materializer")?;

        Ok(Self::with_parts(config, catalog, Arc::new(materializer)))
    }

    /// Build state from already constructed parts.
    pub fn with_parts(
        config: TileServiceConfig,
        catalog: SceneCatalog,
        materializer: Arc<dyn SceneMaterializer>,
    ) -> Self {
        info!(
            scenes = catalog.len(),
            cache_dir = %config.cache_dir.display(),
            "Initializing application state"
        );
        Self {
            pyramid: TilePyramid::default(),
            catalog: Arc::new(catalog),
            cache: TileCache::new(config.cache_dir.clone()),
            materializer,
            metrics: MetricsCollector::new(),
            datasets: DashMap::new(),
            scene_flights: SingleFlight::new(),
            config,
        }
    }

    /// The dataset for a scene, materializing it on first use.
    ///
    /// Concurrent first requests for one scene share a single
    /// materialization.
    pub async fn dataset_for(&self, scene: &Scene) -> TileResult<Dataset> {
        if let Some(dataset) = self.cached_dataset(&scene.entity_id) {
            return Ok(dataset);
        }

        self.scene_flights
            .run(scene.entity_id.clone(), || async {
                if let Some(dataset) = self.cached_dataset(&scene.entity_id) {
                    return Ok(dataset);
                }
                info!(scene = %scene.entity_id, "Materializing scene");
                let dataset = self.materializer.materialize(scene).await?;
                self.datasets
                    .insert(scene.entity_id.clone(), dataset.clone());
                Ok(dataset)
            })
            .await
    }

    fn cached_dataset(&self, entity_id: &str) -> Option<Dataset> {
        self.datasets.get(entity_id).map(|entry| entry.value().clone())
    }

    /// Number of scenes materialized so far.
    pub fn materialized_scenes(&self) -> usize {
        self.datasets.len()
    }
}

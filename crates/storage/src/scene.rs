//! Satellite scene metadata.

use serde::{Deserialize, Serialize};
use tile_common::Extent;

/// One acquisition from the scene list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub entity_id: String,
    pub acquisition_date: String,
    /// Percentage of the scene obscured by cloud. Negative means unknown.
    pub cloud_cover: f64,
    pub processing_level: String,
    /// WRS-2 path
    pub path: u32,
    /// WRS-2 row
    pub row: u32,
    /// Footprint as (min_lon, min_lat, max_lon, max_lat)
    pub bounds: Extent,
    pub download_url: String,
}

impl Scene {
    /// Download URL without its trailing `/index.html`.
    pub fn root_url(&self) -> &str {
        self.download_url
            .strip_suffix("/index.html")
            .unwrap_or(&self.download_url)
    }

    /// Whether the cloud cover is known.
    pub fn has_cloud_cover(&self) -> bool {
        self.cloud_cover >= 0.0
    }
}

//! Scene catalog loaded from the scene-list CSV.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tile_common::Extent;
use tracing::info;

use crate::scene::Scene;

/// Number of leading columns read from each scene-list row.
const SCENE_LIST_COLUMNS: usize = 11;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read scene list: {0}")]
    Io(#[from] std::io::Error),

    #[error("scene list line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// The scenes available for tiling, in scene-list order.
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SceneCatalog {
    scenes: Vec<Scene>,
}

impl SceneCatalog {
    /// Build a catalog from already parsed scenes.
    pub fn load(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    /// Load a scene-list CSV from disk.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let catalog = Self::from_csv_reader(BufReader::new(File::open(path)?))?;
        info!(path = %path.display(), scenes = catalog.len(), "Loaded scene catalog");
        Ok(catalog)
    }

    /// Parse scene-list CSV.
    ///
    /// Columns: entityId, acquisitionDate, cloudCover, processingLevel, path,
    /// row, min_lat, min_lon, max_lat, max_lon, download_url. The first line
    /// is a header; blank lines are skipped and extra columns ignored.
    pub fn from_csv_reader<R: BufRead>(reader: R) -> Result<Self, CatalogError> {
        let mut scenes = Vec::new();
        for (index, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            scenes.push(parse_row(index + 1, &line)?);
        }
        Ok(Self { scenes })
    }

    /// The scene with the lowest known cloud cover whose footprint
    /// intersects `extent`.
    ///
    /// Scenes with negative (unknown) cloud cover never qualify. Ties go to
    /// the scene listed first.
    pub fn select_scene(&self, extent: &Extent) -> Option<&Scene> {
        let mut best: Option<&Scene> = None;
        for scene in &self.scenes {
            if !extent.intersects(&scene.bounds) || !scene.has_cloud_cover() {
                continue;
            }
            match best {
                Some(current) if scene.cloud_cover >= current.cloud_cover => {}
                _ => best = Some(scene),
            }
        }
        best
    }

    /// Look up a scene by entity id.
    pub fn get(&self, entity_id: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.entity_id == entity_id)
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

fn parse_row(line: usize, text: &str) -> Result<Scene, CatalogError> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() < SCENE_LIST_COLUMNS {
        return Err(CatalogError::Parse {
            line,
            message: format!(
                "expected {} columns, found {}",
                SCENE_LIST_COLUMNS,
                parts.len()
            ),
        });
    }

    let float = |i: usize, name: &str| {
        parts[i]
            .trim()
            .parse::<f64>()
            .map_err(|_| CatalogError::Parse {
                line,
                message: format!("invalid {}: {:?}", name, parts[i]),
            })
    };
    let int = |i: usize, name: &str| {
        parts[i]
            .trim()
            .parse::<u32>()
            .map_err(|_| CatalogError::Parse {
                line,
                message: format!("invalid {}: {:?}", name, parts[i]),
            })
    };

    let min_lat = float(6, "min_lat")?;
    let min_lon = float(7, "min_lon")?;
    let max_lat = float(8, "max_lat")?;
    let max_lon = float(9, "max_lon")?;

    Ok(Scene {
        entity_id: parts[0].trim().to_string(),
        acquisition_date: parts[1].trim().to_string(),
        cloud_cover: float(2, "cloudCover")?,
        processing_level: parts[3].trim().to_string(),
        path: int(4, "path")?,
        row: int(5, "row")?,
        bounds: Extent::new(min_lon, min_lat, max_lon, max_lat),
        download_url: parts[10].trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "entityId,acquisitionDate,cloudCover,processingLevel,path,row,min_lat,min_lon,max_lat,max_lon,download_url\n";

    #[test]
    fn test_parse_rows() {
        let csv = format!(
            "{}LC80010012015001LGN00,2015-01-01 10:00:00.1,12.5,L1T,1,1,79.1,-10.5,81.2,-2.0,https://example.com/a/index.html\n\n",
            HEADER
        );
        let catalog = SceneCatalog::from_csv_reader(csv.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 1);

        let scene = &catalog.scenes()[0];
        assert_eq!(scene.entity_id, "LC80010012015001LGN00");
        assert_eq!(scene.cloud_cover, 12.5);
        assert_eq!(scene.path, 1);
        assert_eq!(scene.bounds, Extent::new(-10.5, 79.1, -2.0, 81.2));
        assert_eq!(scene.root_url(), "https://example.com/a");
    }

    #[test]
    fn test_parse_error_reports_line() {
        let csv = format!(
            "{}A,2015-01-01,1.0,L1T,1,1,0,0,1,1,u\nB,2015-01-01,cloudy,L1T,1,1,0,0,1,1,u\n",
            HEADER
        );
        let err = SceneCatalog::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { line: 3, .. }));
    }

    #[test]
    fn test_short_row_rejected() {
        let csv = format!("{}A,2015-01-01,1.0\n", HEADER);
        let err = SceneCatalog::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_header_only() {
        let catalog = SceneCatalog::from_csv_reader(HEADER.as_bytes()).unwrap();
        assert!(catalog.is_empty());
    }
}

//! Content-addressed on-disk cache of extracted tile arrays.
//!
//! Entries live at `{root}/{layer}/{z}/{x}/{y}.tile`. Each file holds a
//! fixed header followed by little-endian `f32` samples in
//! rows x cols x bands order. Entries are written to a temporary file and
//! renamed into place, so readers see either nothing or a whole entry.
//! Nothing is ever invalidated.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use tile_common::{PixelArray, Tile, TileAddress, TileError, TileResult};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::single_flight::SingleFlight;

const ENTRY_MAGIC: [u8; 4] = *b"LTC1";
const ENTRY_VERSION: u32 = 1;
const ENTRY_EXTENSION: &str = "tile";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk entry header. Integer fields are little-endian.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct EntryHeader {
    magic: [u8; 4],
    version: u32,
    rows: u32,
    cols: u32,
    bands: u32,
}

const HEADER_LEN: usize = std::mem::size_of::<EntryHeader>();

/// Identity of one cached tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub layer: String,
    pub address: TileAddress,
}

impl CacheKey {
    pub fn new(layer: impl Into<String>, address: TileAddress) -> Self {
        Self {
            layer: layer.into(),
            address,
        }
    }
}

/// Counters for cache effectiveness.
#[derive(Default)]
pub struct TileCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub writes: AtomicU64,
}

/// Point-in-time copy of [`TileCacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Callers that waited on another caller's computation
    pub coalesced: u64,
    pub writes: u64,
}

impl CacheStatsSnapshot {
    /// Hit rate as a percentage (0-100).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Disk cache with per-key single-flight computation on misses.
pub struct TileCache {
    root: PathBuf,
    flights: SingleFlight<CacheKey, PixelArray>,
    stats: Arc<TileCacheStats>,
}

impl TileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!(root = %root.display(), "Tile cache initialized");
        Self {
            root,
            flights: SingleFlight::new(),
            stats: Arc::new(TileCacheStats::default()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry for a layer and tile address.
    ///
    /// Layer names must be a single non-empty path component.
    pub fn key(&self, layer: &str, address: &TileAddress) -> TileResult<PathBuf> {
        if layer.is_empty()
            || layer == "."
            || layer == ".."
            || layer.contains(['/', '\\'])
        {
            return Err(TileError::InvalidRequest(format!(
                "invalid cache layer name: {:?}",
                layer
            )));
        }
        Ok(self
            .root
            .join(layer)
            .join(address.z.to_string())
            .join(address.x.to_string())
            .join(format!("{}.{}", address.y, ENTRY_EXTENSION)))
    }

    /// Read an entry. A missing entry is `Ok(None)`.
    pub async fn get(&self, layer: &str, address: &TileAddress) -> TileResult<Option<PixelArray>> {
        let path = self.key(layer, address)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TileError::Cache(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        decode_entry(&bytes)
            .map(Some)
            .map_err(|msg| TileError::Cache(format!("{}: {}", path.display(), msg)))
    }

    /// Write an entry, replacing any existing one.
    pub async fn put(&self, layer: &str, address: &TileAddress, array: &PixelArray) -> TileResult<()> {
        let path = self.key(layer, address)?;
        let cache_err =
            |e: std::io::Error| TileError::Cache(format!("failed to write {}: {}", path.display(), e));

        if let Some(parent) = path.parent() {
            match fs::create_dir_all(parent).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => return Err(cache_err(e)),
            }
        }

        let temp = path.with_extension(format!(
            "{}.{}-{}.tmp",
            ENTRY_EXTENSION,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let bytes = encode_entry(array)?;
        fs::write(&temp, &bytes).await.map_err(cache_err)?;
        if let Err(e) = fs::rename(&temp, &path).await {
            let _ = fs::remove_file(&temp).await;
            return Err(cache_err(e));
        }

        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        debug!(path = %path.display(), bytes = bytes.len(), "Cached tile");
        Ok(())
    }

    /// Return the cached array for `tile`, computing and storing it on a miss.
    ///
    /// Concurrent callers for the same layer and address share a single
    /// computation. A failed computation is returned to every waiter and
    /// nothing is stored.
    #[instrument(skip(self, layer, tile, compute), fields(layer = %layer, z = tile.z(), x = tile.x(), y = tile.y()))]
    pub async fn fetch_or_compute<F, Fut>(
        &self,
        layer: &str,
        tile: &Tile,
        compute: F,
    ) -> TileResult<PixelArray>
    where
        F: FnOnce(Tile) -> Fut,
        Fut: Future<Output = TileResult<PixelArray>>,
    {
        let address = tile.address;
        if let Some(array) = self.get(layer, &address).await? {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(array);
        }

        let key = CacheKey::new(layer, address);
        let tile = *tile;
        self.flights
            .run(key, || async move {
                // Another leader may have stored the entry since our lookup
                if let Some(array) = self.get(layer, &address).await? {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(array);
                }

                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss, computing tile");
                let array = compute(tile).await?;
                if let Err(e) = self.put(layer, &address, &array).await {
                    warn!(error = %e, "Failed to store computed tile");
                    return Err(e);
                }
                Ok(array)
            })
            .await
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            coalesced: self.flights.coalesced(),
            writes: self.stats.writes.load(Ordering::Relaxed),
        }
    }
}

fn encode_entry(array: &PixelArray) -> TileResult<Vec<u8>> {
    let dim = |v: usize| {
        u32::try_from(v).map_err(|_| TileError::Cache(format!("dimension {} too large", v)))
    };
    let header = EntryHeader {
        magic: ENTRY_MAGIC,
        version: ENTRY_VERSION.to_le(),
        rows: dim(array.rows)?.to_le(),
        cols: dim(array.cols)?.to_le(),
        bands: dim(array.bands)?.to_le(),
    };

    let mut bytes = Vec::with_capacity(HEADER_LEN + array.data.len() * 4);
    bytes.extend_from_slice(bytemuck::bytes_of(&header));
    for v in &array.data {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    Ok(bytes)
}

fn decode_entry(bytes: &[u8]) -> Result<PixelArray, String> {
    if bytes.len() < HEADER_LEN {
        return Err("truncated entry header".to_string());
    }
    let header: EntryHeader = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
    if header.magic != ENTRY_MAGIC {
        return Err("not a tile cache entry".to_string());
    }
    let version = u32::from_le(header.version);
    if version != ENTRY_VERSION {
        return Err(format!("unsupported entry version {}", version));
    }

    let rows = u32::from_le(header.rows) as usize;
    let cols = u32::from_le(header.cols) as usize;
    let bands = u32::from_le(header.bands) as usize;
    let body = &bytes[HEADER_LEN..];
    if body.len() != rows * cols * bands * 4 {
        return Err(format!(
            "entry of {}x{}x{} has {} data bytes",
            rows,
            cols,
            bands,
            body.len()
        ));
    }

    let data = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    PixelArray::new(rows, cols, bands, data).map_err(|e| e.to_string())
}

//! Quadtree tile pyramid.
//!
//! The pyramid divides a root extent into a `wide x high` grid at zoom 0 and
//! halves each tile in both axes at every following zoom level, so zoom `z`
//! has `wide * 2^z` columns and `high * 2^z` rows. Column 0 / row 0 sit at the
//! minimum corner of the root extent.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Extent, TileError, TileResult};

/// A tile address (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileAddress {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Generate a cache key fragment.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Child position within a parent tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    SouthWest = 0,
    SouthEast = 1,
    NorthWest = 2,
    NorthEast = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::SouthWest,
        Quadrant::SouthEast,
        Quadrant::NorthWest,
        Quadrant::NorthEast,
    ];

    fn steps(self) -> (u32, u32) {
        match self {
            Quadrant::SouthWest => (0, 0),
            Quadrant::SouthEast => (1, 0),
            Quadrant::NorthWest => (0, 1),
            Quadrant::NorthEast => (1, 1),
        }
    }
}

impl TryFrom<u8> for Quadrant {
    type Error = TileError;

    fn try_from(value: u8) -> TileResult<Self> {
        match value {
            0 => Ok(Quadrant::SouthWest),
            1 => Ok(Quadrant::SouthEast),
            2 => Ok(Quadrant::NorthWest),
            3 => Ok(Quadrant::NorthEast),
            other => Err(TileError::InvalidRequest(format!(
                "quadrant must be 0..=3, got {}",
                other
            ))),
        }
    }
}

/// A node in the quadtree: an address plus its geographic bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub address: TileAddress,
    pub bounds: Extent,
}

impl Tile {
    pub fn new(address: TileAddress, bounds: Extent) -> Self {
        Self { address, bounds }
    }

    pub fn z(&self) -> u32 {
        self.address.z
    }

    pub fn x(&self) -> u32 {
        self.address.x
    }

    pub fn y(&self) -> u32 {
        self.address.y
    }

    pub fn width(&self) -> f64 {
        self.bounds.width()
    }

    pub fn height(&self) -> f64 {
        self.bounds.height()
    }

    /// Whether this tile intersects the given extent. Touching edges count.
    pub fn intersects(&self, extent: &Extent) -> bool {
        self.bounds.intersects(extent)
    }

    /// Create the child tile for a quadrant at the next zoom level.
    pub fn create_child(&self, quadrant: Quadrant) -> Tile {
        let width = self.width() / 2.0;
        let height = self.height() / 2.0;
        let (dx, dy) = quadrant.steps();

        let min_x = self.bounds.min_x + width * dx as f64;
        let min_y = self.bounds.min_y + height * dy as f64;

        // The far edges of the upper quadrants reuse the parent's edges so the
        // children tile the parent exactly.
        let max_x = if dx == 1 {
            self.bounds.max_x
        } else {
            min_x + width
        };
        let max_y = if dy == 1 {
            self.bounds.max_y
        } else {
            min_y + height
        };

        Tile {
            address: TileAddress {
                z: self.address.z + 1,
                x: self.address.x * 2 + dx,
                y: self.address.y * 2 + dy,
            },
            bounds: Extent::new(min_x, min_y, max_x, max_y),
        }
    }

    /// All four children, in quadrant order.
    pub fn children(&self) -> [Tile; 4] {
        Quadrant::ALL.map(|q| self.create_child(q))
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({},{})", self.address.z, self.address.x, self.address.y)
    }
}

/// Tile pyramid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilePyramid {
    /// Tile columns at zoom 0
    pub wide: u32,
    /// Tile rows at zoom 0
    pub high: u32,
    /// Extent covered by the whole pyramid
    pub root: Extent,
}

impl Default for TilePyramid {
    fn default() -> Self {
        Self {
            wide: 2,
            high: 1,
            root: Extent::world(),
        }
    }
}

impl TilePyramid {
    pub fn new(wide: u32, high: u32, root: Extent) -> TileResult<Self> {
        if wide == 0 || high == 0 {
            return Err(TileError::InvalidRequest(format!(
                "pyramid base grid must be non-empty, got {}x{}",
                wide, high
            )));
        }
        Ok(Self { wide, high, root })
    }

    /// Number of tile columns and rows at a zoom level.
    pub fn num_tiles(&self, zoom: u32) -> (u64, u64) {
        let pow2 = 1u64.checked_shl(zoom).unwrap_or(u64::MAX);
        (
            (self.wide as u64).saturating_mul(pow2),
            (self.high as u64).saturating_mul(pow2),
        )
    }

    /// Geographic size of one tile at a zoom level.
    pub fn tile_size(&self, zoom: u32) -> (f64, f64) {
        let width = self.root.width() / self.wide as f64;
        let height = self.root.height() / self.high as f64;
        let pow2 = 2f64.powi(zoom as i32);
        (width / pow2, height / pow2)
    }

    /// Compute the tile at an address.
    ///
    /// No range check is performed; see [`TilePyramid::is_valid`].
    pub fn tile(&self, zoom: u32, x: u32, y: u32) -> Tile {
        let (tile_w, tile_h) = self.tile_size(zoom);
        let min_x = self.root.min_x + tile_w * x as f64;
        let min_y = self.root.min_y + tile_h * y as f64;

        Tile {
            address: TileAddress::new(zoom, x, y),
            bounds: Extent::new(min_x, min_y, min_x + tile_w, min_y + tile_h),
        }
    }

    /// Whether an address lies inside the pyramid's grid for its zoom.
    pub fn is_valid(&self, address: &TileAddress) -> bool {
        let (cols, rows) = self.num_tiles(address.z);
        (address.x as u64) < cols && (address.y as u64) < rows
    }

    /// Compute a tile after checking the address is within the grid.
    pub fn checked_tile(&self, address: TileAddress) -> TileResult<Tile> {
        if !self.is_valid(&address) {
            let (cols, rows) = self.num_tiles(address.z);
            return Err(TileError::InvalidRequest(format!(
                "tile {} is outside the {}x{} grid at zoom {}",
                address, cols, rows, address.z
            )));
        }
        Ok(self.tile(address.z, address.x, address.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pyramid_zoom0() {
        let pyramid = TilePyramid::default();
        assert_eq!(pyramid.tile(0, 0, 0).bounds, Extent::new(-180.0, -90.0, 0.0, 90.0));
        assert_eq!(pyramid.tile(0, 1, 0).bounds, Extent::new(0.0, -90.0, 180.0, 90.0));
    }

    #[test]
    fn test_default_pyramid_zoom1() {
        let pyramid = TilePyramid::default();
        assert_eq!(pyramid.tile(1, 0, 0).bounds, Extent::new(-180.0, -90.0, -90.0, 0.0));
        assert_eq!(pyramid.num_tiles(1), (4, 2));
    }

    #[test]
    fn test_tile_size_shrinks() {
        let pyramid = TilePyramid::default();
        assert_eq!(pyramid.tile_size(0), (180.0, 180.0));
        assert_eq!(pyramid.tile_size(3), (22.5, 22.5));
    }

    #[test]
    fn test_create_child_quadrants() {
        let pyramid = TilePyramid::default();
        let parent = pyramid.tile(1, 1, 0);

        let sw = parent.create_child(Quadrant::SouthWest);
        assert_eq!(sw.address, TileAddress::new(2, 2, 0));
        let se = parent.create_child(Quadrant::SouthEast);
        assert_eq!(se.address, TileAddress::new(2, 3, 0));
        let nw = parent.create_child(Quadrant::NorthWest);
        assert_eq!(nw.address, TileAddress::new(2, 2, 1));
        let ne = parent.create_child(Quadrant::NorthEast);
        assert_eq!(ne.address, TileAddress::new(2, 3, 1));

        assert_eq!(ne.bounds, pyramid.tile(2, 3, 1).bounds);
    }

    #[test]
    fn test_quadrant_from_index() {
        assert_eq!(Quadrant::try_from(2u8).unwrap(), Quadrant::NorthWest);
        assert!(Quadrant::try_from(4u8).is_err());
    }

    #[test]
    fn test_is_valid() {
        let pyramid = TilePyramid::default();
        assert!(pyramid.is_valid(&TileAddress::new(0, 1, 0)));
        assert!(!pyramid.is_valid(&TileAddress::new(0, 2, 0)));
        assert!(!pyramid.is_valid(&TileAddress::new(0, 0, 1)));
        assert!(pyramid.is_valid(&TileAddress::new(8, 511, 255)));
        assert!(pyramid.checked_tile(TileAddress::new(8, 512, 0)).is_err());
    }
}

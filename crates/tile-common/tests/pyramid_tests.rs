//! Tests for the tile pyramid and quadtree subdivision.

use tile_common::{Extent, Quadrant, Tile, TileAddress, TilePyramid};

fn assert_partition(parent: &Tile) {
    let [sw, se, nw, ne] = parent.children();
    let mid_x = sw.bounds.max_x;
    let mid_y = sw.bounds.max_y;

    // Children meet exactly at the parent's midpoints
    assert_eq!(se.bounds.min_x, mid_x);
    assert_eq!(ne.bounds.min_x, mid_x);
    assert_eq!(nw.bounds.max_x, mid_x);
    assert_eq!(nw.bounds.min_y, mid_y);
    assert_eq!(ne.bounds.min_y, mid_y);
    assert_eq!(se.bounds.max_y, mid_y);

    // Outer edges coincide with the parent's edges
    assert_eq!(sw.bounds.min_x, parent.bounds.min_x);
    assert_eq!(sw.bounds.min_y, parent.bounds.min_y);
    assert_eq!(ne.bounds.max_x, parent.bounds.max_x);
    assert_eq!(ne.bounds.max_y, parent.bounds.max_y);
    assert_eq!(se.bounds.max_x, parent.bounds.max_x);
    assert_eq!(nw.bounds.max_y, parent.bounds.max_y);

    // Midpoints are the parent's midpoints
    let expected_mid_x = parent.bounds.min_x + parent.width() / 2.0;
    let expected_mid_y = parent.bounds.min_y + parent.height() / 2.0;
    assert!((mid_x - expected_mid_x).abs() < 1e-12);
    assert!((mid_y - expected_mid_y).abs() < 1e-12);

    // Areas sum to the parent's area
    let area: f64 = [sw, se, nw, ne]
        .iter()
        .map(|t| t.width() * t.height())
        .sum();
    let parent_area = parent.width() * parent.height();
    assert!((area - parent_area).abs() <= parent_area * 1e-12);
}

// ============================================================================
// Tile bounds tests
// ============================================================================

#[test]
fn test_world_pyramid_examples() {
    let pyramid = TilePyramid::default();

    assert_eq!(
        pyramid.tile(0, 0, 0).bounds,
        Extent::new(-180.0, -90.0, 0.0, 90.0)
    );
    assert_eq!(
        pyramid.tile(0, 1, 0).bounds,
        Extent::new(0.0, -90.0, 180.0, 90.0)
    );
    assert_eq!(
        pyramid.tile(1, 0, 0).bounds,
        Extent::new(-180.0, -90.0, -90.0, 0.0)
    );
}

#[test]
fn test_tile_size_halves_each_zoom() {
    let pyramid = TilePyramid::default();
    let mut previous = pyramid.tile_size(0);
    for zoom in 1..20 {
        let size = pyramid.tile_size(zoom);
        assert_eq!(size.0 * 2.0, previous.0);
        assert_eq!(size.1 * 2.0, previous.1);
        previous = size;
    }
}

#[test]
fn test_num_tiles() {
    let pyramid = TilePyramid::default();
    assert_eq!(pyramid.num_tiles(0), (2, 1));
    assert_eq!(pyramid.num_tiles(8), (512, 256));
}

#[test]
fn test_custom_pyramid() {
    let pyramid = TilePyramid::new(1, 1, Extent::new(0.0, 0.0, 1024.0, 512.0)).unwrap();
    let tile = pyramid.tile(2, 3, 1);
    assert_eq!(tile.bounds, Extent::new(768.0, 128.0, 1024.0, 256.0));
    assert!(TilePyramid::new(0, 1, Extent::world()).is_err());
}

#[test]
fn test_tile_out_of_root_is_not_validated() {
    let pyramid = TilePyramid::default();
    let tile = pyramid.tile(0, 2, 0);
    assert_eq!(tile.bounds.min_x, 180.0);
    assert!(!pyramid.is_valid(&tile.address));
}

#[test]
fn test_tile_intersects_touching_extent() {
    let pyramid = TilePyramid::default();
    let tile = pyramid.tile(0, 0, 0);
    assert!(tile.intersects(&Extent::new(0.0, 0.0, 10.0, 10.0)));
    assert!(!tile.intersects(&Extent::new(0.5, 0.0, 10.0, 10.0)));
}

// ============================================================================
// Subdivision tests
// ============================================================================

#[test]
fn test_children_partition_root_tiles() {
    let pyramid = TilePyramid::default();
    assert_partition(&pyramid.tile(0, 0, 0));
    assert_partition(&pyramid.tile(0, 1, 0));
}

#[test]
fn test_children_partition_deep_tiles() {
    let pyramid = TilePyramid::default();
    for &(z, x, y) in &[(8, 77, 190), (12, 1234, 3000), (5, 63, 31)] {
        assert_partition(&pyramid.tile(z, x, y));
    }
}

#[test]
fn test_children_partition_irregular_bounds() {
    let tile = Tile::new(
        TileAddress::new(3, 5, 2),
        Extent::new(-73.1, 40.3, -72.9, 40.47),
    );
    assert_partition(&tile);
}

#[test]
fn test_children_match_pyramid_tiles() {
    let pyramid = TilePyramid::default();
    let parent = pyramid.tile(4, 9, 6);
    for child in parent.children() {
        let direct = pyramid.tile(child.z(), child.x(), child.y());
        assert_eq!(child.address, direct.address);
        assert!((child.bounds.min_x - direct.bounds.min_x).abs() < 1e-9);
        assert!((child.bounds.max_y - direct.bounds.max_y).abs() < 1e-9);
    }
}

#[test]
fn test_child_addresses() {
    let tile = TilePyramid::default().tile(5, 10, 15);
    assert_eq!(
        tile.create_child(Quadrant::SouthWest).address,
        TileAddress::new(6, 20, 30)
    );
    assert_eq!(
        tile.create_child(Quadrant::NorthEast).address,
        TileAddress::new(6, 21, 31)
    );
}

#[test]
fn test_address_cache_key() {
    assert_eq!(TileAddress::new(8, 77, 190).cache_key(), "8/77/190");
}

//! Nearest-neighbour resampling of a read window into an output buffer.

use tile_common::BandGrid;

/// Source index sampled by output index `i` when `src_len` pixels are spread
/// over `dst_len` pixels. Samples are taken at output pixel centres.
fn source_index(i: usize, src_len: usize, dst_len: usize) -> usize {
    let pos = (i as f64 + 0.5) * src_len as f64 / dst_len as f64;
    (pos.floor() as usize).min(src_len.saturating_sub(1))
}

/// Resample `src` to `rows` x `cols` using nearest neighbour.
pub fn nearest(src: &BandGrid, rows: usize, cols: usize) -> BandGrid {
    if src.rows == rows && src.cols == cols {
        return src.clone();
    }
    if src.rows == 0 || src.cols == 0 {
        return BandGrid::filled(rows, cols, 0.0);
    }

    let col_map: Vec<usize> = (0..cols)
        .map(|c| source_index(c, src.cols, cols))
        .collect();

    let mut data = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        let sr = source_index(r, src.rows, rows);
        let line = &src.data[sr * src.cols..(sr + 1) * src.cols];
        data.extend(col_map.iter().map(|&sc| line[sc]));
    }

    BandGrid { rows, cols, data }
}

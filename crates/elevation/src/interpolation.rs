//! Interpolation modes and the corner arithmetic they share.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a height is derived for a fractional pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Value of the cell at the truncated position.
    Nearest,
    /// Linear blend between the clamped floor/ceil neighbours.
    Bilinear,
    /// Weighted blend using the remainders against the truncated cell.
    #[default]
    Average,
}

impl FromStr for Interpolation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Interpolation::Nearest),
            "bilinear" => Ok(Interpolation::Bilinear),
            "average" => Ok(Interpolation::Average),
            other => Err(format!("unknown interpolation mode: {}", other)),
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Interpolation::Nearest => "nearest",
            Interpolation::Bilinear => "bilinear",
            Interpolation::Average => "average",
        };
        f.write_str(name)
    }
}

/// The floor/ceil neighbourhood of a fractional position, clamped to the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Neighbourhood {
    pub col_min: usize,
    pub col_max: usize,
    pub row_min: usize,
    pub row_max: usize,
}

impl Neighbourhood {
    pub fn around(c: f64, r: f64, width: usize, height: usize) -> Self {
        let (mut col_min, col_max) = floor_ceil(c, width);
        let (mut row_min, row_max) = floor_ceil(r, height);
        if row_min > row_max {
            row_min = row_max;
        }
        if col_min > col_max {
            col_min = col_max;
        }
        Self {
            col_min,
            col_max,
            row_min,
            row_max,
        }
    }
}

fn floor_ceil(v: f64, len: usize) -> (usize, usize) {
    let last = len.saturating_sub(1) as f64;
    let lo = tile_common::clamp(v.floor(), 0.0, last) as usize;
    let hi = tile_common::clamp(v.ceil(), 0.0, last) as usize;
    (lo, hi)
}

/// Corner heights: lower-left, upper-left, lower-right, upper-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Corners {
    pub ll: f64,
    pub ul: f64,
    pub lr: f64,
    pub ur: f64,
}

pub(crate) fn bilinear(c: f64, r: f64, n: &Neighbourhood, k: &Corners) -> f64 {
    let col_min = n.col_min as f64;
    let col_max = n.col_max as f64;
    let row_min = n.row_min as f64;
    let row_max = n.row_max as f64;

    if n.col_max == n.col_min && n.row_max == n.row_min {
        k.ll
    } else if n.col_max == n.col_min {
        (row_max - r) * k.ll + (r - row_min) * k.ul
    } else if n.row_max == n.row_min {
        (col_max - c) * k.ll + (c - col_min) * k.lr
    } else {
        let r1 = (col_max - c) * k.ll + (c - col_min) * k.lr;
        let r2 = (col_max - c) * k.ul + (c - col_min) * k.ur;
        (row_max - r) * r1 + (r - row_min) * r2
    }
}

pub(crate) fn weighted_average(c: f64, r: f64, k: &Corners) -> f64 {
    let x_rem = c - c.trunc();
    let y_rem = r - r.trunc();

    let w00 = (1.0 - y_rem) * (1.0 - x_rem) * k.ll;
    let w01 = (1.0 - y_rem) * x_rem * k.lr;
    let w10 = y_rem * (1.0 - x_rem) * k.ul;
    let w11 = y_rem * x_rem * k.ur;

    w00 + w01 + w10 + w11
}

//! Synthetic terrain.
//!
//! All fixtures use row 0 as the northern edge. Constructors panic on
//! invalid geometry since they are only called with literal dimensions.

use usped_core::{CellSize, ElevationGrid};

/// No-data sentinel used by [`grid_with_holes`].
pub const NODATA: f64 = -9999.0;

/// Every cell at elevation `z`.
pub fn flat_grid(rows: usize, cols: usize, z: f64) -> ElevationGrid {
    ElevationGrid::from_fn(rows, cols, CellSize::square(1.0), |_, _| z)
        .expect("flat fixture geometry")
}

/// Planar slope falling `drop` metres per row southward from 100 m.
///
/// Drains due south; the bottom row is a line of pits.
pub fn row_ramp(rows: usize, cols: usize, drop: f64) -> ElevationGrid {
    ElevationGrid::from_fn(rows, cols, CellSize::square(1.0), |r, _| {
        100.0 - drop * r as f64
    })
    .expect("ramp fixture geometry")
}

/// A [`row_ramp`] of one metre per row that levels out into a flat
/// floor from row `floor_row` southward.
pub fn slope_onto_floor(rows: usize, cols: usize, floor_row: usize) -> ElevationGrid {
    ElevationGrid::from_fn(rows, cols, CellSize::square(1.0), |r, _| {
        100.0 - r.min(floor_row) as f64
    })
    .expect("floor fixture geometry")
}

/// Square grid of side `n` draining to its south-east corner, the single
/// outlet. Accumulation there equals the total grid area.
pub fn corner_basin(n: usize, cell: f64) -> ElevationGrid {
    ElevationGrid::from_fn(n, n, CellSize::square(cell), |r, c| {
        ((n - 1 - r) + (n - 1 - c)) as f64
    })
    .expect("basin fixture geometry")
}

/// A [`row_ramp`] with `holes` (row, col) cells set to [`NODATA`].
pub fn grid_with_holes(rows: usize, cols: usize, holes: &[(usize, usize)]) -> ElevationGrid {
    let mut values: Vec<f64> = (0..rows * cols)
        .map(|i| 100.0 - (i / cols) as f64)
        .collect();
    for &(r, c) in holes {
        values[r * cols + c] = NODATA;
    }
    ElevationGrid::with_nodata(rows, cols, CellSize::square(1.0), values, NODATA)
        .expect("holed fixture geometry")
}

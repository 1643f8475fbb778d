//! Shared stencil helpers for row-major grids.
//!
//! Axis resolution, safe division, one-sided/central differences, and the
//! no-flux neighbour lookup used by both the terrain analyzer and the
//! evolution solver. Centralised here so every stencil applies the same
//! boundary and no-data policy.
//!
//! Conventions: row 0 is north, so "north" is `row - 1` and the y axis used
//! in gradients points north. Columns increase eastward along x.

use crate::grid::ElevationGrid;

/// Denominators smaller than this are treated as zero by [`safe_div`].
pub const DIV_EPSILON: f64 = 1e-12;

/// Resolve `val` on an axis of length `len`. Out-of-bounds positions are
/// absorbed (`None`); grids never wrap.
#[inline]
pub fn resolve_axis(val: isize, len: usize) -> Option<usize> {
    (val >= 0 && (val as usize) < len).then_some(val as usize)
}

/// Flat index of the neighbour of `(row, col)` at offset `(dr, dc)`, or
/// `None` if it falls outside the grid.
#[inline]
pub fn offset_index(
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
    rows: usize,
    cols: usize,
) -> Option<usize> {
    let nr = resolve_axis(row as isize + dr, rows)?;
    let nc = resolve_axis(col as isize + dc, cols)?;
    Some(nr * cols + nc)
}

/// `num / den`, or `0.0` when `den` is (numerically) zero or either operand
/// is not finite.
#[inline]
pub fn safe_div(num: f64, den: f64) -> f64 {
    if !num.is_finite() || !den.is_finite() || den.abs() < DIV_EPSILON {
        0.0
    } else {
        num / den
    }
}

/// Finite difference along one axis.
///
/// `lo` and `hi` are the neighbours at `-spacing` and `+spacing`. Both
/// present gives a central difference, one present gives a one-sided
/// difference against `center`, neither gives `None`.
#[inline]
pub fn axis_difference(lo: Option<f64>, center: f64, hi: Option<f64>, spacing: f64) -> Option<f64> {
    match (lo, hi) {
        (Some(l), Some(h)) => Some((h - l) / (2.0 * spacing)),
        (None, Some(h)) => Some((h - center) / spacing),
        (Some(l), None) => Some((center - l) / spacing),
        (None, None) => None,
    }
}

/// Valid neighbour value of `(row, col)` at `(dr, dc)`, or `None` when the
/// neighbour is outside the grid or no-data.
#[inline]
pub fn valid_neighbour(grid: &ElevationGrid, row: usize, col: usize, dr: isize, dc: isize) -> Option<f64> {
    let i = offset_index(row, col, dr, dc, grid.rows(), grid.cols())?;
    grid.is_valid(i).then(|| grid.values()[i])
}

/// Elevation gradient `(dz/dx, dz/dy)` at `(row, col)` with y pointing north.
///
/// Interior cells use central differences, boundary cells and cells next
/// to no-data use one-sided differences. An axis with no usable neighbour
/// contributes zero; a cell with no usable neighbour on either axis (or a
/// no-data cell) returns `None`.
pub fn gradient(grid: &ElevationGrid, row: usize, col: usize) -> Option<(f64, f64)> {
    let i = grid.index(row, col);
    if !grid.is_valid(i) {
        return None;
    }
    let z = grid.values()[i];
    let cell = grid.cell_size();

    let gx = axis_difference(
        valid_neighbour(grid, row, col, 0, -1),
        z,
        valid_neighbour(grid, row, col, 0, 1),
        cell.dx,
    );
    // Northward y: the "hi" neighbour is the row above.
    let gy = axis_difference(
        valid_neighbour(grid, row, col, 1, 0),
        z,
        valid_neighbour(grid, row, col, -1, 0),
        cell.dy,
    );

    match (gx, gy) {
        (None, None) => None,
        (gx, gy) => Some((gx.unwrap_or(0.0), gy.unwrap_or(0.0))),
    }
}

/// No-flux lookup: the value at `(row + dr, col + dc)` in `values`, or
/// `values[center]` when that neighbour is outside the grid or not
/// `usable`. Boundary terms then reduce instead of amplifying.
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn neighbour_or_self(
    values: &[f64],
    usable: impl Fn(usize) -> bool,
    row: usize,
    col: usize,
    dr: isize,
    dc: isize,
    rows: usize,
    cols: usize,
) -> f64 {
    let center = row * cols + col;
    offset_index(row, col, dr, dc, rows, cols)
        .filter(|&i| usable(i))
        .map(|i| values[i])
        .unwrap_or(values[center])
}

/// Elevation range (max − min) over the valid cells within `reach` cells
/// of `(row, col)`, i.e. the `(2·reach + 1)²` window centred on it.
pub fn local_relief(grid: &ElevationGrid, row: usize, col: usize, reach: usize) -> f64 {
    let reach = reach as isize;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for dr in -reach..=reach {
        for dc in -reach..=reach {
            if let Some(z) = valid_neighbour(grid, row, col, dr, dc) {
                lo = lo.min(z);
                hi = hi.max(z);
            }
        }
    }
    if hi >= lo {
        hi - lo
    } else {
        0.0
    }
}

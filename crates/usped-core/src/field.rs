//! Derived per-cell scalar fields.
//!
//! A [`Field`] shares the row-major layout of the [`ElevationGrid`] it was
//! derived from. `NaN` marks a cell as undefined (no-data input, or a
//! quantity that cannot be computed there); defined-only accessors skip
//! those cells so sentinels never leak into sums or extremes.

use crate::error::GridError;
use crate::grid::ElevationGrid;

/// A row-major field of `f64` values where `NaN` means undefined.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Field {
    /// Wrap row-major `values`.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the field is empty or `values.len()` is not
    /// `rows * cols`.
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid);
        }
        if values.len() != rows * cols {
            return Err(GridError::ShapeMismatch {
                expected: rows * cols,
                actual: values.len(),
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// A field shaped like `grid`, `value` at valid cells and `NaN` at no-data.
    pub fn masked_fill(grid: &ElevationGrid, value: f64) -> Self {
        let values = grid
            .valid_mask()
            .iter()
            .map(|&ok| if ok { value } else { f64::NAN })
            .collect();
        Self {
            rows: grid.rows(),
            cols: grid.cols(),
            values,
        }
    }

    /// A field shaped like `grid` with `f(index)` at every cell.
    pub fn from_cells(grid: &ElevationGrid, f: impl FnMut(usize) -> f64) -> Self {
        Self {
            rows: grid.rows(),
            cols: grid.cols(),
            values: (0..grid.len()).map(f).collect(),
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: empty fields cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `(row, col)`; `None` when out of bounds or undefined.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let v = self.values[row * self.cols + col];
        (!v.is_nan()).then_some(v)
    }

    /// Raw row-major values, `NaN` included.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Whether the cell at flat `index` is defined.
    #[inline]
    pub fn is_defined(&self, index: usize) -> bool {
        !self.values[index].is_nan()
    }

    /// Iterator over defined values.
    pub fn defined(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied().filter(|v| !v.is_nan())
    }

    /// Number of defined cells.
    pub fn defined_count(&self) -> usize {
        self.defined().count()
    }

    /// Sum over defined cells.
    pub fn sum_defined(&self) -> f64 {
        self.defined().sum()
    }

    /// Largest defined value, or `None` if every cell is undefined.
    pub fn max_defined(&self) -> Option<f64> {
        self.defined().reduce(f64::max)
    }

    /// Smallest defined value, or `None` if every cell is undefined.
    pub fn min_defined(&self) -> Option<f64> {
        self.defined().reduce(f64::min)
    }

    /// A new field with `f` applied to every value (undefined included).
    pub fn map(&self, f: impl FnMut(f64) -> f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            values: self.values.iter().copied().map(f).collect(),
        }
    }

    /// Combine two same-shaped fields cell by cell.
    pub fn zip_with(&self, other: &Field, mut f: impl FnMut(f64, f64) -> f64) -> Self {
        debug_assert_eq!(self.len(), other.len());
        Self {
            rows: self.rows,
            cols: self.cols,
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    /// Check that this field has the same shape as `grid`.
    pub fn check_geometry(&self, grid: &ElevationGrid) -> Result<(), GridError> {
        if self.rows == grid.rows() && self.cols == grid.cols() {
            Ok(())
        } else {
            Err(GridError::GeometryMismatch {
                expected: (grid.rows(), grid.cols()),
                actual: (self.rows, self.cols),
            })
        }
    }

    /// Per-row mean over defined cells (`NaN` for an all-undefined row).
    pub fn row_means(&self) -> Vec<f64> {
        self.values
            .chunks(self.cols)
            .map(|row| {
                let (sum, n) = row
                    .iter()
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                if n == 0 {
                    f64::NAN
                } else {
                    sum / n as f64
                }
            })
            .collect()
    }
}

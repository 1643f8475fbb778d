//! Elevation grids and cell geometry.
//!
//! An [`ElevationGrid`] is row-major: row 0 is the northern edge, columns
//! increase eastward. Cells hold heights in metres. No-data cells are
//! tracked by an explicit validity mask so they can be excluded from
//! derivative and statistics computations without overloading a value.
//!
//! Grids are immutable once built. Every transform in the pipeline
//! produces a new grid via [`ElevationGrid::with_values`], so a
//! caller-supplied grid is never modified in place.

use crate::error::GridError;

/// Uniform horizontal spacing of grid cells, in metres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSize {
    /// Spacing between columns (east-west), metres.
    pub dx: f64,
    /// Spacing between rows (north-south), metres.
    pub dy: f64,
}

impl CellSize {
    /// Square cells with side `size`.
    pub fn square(size: f64) -> Self {
        Self { dx: size, dy: size }
    }

    /// Planimetric area of one cell (`dx * dy`), square metres.
    pub fn area(&self) -> f64 {
        self.dx * self.dy
    }

    /// Distance between the centres of diagonal neighbours.
    pub fn diagonal(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    fn validate(&self) -> Result<(), GridError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.dx) && ok(self.dy) {
            Ok(())
        } else {
            Err(GridError::InvalidCellSize {
                dx: self.dx,
                dy: self.dy,
            })
        }
    }
}

/// A 2D terrain-height grid with a no-data mask.
#[derive(Clone, Debug, PartialEq)]
pub struct ElevationGrid {
    rows: usize,
    cols: usize,
    cell: CellSize,
    values: Vec<f64>,
    valid: Vec<bool>,
}

impl ElevationGrid {
    /// Build a grid from row-major `values`.
    ///
    /// Non-finite values (NaN, ±inf) are treated as no-data.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the grid is empty, the buffer length is not
    /// `rows * cols`, or the cell size is not finite and positive.
    pub fn new(
        rows: usize,
        cols: usize,
        cell: CellSize,
        values: Vec<f64>,
    ) -> Result<Self, GridError> {
        Self::build(rows, cols, cell, values, None)
    }

    /// Build a grid where cells equal to `nodata` are masked out.
    ///
    /// Mirrors the usual raster convention of a numeric sentinel such as
    /// `-9999.0`. Non-finite values are masked as well.
    pub fn with_nodata(
        rows: usize,
        cols: usize,
        cell: CellSize,
        values: Vec<f64>,
        nodata: f64,
    ) -> Result<Self, GridError> {
        Self::build(rows, cols, cell, values, Some(nodata))
    }

    /// Build a grid by evaluating `f(row, col)` for every cell.
    pub fn from_fn(
        rows: usize,
        cols: usize,
        cell: CellSize,
        mut f: impl FnMut(usize, usize) -> f64,
    ) -> Result<Self, GridError> {
        let mut values = Vec::with_capacity(rows.saturating_mul(cols));
        for r in 0..rows {
            for c in 0..cols {
                values.push(f(r, c));
            }
        }
        Self::new(rows, cols, cell, values)
    }

    fn build(
        rows: usize,
        cols: usize,
        cell: CellSize,
        values: Vec<f64>,
        nodata: Option<f64>,
    ) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid);
        }
        let expected = rows * cols;
        if values.len() != expected {
            return Err(GridError::ShapeMismatch {
                expected,
                actual: values.len(),
            });
        }
        cell.validate()?;

        let valid = values
            .iter()
            .map(|&v| v.is_finite() && nodata.is_none_or(|nd| v != nd))
            .collect();

        Ok(Self {
            rows,
            cols,
            cell,
            values,
            valid,
        })
    }

    /// A new grid with the same geometry and mask, holding `values`.
    ///
    /// Cells that are no-data in `self` stay no-data regardless of the
    /// supplied value; a non-finite value at a valid cell masks it.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::ShapeMismatch`] if `values` has the wrong length.
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, GridError> {
        if values.len() != self.len() {
            return Err(GridError::ShapeMismatch {
                expected: self.len(),
                actual: values.len(),
            });
        }
        let valid = self
            .valid
            .iter()
            .zip(&values)
            .map(|(&ok, v)| ok && v.is_finite())
            .collect();
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            cell: self.cell,
            values,
            valid,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of cells, including no-data.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: empty grids cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cell spacing.
    pub fn cell_size(&self) -> CellSize {
        self.cell
    }

    /// Area of one cell in square metres.
    pub fn cell_area(&self) -> f64 {
        self.cell.area()
    }

    /// Flat row-major index of `(row, col)`.
    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// `(row, col)` of a flat index.
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Elevation at `(row, col)`, or `None` if out of bounds or no-data.
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let i = self.index(row, col);
        self.valid[i].then_some(self.values[i])
    }

    /// Raw row-major values. No-data cells hold whatever was supplied.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Row-major validity mask (`true` = data present).
    pub fn valid_mask(&self) -> &[bool] {
        &self.valid
    }

    /// Whether the cell at flat `index` holds data.
    #[inline]
    pub fn is_valid(&self, index: usize) -> bool {
        self.valid[index]
    }

    /// Number of cells holding data.
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// Iterate over `(flat_index, elevation)` for valid cells.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values
            .iter()
            .zip(&self.valid)
            .enumerate()
            .filter_map(|(i, (&v, &ok))| ok.then_some((i, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_empty_and_mismatched() {
        let cell = CellSize::square(1.0);
        assert_eq!(
            ElevationGrid::new(0, 3, cell, vec![]),
            Err(GridError::EmptyGrid)
        );
        assert_eq!(
            ElevationGrid::new(2, 2, cell, vec![1.0; 3]),
            Err(GridError::ShapeMismatch {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn new_rejects_bad_cell_size() {
        let err = ElevationGrid::new(1, 1, CellSize { dx: 0.0, dy: 1.0 }, vec![1.0]);
        assert!(matches!(err, Err(GridError::InvalidCellSize { .. })));
        let err = ElevationGrid::new(1, 1, CellSize::square(f64::NAN), vec![1.0]);
        assert!(matches!(err, Err(GridError::InvalidCellSize { .. })));
    }

    #[test]
    fn nodata_sentinel_and_nan_are_masked() {
        let g = ElevationGrid::with_nodata(
            1,
            4,
            CellSize::square(2.0),
            vec![1.0, -9999.0, f64::NAN, 4.0],
            -9999.0,
        )
        .unwrap();
        assert_eq!(g.valid_mask(), &[true, false, false, true]);
        assert_eq!(g.valid_count(), 2);
        assert_eq!(g.get(0, 1), None);
        assert_eq!(g.get(0, 3), Some(4.0));
        assert_eq!(g.cell_area(), 4.0);
    }

    #[test]
    fn with_values_keeps_mask_and_geometry() {
        let g = ElevationGrid::with_nodata(
            2,
            2,
            CellSize::square(1.0),
            vec![1.0, -1.0, 3.0, 4.0],
            -1.0,
        )
        .unwrap();
        let h = g.with_values(vec![5.0, 6.0, 7.0, 8.0]).unwrap();
        assert_eq!(h.valid_mask(), g.valid_mask());
        assert_eq!(h.get(0, 0), Some(5.0));
        assert_eq!(h.get(0, 1), None);
        // Source grid untouched.
        assert_eq!(g.get(0, 0), Some(1.0));
        assert!(g.with_values(vec![1.0]).is_err());
    }

    #[test]
    fn index_coords_roundtrip() {
        let g = ElevationGrid::from_fn(3, 4, CellSize::square(1.0), |r, c| (r * 4 + c) as f64)
            .unwrap();
        for i in 0..g.len() {
            let (r, c) = g.coords(i);
            assert_eq!(g.index(r, c), i);
        }
        assert_eq!(g.iter_valid().count(), 12);
    }
}

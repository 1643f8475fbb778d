//! Slope, aspect and flow derivatives of an elevation grid.

use smallvec::SmallVec;
use usped_core::grid_helpers::gradient;
use usped_core::{CellSize, ElevationGrid, Field};

use crate::flow::{self, FlowDirection};

/// Aspect reported for cells with (numerically) zero gradient.
pub const FLAT_ASPECT: f64 = -1.0;

/// Gradient magnitudes below this are flat.
pub const FLAT_GRADIENT: f64 = 1e-12;

/// Terrain products derived from one elevation grid.
///
/// Slope is in radians throughout the pipeline; [`slope_degrees`] is
/// provided for reporting. Aspect is the compass bearing of the downslope
/// direction in degrees, `[0, 360)` with 0 = north and increasing
/// clockwise, or [`FLAT_ASPECT`] on flats. Cells whose slope or aspect
/// cannot be computed (no-data, or no valid neighbour on either axis)
/// are `NaN` in both fields.
///
/// [`slope_degrees`]: TerrainDerivatives::slope_degrees
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainDerivatives {
    slope: Field,
    aspect: Field,
    flow_direction: Vec<Option<FlowDirection>>,
    flow_accumulation: Field,
    cell_size: CellSize,
}

impl TerrainDerivatives {
    /// Slope angle in radians.
    pub fn slope(&self) -> &Field {
        &self.slope
    }

    /// Slope angle in degrees.
    pub fn slope_degrees(&self) -> Field {
        self.slope.map(f64::to_degrees)
    }

    /// Downslope compass bearing in degrees.
    pub fn aspect(&self) -> &Field {
        &self.aspect
    }

    /// D8 receiver direction per cell; `None` for pits and no-data.
    pub fn flow_direction(&self) -> &[Option<FlowDirection>] {
        &self.flow_direction
    }

    /// Upslope contributing area in square metres.
    pub fn flow_accumulation(&self) -> &Field {
        &self.flow_accumulation
    }

    /// Cell spacing of the source grid.
    pub fn cell_size(&self) -> CellSize {
        self.cell_size
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.slope.rows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.slope.cols()
    }

    /// Whether the cell at flat `index` is a flat (aspect sentinel).
    pub fn is_flat(&self, index: usize) -> bool {
        self.aspect.values()[index] == FLAT_ASPECT
    }

    /// Flat indices of valid cells with no downslope receiver.
    pub fn pits(&self) -> Vec<usize> {
        self.flow_direction
            .iter()
            .enumerate()
            .filter(|&(i, d)| d.is_none() && self.flow_accumulation.is_defined(i))
            .map(|(i, _)| i)
            .collect()
    }

    /// Cells draining directly into `index`.
    pub fn donors(&self, grid: &ElevationGrid, index: usize) -> SmallVec<[usize; 8]> {
        flow::donors(grid, &self.flow_direction, index)
    }
}

/// Compass bearing of the downslope direction for gradient `(gx, gy)`
/// with y pointing north. Returns [`FLAT_ASPECT`] below [`FLAT_GRADIENT`].
pub fn aspect_from_gradient(gx: f64, gy: f64) -> f64 {
    if gx.hypot(gy) < FLAT_GRADIENT {
        return FLAT_ASPECT;
    }
    let bearing = (-gx).atan2(-gy).to_degrees();
    let a = bearing.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Derive slope, aspect, flow direction and flow accumulation.
///
/// Pure function of the grid: the input is never modified and nothing is
/// cached here. Pits terminate accumulation and are left unfilled.
pub fn analyze(grid: &ElevationGrid) -> TerrainDerivatives {
    let mut slope = Vec::with_capacity(grid.len());
    let mut aspect = Vec::with_capacity(grid.len());

    for r in 0..grid.rows() {
        for c in 0..grid.cols() {
            match gradient(grid, r, c) {
                Some((gx, gy)) => {
                    slope.push(gx.hypot(gy).atan());
                    aspect.push(aspect_from_gradient(gx, gy));
                }
                None => {
                    slope.push(f64::NAN);
                    aspect.push(f64::NAN);
                }
            }
        }
    }

    let flow_direction = flow::flow_directions(grid);
    let flow_accumulation = flow::flow_accumulation(grid, &flow_direction);

    TerrainDerivatives {
        slope: Field::from_cells(grid, |i| slope[i]),
        aspect: Field::from_cells(grid, |i| aspect[i]),
        flow_direction,
        flow_accumulation,
        cell_size: grid.cell_size(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn aspect_compass_bearings() {
        // Surface rising northward drains south.
        assert!(approx(aspect_from_gradient(0.0, 1.0), 180.0));
        // Rising eastward drains west.
        assert!(approx(aspect_from_gradient(1.0, 0.0), 270.0));
        // Rising southward drains north.
        assert!(approx(aspect_from_gradient(0.0, -1.0), 0.0));
        // Rising westward drains east.
        assert!(approx(aspect_from_gradient(-1.0, 0.0), 90.0));
        assert_eq!(aspect_from_gradient(0.0, 0.0), FLAT_ASPECT);
    }

    #[test]
    fn row_ramp_slope_and_aspect() {
        // Elevation drops by 1 per row southward.
        let g = ElevationGrid::from_fn(5, 5, CellSize::square(1.0), |r, _| 100.0 - r as f64)
            .unwrap();
        let d = analyze(&g);
        let expected = 1.0f64.atan();
        for v in d.slope().values() {
            assert!(approx(*v, expected));
        }
        for v in d.aspect().values() {
            assert!(approx(*v, 180.0));
        }
        assert_eq!(d.pits().len(), 5);
    }

    #[test]
    fn flat_grid_reports_sentinel_aspect() {
        let g = ElevationGrid::from_fn(4, 4, CellSize::square(1.0), |_, _| 100.0).unwrap();
        let d = analyze(&g);
        assert!((0..g.len()).all(|i| d.is_flat(i)));
        assert!(d.slope().values().iter().all(|&s| s == 0.0));
        // Every cell is its own pit on a flat.
        assert_eq!(d.pits().len(), 16);
    }

    #[test]
    fn isolated_cell_is_undefined_not_zero() {
        let nd = -9999.0;
        let mut values = vec![nd; 9];
        values[4] = 3.0;
        let g = ElevationGrid::with_nodata(3, 3, CellSize::square(1.0), values, nd).unwrap();
        let d = analyze(&g);
        assert!(d.slope().values()[4].is_nan());
        assert!(d.aspect().values()[4].is_nan());
        assert!(!d.is_flat(4));
        assert_eq!(d.flow_accumulation().get(1, 1), Some(1.0));
    }

    #[test]
    fn slope_degrees_converts() {
        let g = ElevationGrid::from_fn(3, 3, CellSize::square(1.0), |_, c| c as f64).unwrap();
        let d = analyze(&g);
        assert!(approx(d.slope_degrees().values()[4], 45.0));
    }

    proptest! {
        #[test]
        fn uniform_plane_has_constant_interior_slope(
            ax in -2.0f64..2.0,
            ay in -2.0f64..2.0,
            dx in 0.5f64..5.0,
        ) {
            prop_assume!(ax.hypot(ay) > 1e-3);
            let cell = CellSize::square(dx);
            // z = ax * x + ay * y with y northward (row 0 north).
            let g = ElevationGrid::from_fn(6, 6, cell, |r, c| {
                ax * c as f64 * dx + ay * (5 - r) as f64 * dx
            }).unwrap();
            let d = analyze(&g);
            let slope = ax.hypot(ay).atan();
            let aspect = aspect_from_gradient(ax, ay);
            for r in 1..5 {
                for c in 1..5 {
                    let i = g.index(r, c);
                    prop_assert!((d.slope().values()[i] - slope).abs() < 1e-9);
                    let diff = (d.aspect().values()[i] - aspect).abs();
                    prop_assert!(diff < 1e-6 || (360.0 - diff) < 1e-6);
                }
            }
        }

        #[test]
        fn accumulation_sums_to_area_at_pits(
            values in prop::collection::vec(0.0f64..50.0, 36),
        ) {
            let g = ElevationGrid::new(6, 6, CellSize::square(2.0), values).unwrap();
            let d = analyze(&g);
            let at_pits: f64 = d
                .pits()
                .iter()
                .map(|&i| d.flow_accumulation().values()[i])
                .sum();
            let total = g.cell_area() * g.valid_count() as f64;
            prop_assert!((at_pits - total).abs() < 1e-6);
        }
    }
}

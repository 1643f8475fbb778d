//! Explicit finite-difference evolution step.
//!
//! `z_new = z − (Δt/ρ_b)·(div T − ε·∇²z)`, where `T` is resolved into
//! x/y components along the local downslope aspect before differencing.
//! Missing and no-data neighbours take the centre value (no-flux), so
//! boundary terms shrink rather than grow.
//!
//! The solver never changes `Δt`. When either stability condition fails it
//! returns [`Instability`] carrying the largest timestep that would have
//! passed, and the caller decides what to do.

use std::error::Error;
use std::fmt;

use usped_core::grid_helpers::{local_relief, neighbour_or_self};
use usped_core::{ElevationGrid, Field, GridError, SimulationParameters};
use usped_terrain::{TerrainDerivatives, FLAT_ASPECT};

use crate::transport::TransportCapacityField;

/// Slack added to the relief bound so exact-equality cases pass.
const RELIEF_TOLERANCE: f64 = 1e-12;

/// Cells between a cell and the farthest elevation its divergence reads:
/// one step to the neighbour's transport, one more to that neighbour's
/// gradient. Any cell with nonzero divergence therefore has nonzero
/// relief inside this window.
const STENCIL_REACH: usize = 2;

// ── Errors ──────────────────────────────────────────────────────

/// A timestep that would make the explicit scheme unphysical.
#[derive(Clone, Debug, PartialEq)]
pub enum Instability {
    /// `Δt` exceeds the explicit-diffusion bound `min(dx, dy)² / (4ε)`.
    DiffusionBound {
        /// Requested timestep.
        dt: f64,
        /// The bound.
        limit: f64,
        /// Largest timestep satisfying both conditions.
        max_stable_dt: f64,
    },
    /// The transport change at one cell exceeds the allowed fraction of
    /// the relief within the stencil's 5×5 reach.
    ReliefBound {
        /// Offending row.
        row: usize,
        /// Offending column.
        col: usize,
        /// `Δt·|div T|/ρ_b` at that cell, metres.
        change: f64,
        /// `fraction · local_relief` at that cell, metres.
        limit: f64,
        /// Largest timestep satisfying both conditions.
        max_stable_dt: f64,
    },
}

impl Instability {
    /// Largest timestep that would have passed both checks.
    pub fn max_stable_dt(&self) -> f64 {
        match self {
            Self::DiffusionBound { max_stable_dt, .. } | Self::ReliefBound { max_stable_dt, .. } => {
                *max_stable_dt
            }
        }
    }
}

impl fmt::Display for Instability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiffusionBound {
                dt,
                limit,
                max_stable_dt,
            } => write!(
                f,
                "dt {dt} exceeds diffusion stability bound {limit} (max stable dt {max_stable_dt})"
            ),
            Self::ReliefBound {
                row,
                col,
                change,
                limit,
                max_stable_dt,
            } => write!(
                f,
                "transport change {change} at ({row}, {col}) exceeds local relief limit {limit} \
                 (max stable dt {max_stable_dt})"
            ),
        }
    }
}

impl Error for Instability {}

/// Errors from [`step`].
#[derive(Clone, Debug, PartialEq)]
pub enum SolverError {
    /// Inputs disagree on grid shape.
    Geometry(GridError),
    /// The requested timestep violates a stability condition.
    Unstable(Instability),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geometry(e) => write!(f, "solver input geometry: {e}"),
            Self::Unstable(e) => write!(f, "numerical instability: {e}"),
        }
    }
}

impl Error for SolverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            Self::Unstable(e) => Some(e),
        }
    }
}

impl From<GridError> for SolverError {
    fn from(e: GridError) -> Self {
        Self::Geometry(e)
    }
}

impl From<Instability> for SolverError {
    fn from(e: Instability) -> Self {
        Self::Unstable(e)
    }
}

// ── Output ──────────────────────────────────────────────────────

/// Result of one evolution step.
///
/// Erosion and deposition are per-step depths in metres and are never
/// both nonzero at a cell. No-data cells keep their elevation and are
/// `NaN` in every derived field.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutput {
    /// Elevation after the step (a new grid; the input is untouched).
    pub elevation: ElevationGrid,
    /// `max(z_old − z_new, 0)`.
    pub erosion_rate: Field,
    /// `max(z_new − z_old, 0)`.
    pub deposition_rate: Field,
    /// Transport divergence `div T` used for the update.
    pub divergence: Field,
}

impl StepOutput {
    /// Signed net change `erosion − deposition` (`z_old − z_new`).
    pub fn net_erosion(&self) -> Field {
        self.erosion_rate
            .zip_with(&self.deposition_rate, |e, d| e - d)
    }
}

// ── Stencils ────────────────────────────────────────────────────

/// Transport divergence of `capacity` resolved along `aspect`.
///
/// Components are `Tx = T·sin(a)` (east) and `Ty = T·cos(a)` (north) for a
/// compass bearing `a`; flats and undefined cells contribute nothing.
pub fn transport_divergence(
    grid: &ElevationGrid,
    capacity: &Field,
    derivatives: &TerrainDerivatives,
) -> Field {
    let rows = grid.rows();
    let cols = grid.cols();
    let cell = grid.cell_size();

    let mut tx = vec![0.0; grid.len()];
    let mut ty = vec![0.0; grid.len()];
    for (i, (&t, &a)) in capacity
        .values()
        .iter()
        .zip(derivatives.aspect().values())
        .enumerate()
    {
        if t.is_nan() || a.is_nan() || a == FLAT_ASPECT {
            continue;
        }
        let rad = a.to_radians();
        tx[i] = t * rad.sin();
        ty[i] = t * rad.cos();
    }

    let usable = |i: usize| grid.is_valid(i);
    Field::from_cells(grid, |i| {
        if !grid.is_valid(i) {
            return f64::NAN;
        }
        let (r, c) = grid.coords(i);
        let east = neighbour_or_self(&tx, usable, r, c, 0, 1, rows, cols);
        let west = neighbour_or_self(&tx, usable, r, c, 0, -1, rows, cols);
        let north = neighbour_or_self(&ty, usable, r, c, -1, 0, rows, cols);
        let south = neighbour_or_self(&ty, usable, r, c, 1, 0, rows, cols);
        (east - west) / (2.0 * cell.dx) + (north - south) / (2.0 * cell.dy)
    })
}

/// Five-point Laplacian of elevation with no-flux boundaries.
pub fn laplacian(grid: &ElevationGrid) -> Field {
    let rows = grid.rows();
    let cols = grid.cols();
    let cell = grid.cell_size();
    let z = grid.values();
    let usable = |i: usize| grid.is_valid(i);

    Field::from_cells(grid, |i| {
        if !grid.is_valid(i) {
            return f64::NAN;
        }
        let (r, c) = grid.coords(i);
        let e = neighbour_or_self(z, usable, r, c, 0, 1, rows, cols);
        let w = neighbour_or_self(z, usable, r, c, 0, -1, rows, cols);
        let n = neighbour_or_self(z, usable, r, c, -1, 0, rows, cols);
        let s = neighbour_or_self(z, usable, r, c, 1, 0, rows, cols);
        (e + w - 2.0 * z[i]) / (cell.dx * cell.dx) + (n + s - 2.0 * z[i]) / (cell.dy * cell.dy)
    })
}

// ── Stability ───────────────────────────────────────────────────

/// Explicit-diffusion bound `min(dx, dy)² / (4ε)`; infinite when `ε = 0`.
pub fn diffusion_dt_limit(grid: &ElevationGrid, params: &SimulationParameters) -> f64 {
    let eps = params.diffusion_coefficient();
    if eps <= 0.0 {
        return f64::INFINITY;
    }
    let h = grid.cell_size().dx.min(grid.cell_size().dy);
    h * h / (4.0 * eps)
}

/// Largest timestep satisfying both stability conditions for `divergence`
/// on `grid`. Infinite when nothing constrains it.
pub fn max_stable_dt(grid: &ElevationGrid, divergence: &Field, params: &SimulationParameters) -> f64 {
    let rho = params.bulk_density();
    let fraction = params.stability_fraction();
    let mut best = diffusion_dt_limit(grid, params);
    for (i, &div) in divergence.values().iter().enumerate() {
        if div.is_nan() || div.abs() < f64::EPSILON {
            continue;
        }
        let (r, c) = grid.coords(i);
        let allowed = fraction * local_relief(grid, r, c, STENCIL_REACH) * rho / div.abs();
        best = best.min(allowed);
    }
    best
}

fn check_stability(
    grid: &ElevationGrid,
    divergence: &Field,
    params: &SimulationParameters,
) -> Result<(), Instability> {
    let dt = params.dt();
    let rho = params.bulk_density();
    let fraction = params.stability_fraction();

    let limit = diffusion_dt_limit(grid, params);
    if dt > limit {
        return Err(Instability::DiffusionBound {
            dt,
            limit,
            max_stable_dt: max_stable_dt(grid, divergence, params),
        });
    }

    // Report the worst offender, not the first.
    let mut worst: Option<(usize, f64, f64)> = None;
    for (i, &div) in divergence.values().iter().enumerate() {
        if div.is_nan() {
            continue;
        }
        let (r, c) = grid.coords(i);
        let change = dt * div.abs() / rho;
        let allowed = fraction * local_relief(grid, r, c, STENCIL_REACH);
        if change > allowed + RELIEF_TOLERANCE
            && worst.is_none_or(|(_, wc, wl)| change - allowed > wc - wl)
        {
            worst = Some((i, change, allowed));
        }
    }

    match worst {
        None => Ok(()),
        Some((i, change, allowed)) => {
            let (row, col) = grid.coords(i);
            Err(Instability::ReliefBound {
                row,
                col,
                change,
                limit: allowed,
                max_stable_dt: max_stable_dt(grid, divergence, params),
            })
        }
    }
}

// ── Step ────────────────────────────────────────────────────────

/// Advance `elevation` by one timestep of `params.dt()`.
///
/// Stateless: the same inputs always give the same output, and nothing
/// is carried between calls.
///
/// # Errors
///
/// [`SolverError::Geometry`] if `capacity` or `derivatives` were computed
/// for a differently shaped grid, [`SolverError::Unstable`] if `Δt`
/// violates either stability condition.
pub fn step(
    elevation: &ElevationGrid,
    capacity: &TransportCapacityField,
    derivatives: &TerrainDerivatives,
    params: &SimulationParameters,
) -> Result<StepOutput, SolverError> {
    capacity.capacity().check_geometry(elevation)?;
    derivatives.aspect().check_geometry(elevation)?;

    let divergence = transport_divergence(elevation, capacity.capacity(), derivatives);
    check_stability(elevation, &divergence, params)?;

    let lap = laplacian(elevation);
    let scale = params.dt() / params.bulk_density();
    let eps = params.diffusion_coefficient();
    let z = elevation.values();

    let new_z: Vec<f64> = (0..elevation.len())
        .map(|i| {
            if !elevation.is_valid(i) {
                return z[i];
            }
            z[i] - scale * (divergence.values()[i] - eps * lap.values()[i])
        })
        .collect();

    let erosion_rate = Field::from_cells(elevation, |i| {
        if elevation.is_valid(i) {
            (z[i] - new_z[i]).max(0.0)
        } else {
            f64::NAN
        }
    });
    let deposition_rate = Field::from_cells(elevation, |i| {
        if elevation.is_valid(i) {
            (new_z[i] - z[i]).max(0.0)
        } else {
            f64::NAN
        }
    });

    Ok(StepOutput {
        elevation: elevation.with_values(new_z)?,
        erosion_rate,
        deposition_rate,
        divergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::compute_transport_capacity;
    use proptest::prelude::*;
    use usped_core::CellSize;
    use usped_terrain::analyze;

    fn ramp(rows: usize, cols: usize) -> ElevationGrid {
        ElevationGrid::from_fn(rows, cols, CellSize::square(1.0), |r, _| 100.0 - r as f64)
            .unwrap()
    }

    fn run(grid: &ElevationGrid, params: &SimulationParameters) -> Result<StepOutput, SolverError> {
        let d = analyze(grid);
        let t = compute_transport_capacity(&d, params);
        step(grid, &t, &d, params)
    }

    #[test]
    fn laplacian_of_plane_is_zero_inside() {
        let g = ramp(5, 5);
        let lap = laplacian(&g);
        assert_eq!(lap.get(2, 2), Some(0.0));
        // North edge: the missing neighbour mirrors the centre.
        assert_eq!(lap.get(0, 2), Some(-1.0));
    }

    #[test]
    fn diffusion_limit_follows_cfl() {
        let g = ramp(3, 3);
        let p = SimulationParameters::builder()
            .diffusion_coefficient(0.25)
            .build()
            .unwrap();
        assert_eq!(diffusion_dt_limit(&g, &p), 1.0);
        let p = SimulationParameters::builder()
            .diffusion_coefficient(0.0)
            .build()
            .unwrap();
        assert!(diffusion_dt_limit(&g, &p).is_infinite());
    }

    #[test]
    fn ramp_erodes_increasingly_downslope() {
        let g = ramp(10, 10);
        let out = run(&g, &SimulationParameters::default()).unwrap();
        let means = out.erosion_rate.row_means();
        for r in 0..8 {
            assert!(means[r + 1] > means[r], "row {r}: {means:?}");
        }
        let peak = (0..10)
            .max_by(|&a, &b| means[a].total_cmp(&means[b]))
            .unwrap();
        assert!(peak >= 8);
        // Input grid is untouched.
        assert_eq!(g.get(0, 0), Some(100.0));
    }

    #[test]
    fn erosion_and_deposition_are_exclusive() {
        let g = ramp(8, 6);
        let out = run(&g, &SimulationParameters::default()).unwrap();
        for (e, d) in out
            .erosion_rate
            .values()
            .iter()
            .zip(out.deposition_rate.values())
        {
            assert!(*e == 0.0 || *d == 0.0);
            assert!(*e >= 0.0 && *d >= 0.0);
        }
    }

    #[test]
    fn cfl_violation_is_reported_not_applied() {
        let g = ramp(5, 5);
        let p = SimulationParameters::builder()
            .diffusion_coefficient(0.5)
            .dt(1.0)
            .build()
            .unwrap();
        match run(&g, &p) {
            Err(SolverError::Unstable(Instability::DiffusionBound { limit, max_stable_dt, .. })) => {
                assert_eq!(limit, 0.5);
                assert!(max_stable_dt <= 0.5);
            }
            other => panic!("expected diffusion instability, got {other:?}"),
        }
    }

    #[test]
    fn large_dt_trips_relief_bound_with_usable_hint() {
        let g = ramp(10, 10);
        let p = SimulationParameters::builder().dt(20.0).build().unwrap();
        let err = match run(&g, &p) {
            Err(SolverError::Unstable(e @ Instability::ReliefBound { .. })) => e,
            other => panic!("expected relief instability, got {other:?}"),
        };
        let hint = err.max_stable_dt();
        assert!(hint > 0.0 && hint < 20.0);
        let retry = p.with_dt(hint).unwrap();
        assert!(run(&g, &retry).is_ok());
    }

    #[test]
    fn slope_onto_flat_floor_is_stable() {
        // Rows 4.. are a flat floor; the floor edge still receives sediment.
        let g = ElevationGrid::from_fn(10, 10, CellSize::square(1.0), |r, _| {
            100.0 - r.min(4) as f64
        })
        .unwrap();
        let p = SimulationParameters::default();
        let d = analyze(&g);
        let t = compute_transport_capacity(&d, &p);
        let div = transport_divergence(&g, t.capacity(), &d);
        let hint = max_stable_dt(&g, &div, &p);
        assert!(hint > 1.0 && hint.is_finite(), "hint {hint}");

        let out = step(&g, &t, &d, &p).unwrap();
        let floor = out.deposition_rate.row_means();
        assert!(floor[5] > 0.0, "{floor:?}");
        assert!(out.erosion_rate.row_means()[3] > 0.0);
    }

    #[test]
    fn mismatched_inputs_are_rejected() {
        let g = ramp(4, 4);
        let other = ramp(5, 5);
        let p = SimulationParameters::default();
        let d = analyze(&other);
        let t = compute_transport_capacity(&d, &p);
        assert!(matches!(step(&g, &t, &d, &p), Err(SolverError::Geometry(_))));
    }

    #[test]
    fn nodata_cells_keep_elevation() {
        let nd = -9999.0;
        let mut values: Vec<f64> = (0..25).map(|i| 100.0 - (i / 5) as f64).collect();
        values[12] = nd;
        let g = ElevationGrid::with_nodata(5, 5, CellSize::square(1.0), values, nd).unwrap();
        let out = run(&g, &SimulationParameters::default()).unwrap();
        assert_eq!(out.elevation.values()[12], nd);
        assert!(!out.elevation.is_valid(12));
        assert!(out.erosion_rate.values()[12].is_nan());
        assert!(out.net_erosion().values()[12].is_nan());
    }

    proptest! {
        #[test]
        fn any_terrain_has_a_positive_stable_dt(values in prop::collection::vec(0.0f64..20.0, 36)) {
            let g = ElevationGrid::new(6, 6, CellSize::square(1.0), values).unwrap();
            let p = SimulationParameters::default();
            let d = analyze(&g);
            let t = compute_transport_capacity(&d, &p);
            let div = transport_divergence(&g, t.capacity(), &d);
            let hint = max_stable_dt(&g, &div, &p);
            prop_assert!(hint > 0.0);
            let retry = p.with_dt(hint.min(p.dt())).unwrap();
            prop_assert!(run(&g, &retry).is_ok());
        }

        #[test]
        fn no_forcing_is_identity(values in prop::collection::vec(0.0f64..20.0, 25)) {
            let g = ElevationGrid::new(5, 5, CellSize::square(1.0), values).unwrap();
            let p = SimulationParameters::builder()
                .soil_erodibility(0.0)
                .diffusion_coefficient(0.0)
                .build()
                .unwrap();
            let out = run(&g, &p).unwrap();
            prop_assert_eq!(out.elevation.values(), g.values());
            prop_assert_eq!(out.erosion_rate.sum_defined(), 0.0);
            prop_assert_eq!(out.deposition_rate.sum_defined(), 0.0);
        }
    }
}

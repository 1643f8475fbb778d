//! Benchmark profiles for the USPED erosion engine.
//!
//! Provides deterministic synthetic terrain and matching parameters:
//!
//! - [`reference_grid`]: 100x100 grid (10K cells) of rolling hillslope
//! - [`stress_grid`]: 316x316 grid (~100K cells) for stress testing
//! - [`stable_params`]: defaults with `dt` scaled under the stability limit

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use usped_core::{CellSize, ElevationGrid, SimulationParameters};
use usped_solver::evolution::transport_divergence;
use usped_solver::{compute_transport_capacity, max_stable_dt};
use usped_terrain::analyze;

/// Cell spacing of every profile, in metres.
pub const PROFILE_CELL: f64 = 10.0;

/// Build a reference benchmark profile: 100x100 grid (10K cells).
pub fn reference_grid(seed: u64) -> ElevationGrid {
    rolling_hills(100, 100, seed)
}

/// Build a stress benchmark profile: 316x316 grid (~100K cells).
pub fn stress_grid(seed: u64) -> ElevationGrid {
    rolling_hills(316, 316, seed)
}

/// South-draining slope with cross-slope ridges and seeded roughness.
///
/// The roughness creates small pits and ties so routing does not
/// degenerate into parallel lines.
pub fn rolling_hills(rows: usize, cols: usize, seed: u64) -> ElevationGrid {
    ElevationGrid::from_fn(rows, cols, CellSize::square(PROFILE_CELL), |r, c| {
        let slope = 500.0 - 2.0 * r as f64;
        let ridges = 6.0 * (c as f64 / 9.0).sin() + 3.0 * (r as f64 / 13.0).cos();
        slope + ridges + 0.5 * roughness(seed, r * cols + c)
    })
    .expect("profile geometry")
}

/// Deterministic value in `[0, 1)` for cell `i`.
fn roughness(seed: u64, i: usize) -> f64 {
    let h = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add((i as u64).wrapping_mul(1442695040888963407));
    (h >> 11) as f64 / (1u64 << 53) as f64
}

/// Default parameters with `dt = safety × max_stable_dt` for `grid`.
pub fn stable_params(grid: &ElevationGrid, safety: f64) -> SimulationParameters {
    let params = SimulationParameters::default();
    let derivatives = analyze(grid);
    let capacity = compute_transport_capacity(&derivatives, &params);
    let divergence = transport_divergence(grid, capacity.capacity(), &derivatives);
    let limit = max_stable_dt(grid, &divergence, &params);
    params
        .with_dt(limit.min(1.0) * safety)
        .expect("scaled dt is positive")
}

//! One timed pass of the numerical pipeline.
//!
//! Every mode is built from [`run_pass`]: transport capacity, one solver
//! step and aggregation over precomputed terrain derivatives. Terrain
//! analysis is separate ([`analyze_timed`]) so callers decide when it can
//! be reused.

use std::time::Instant;

use usped_core::{ElevationGrid, Field, SimulationParameters};
use usped_solver::{
    compute_transport_capacity, step, summarize, ErosionStatistics, RiskClassification,
    SolverError, StepOutput,
};
use usped_terrain::{analyze, TerrainDerivatives};

use crate::cancel::CancelToken;
use crate::executor::Executor;
use crate::metrics::{micros, RunMetrics};

/// Output of one successful pass.
pub(crate) struct Pass {
    pub output: StepOutput,
    pub statistics: ErosionStatistics,
    pub risk: RiskClassification,
}

/// Analyse `grid`, charging the time to `metrics`.
pub(crate) fn analyze_timed(grid: &ElevationGrid, metrics: &mut RunMetrics) -> TerrainDerivatives {
    let t0 = Instant::now();
    let derivatives = analyze(grid);
    metrics.terrain_us += micros(t0.elapsed());
    derivatives
}

/// Transport → step → summary over `derivatives` of `grid`.
///
/// The pass counts towards `metrics.passes` whether or not it succeeds.
pub(crate) fn run_pass(
    grid: &ElevationGrid,
    derivatives: &TerrainDerivatives,
    params: &SimulationParameters,
    metrics: &mut RunMetrics,
) -> Result<Pass, SolverError> {
    metrics.passes += 1;

    let t0 = Instant::now();
    let capacity = compute_transport_capacity(derivatives, params);
    metrics.transport_us += micros(t0.elapsed());
    metrics.clamped_cells += capacity.clamped_cells() as u64;

    let t1 = Instant::now();
    let stepped = step(grid, &capacity, derivatives, params);
    metrics.solver_us += micros(t1.elapsed());
    let output = stepped?;

    let t2 = Instant::now();
    let (statistics, risk) = summarize(&output.net_erosion(), grid.cell_area());
    metrics.aggregation_us += micros(t2.elapsed());

    Ok(Pass {
        output,
        statistics,
        risk,
    })
}

/// `after − before` at valid cells of `before`, `NaN` elsewhere.
pub(crate) fn elevation_change(before: &ElevationGrid, after: &ElevationGrid) -> Field {
    let (a, b) = (before.values(), after.values());
    Field::from_cells(before, |i| {
        if before.is_valid(i) {
            b[i] - a[i]
        } else {
            f64::NAN
        }
    })
}

/// Inputs shared by every mode runner.
pub(crate) struct RunContext<'a> {
    pub grid: &'a ElevationGrid,
    pub params: &'a SimulationParameters,
    pub derivatives: &'a TerrainDerivatives,
    pub executor: Executor,
    pub cancel: &'a CancelToken,
}

//! Single-run mode: one pass over the input grid.

use usped_core::SimulationParameters;

use crate::error::SimulationError;
use crate::metrics::RunMetrics;
use crate::pipeline::{elevation_change, run_pass, Pass, RunContext};
use crate::result::{ModeDetails, SimulationMode, SimulationResult};

/// Package a pass as a result.
pub(crate) fn result_from_pass(
    ctx: &RunContext<'_>,
    mode: SimulationMode,
    params: &SimulationParameters,
    pass: Pass,
    metrics: RunMetrics,
    details: ModeDetails,
) -> SimulationResult {
    let elevation_change = elevation_change(ctx.grid, &pass.output.elevation);
    SimulationResult {
        mode,
        parameters: params.clone(),
        elevation: pass.output.elevation,
        elevation_change,
        erosion_rate: pass.output.erosion_rate,
        deposition_rate: pass.output.deposition_rate,
        risk: pass.risk,
        statistics: pass.statistics,
        metrics,
        details,
    }
}

pub(crate) fn run(
    ctx: &RunContext<'_>,
    metrics: &mut RunMetrics,
) -> Result<SimulationResult, SimulationError> {
    let pass = run_pass(ctx.grid, ctx.derivatives, ctx.params, metrics)?;
    tracing::info!(
        mean_erosion = pass.statistics.mean_erosion,
        peak_erosion = pass.statistics.peak_erosion,
        erosion_volume = pass.statistics.erosion_volume,
        "single run completed"
    );
    Ok(result_from_pass(
        ctx,
        SimulationMode::SingleRun,
        ctx.params,
        pass,
        metrics.clone(),
        ModeDetails::SingleRun,
    ))
}

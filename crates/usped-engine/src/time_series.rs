//! Time-series mode: repeated passes, each starting from the previous
//! output elevation.
//!
//! Terrain derivatives are recomputed every step since elevation changes.
//! The first instability aborts the series unless adaptive reduction is
//! enabled; either way the snapshots completed so far are returned.

use usped_core::ElevationGrid;
use usped_solver::{summarize, SolverError};

use crate::config::TimeSeriesConfig;
use crate::error::SimulationError;
use crate::metrics::RunMetrics;
use crate::pipeline::{analyze_timed, elevation_change, run_pass, Pass, RunContext};
use crate::result::{
    ModeDetails, SimulationMode, SimulationResult, Snapshot, TimeSeriesRecord,
};

pub(crate) fn run(
    ctx: &RunContext<'_>,
    config: &TimeSeriesConfig,
    metrics: &mut RunMetrics,
) -> Result<SimulationResult, SimulationError> {
    let steps = config.num_timesteps.unwrap_or(ctx.params.num_timesteps());
    let mut record = TimeSeriesRecord::new(steps);
    let mut params = ctx.params.clone();
    let mut current: ElevationGrid = ctx.grid.clone();

    tracing::info!(steps, dt = params.dt(), "time series started");

    for k in 1..=steps {
        if ctx.cancel.is_cancelled() {
            return Err(SimulationError::Cancelled {
                completed: (k - 1) as usize,
            });
        }

        let fresh;
        let derivatives = if k == 1 {
            ctx.derivatives
        } else {
            fresh = analyze_timed(&current, metrics);
            &fresh
        };

        let mut retries = 0u32;
        let pass: Pass = loop {
            match run_pass(&current, derivatives, &params, metrics) {
                Ok(pass) => break pass,
                Err(SolverError::Unstable(instability))
                    if config
                        .adaptive
                        .as_ref()
                        .is_some_and(|a| retries < a.max_retries) =>
                {
                    let factor = config
                        .adaptive
                        .as_ref()
                        .map_or(1.0, |a| a.reduction_factor);
                    let reduced = params.dt() * factor;
                    tracing::warn!(
                        step = k,
                        dt = params.dt(),
                        reduced,
                        max_stable_dt = instability.max_stable_dt(),
                        "unstable step; reducing dt"
                    );
                    params = params.with_dt(reduced)?;
                    record.note_reduction();
                    retries += 1;
                }
                Err(cause) => {
                    tracing::warn!(step = k, completed = record.len(), %cause, "time series aborted");
                    return Err(SimulationError::TimeSeriesAborted {
                        failed_step: k,
                        cause,
                        partial: Box::new(record),
                    });
                }
            }
        };

        tracing::debug!(
            step = k,
            dt = params.dt(),
            mean_erosion = pass.statistics.mean_erosion,
            "time step completed"
        );

        current = pass.output.elevation.clone();
        record.push(Snapshot {
            step: k,
            dt: params.dt(),
            elevation: pass.output.elevation,
            erosion_rate: pass.output.erosion_rate,
            deposition_rate: pass.output.deposition_rate,
            statistics: pass.statistics,
        });
    }

    // Cumulative fields over the whole series.
    let change = elevation_change(ctx.grid, &current);
    let net = change.map(|d| -d);
    let (statistics, risk) = summarize(&net, ctx.grid.cell_area());
    let erosion_rate = net.map(|v| if v.is_nan() { v } else { v.max(0.0) });
    let deposition_rate = net.map(|v| if v.is_nan() { v } else { (-v).max(0.0) });

    tracing::info!(
        steps = record.len(),
        dt_reductions = record.dt_reductions(),
        mean_erosion = statistics.mean_erosion,
        "time series completed"
    );

    Ok(SimulationResult {
        mode: SimulationMode::TimeSeries,
        parameters: ctx.params.clone(),
        elevation: current,
        elevation_change: change,
        erosion_rate,
        deposition_rate,
        risk,
        statistics,
        metrics: metrics.clone(),
        details: ModeDetails::TimeSeries(record),
    })
}


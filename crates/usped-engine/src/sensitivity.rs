//! One-factor-at-a-time sensitivity analysis.
//!
//! A baseline pass, then for each configured parameter a low and a high
//! pass with that factor scaled by `1 ∓ vary_factor` and everything else
//! at baseline. Perturbed values are clamped into the documented range;
//! the clamp is recorded on the entry. An unstable perturbed pass is
//! recorded on its side of the entry and leaves that entry without an
//! index; every other entry is still reported. Terrain is analysed once
//! and shared by every pass.

use indexmap::IndexMap;
use usped_core::grid_helpers::safe_div;
use usped_core::{Parameter, SimulationParameters};

use crate::config::SensitivityConfig;
use crate::error::SimulationError;
use crate::metrics::RunMetrics;
use crate::pipeline::{run_pass, RunContext};
use crate::result::{
    ModeDetails, Perturbation, PerturbationOutcome, SensitivityEntry, SensitivityReport,
    SimulationMode, SimulationResult,
};
use crate::single::result_from_pass;

struct Task {
    parameter: Parameter,
    direction: Perturbation,
    value: f64,
    clamped: bool,
    params: SimulationParameters,
}

fn perturb(
    base: &SimulationParameters,
    parameter: Parameter,
    direction: Perturbation,
    vary_factor: f64,
) -> Result<Task, SimulationError> {
    let scale = match direction {
        Perturbation::Low => 1.0 - vary_factor,
        Perturbation::High => 1.0 + vary_factor,
    };
    let raw = parameter.get(base) * scale;
    let value = parameter.clamp(raw);
    Ok(Task {
        parameter,
        direction,
        value,
        clamped: value != raw,
        params: base.with_value(parameter, value)?,
    })
}

pub(crate) fn run(
    ctx: &RunContext<'_>,
    config: &SensitivityConfig,
    metrics: &mut RunMetrics,
) -> Result<SimulationResult, SimulationError> {
    tracing::info!(
        parameters = config.parameters.len(),
        vary_factor = config.vary_factor,
        "sensitivity analysis started"
    );

    let baseline = run_pass(ctx.grid, ctx.derivatives, ctx.params, metrics)?;
    let baseline_mean = baseline.statistics.mean_erosion;

    let tasks = config
        .parameters
        .iter()
        .flat_map(|&p| [(p, Perturbation::Low), (p, Perturbation::High)])
        .map(|(p, d)| perturb(ctx.params, p, d, config.vary_factor))
        .collect::<Result<Vec<_>, _>>()?;

    for t in tasks.iter().filter(|t| t.clamped) {
        tracing::warn!(
            parameter = t.parameter.symbol(),
            direction = %t.direction,
            value = t.value,
            "perturbed value clamped to range"
        );
    }

    let outcomes = ctx.executor.map(tasks.len(), ctx.cancel, |i| {
        let mut local = RunMetrics::default();
        let outcome = run_pass(ctx.grid, ctx.derivatives, &tasks[i].params, &mut local)
            .map(|pass| (pass.statistics.mean_erosion, pass.statistics.erosion_volume));
        (outcome, local)
    })?;

    let mut results = Vec::with_capacity(tasks.len());
    for (task, (outcome, local)) in tasks.iter().zip(outcomes) {
        metrics.absorb(&local);
        results.push(match outcome {
            Ok((mean_erosion, erosion_volume)) => PerturbationOutcome::Completed {
                mean_erosion,
                erosion_volume,
            },
            Err(cause) => {
                tracing::warn!(
                    parameter = task.parameter.symbol(),
                    direction = %task.direction,
                    %cause,
                    "sensitivity perturbation failed"
                );
                PerturbationOutcome::Failed(cause)
            }
        });
    }

    // Tasks alternate low, high per parameter.
    let mut paired = tasks.iter().zip(results);
    let mut entries = IndexMap::with_capacity(config.parameters.len());
    while let (Some((low, low_outcome)), Some((high, high_outcome))) =
        (paired.next(), paired.next())
    {
        let index = low_outcome
            .mean_erosion()
            .zip(high_outcome.mean_erosion())
            .map(|(lo, hi)| safe_div(hi - lo, baseline_mean));
        let entry = SensitivityEntry {
            parameter: low.parameter,
            baseline_value: low.parameter.get(ctx.params),
            low_value: low.value,
            high_value: high.value,
            low_clamped: low.clamped,
            high_clamped: high.clamped,
            low: low_outcome,
            high: high_outcome,
            index,
        };
        tracing::debug!(
            parameter = entry.parameter.symbol(),
            index = ?entry.index,
            "sensitivity entry"
        );
        entries.insert(low.parameter, entry);
    }

    let report = SensitivityReport {
        vary_factor: config.vary_factor,
        baseline_mean_erosion: baseline_mean,
        entries,
    };
    tracing::info!(
        baseline_mean,
        failed = report.failures().count(),
        "sensitivity analysis completed"
    );

    Ok(result_from_pass(
        ctx,
        SimulationMode::Sensitivity,
        ctx.params,
        baseline,
        metrics.clone(),
        ModeDetails::Sensitivity(report),
    ))
}

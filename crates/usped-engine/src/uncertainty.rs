//! Monte Carlo uncertainty analysis.
//!
//! Each sample perturbs every factor independently by
//! `value × (1 + variation_std · N(0,1))`, clamped into range, and runs
//! one pass over the shared terrain. All parameter sets are drawn up
//! front from a seeded ChaCha8 stream, so results are reproducible and
//! independent of how the executor schedules the passes.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use usped_core::{Parameter, SimulationParameters};
use usped_solver::percentile;

use crate::config::UncertaintyConfig;
use crate::error::SimulationError;
use crate::metrics::RunMetrics;
use crate::pipeline::{run_pass, RunContext};
use crate::result::{ModeDetails, SimulationMode, SimulationResult, UncertaintyReport};
use crate::single::result_from_pass;

/// Standard normal sample via Box-Muller.
fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300); // avoid ln(0)
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Draw `config.num_samples` perturbed parameter sets around `base`.
pub(crate) fn draw_samples(
    base: &SimulationParameters,
    config: &UncertaintyConfig,
) -> Result<Vec<SimulationParameters>, SimulationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    (0..config.num_samples)
        .map(|_| {
            Parameter::ALL.iter().try_fold(base.clone(), |p, &param| {
                let z = box_muller(&mut rng);
                let value = param.clamp(param.get(base) * (1.0 + config.variation_std * z));
                p.with_value(param, value)
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(SimulationError::from)
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var.sqrt())
}

pub(crate) fn run(
    ctx: &RunContext<'_>,
    config: &UncertaintyConfig,
    metrics: &mut RunMetrics,
) -> Result<SimulationResult, SimulationError> {
    tracing::info!(
        num_samples = config.num_samples,
        variation_std = config.variation_std,
        seed = config.seed,
        "uncertainty analysis started"
    );

    let baseline = run_pass(ctx.grid, ctx.derivatives, ctx.params, metrics)?;
    let samples = draw_samples(ctx.params, config)?;

    let outcomes = ctx.executor.map(samples.len(), ctx.cancel, |i| {
        let mut local = RunMetrics::default();
        let outcome = run_pass(ctx.grid, ctx.derivatives, &samples[i], &mut local)
            .map(|pass| pass.statistics.mean_erosion);
        (outcome, local)
    })?;

    let mut means = Vec::with_capacity(samples.len());
    let mut failed = 0usize;
    for (i, (outcome, local)) in outcomes.into_iter().enumerate() {
        metrics.absorb(&local);
        match outcome {
            Ok(m) => {
                tracing::debug!(sample = i, mean_erosion = m, "sample completed");
                means.push(m);
            }
            Err(cause) => {
                tracing::debug!(sample = i, %cause, "sample excluded");
                failed += 1;
            }
        }
    }

    if means.is_empty() {
        tracing::warn!(attempted = samples.len(), "every uncertainty sample failed");
        return Err(SimulationError::NoSuccessfulSamples {
            attempted: samples.len(),
        });
    }
    if failed > 0 {
        tracing::warn!(failed, attempted = samples.len(), "unstable samples excluded");
    }

    let mut sorted = means.clone();
    sorted.sort_by(f64::total_cmp);
    let tail = (1.0 - config.confidence) / 2.0 * 100.0;
    let (mean, std_dev) = mean_and_std(&means);

    let report = UncertaintyReport {
        mean,
        std_dev,
        confidence: config.confidence,
        ci_lower: percentile(&sorted, tail),
        ci_upper: percentile(&sorted, 100.0 - tail),
        attempted: samples.len(),
        failed,
        seed: config.seed,
        samples: means,
    };
    tracing::info!(
        mean = report.mean,
        ci_lower = report.ci_lower,
        ci_upper = report.ci_upper,
        failed,
        "uncertainty analysis completed"
    );

    Ok(result_from_pass(
        ctx,
        SimulationMode::Uncertainty,
        ctx.params,
        baseline,
        metrics.clone(),
        ModeDetails::Uncertainty(report),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_are_seeded_and_in_range() {
        let base = SimulationParameters::default();
        let config = UncertaintyConfig {
            num_samples: 50,
            variation_std: 2.0,
            ..Default::default()
        };
        let a = draw_samples(&base, &config).unwrap();
        let b = draw_samples(&base, &config).unwrap();
        assert_eq!(a, b);
        for p in &a {
            p.validate().unwrap();
        }
        let other = draw_samples(&base, &UncertaintyConfig { seed: 7, ..config }).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn zero_variation_reproduces_baseline() {
        let base = SimulationParameters::default();
        let config = UncertaintyConfig {
            num_samples: 3,
            variation_std: 0.0,
            ..Default::default()
        };
        for p in draw_samples(&base, &config).unwrap() {
            assert_eq!(p, base);
        }
    }

    #[test]
    fn box_muller_is_roughly_standard() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let xs: Vec<f64> = (0..20_000).map(|_| box_muller(&mut rng)).collect();
        let (mean, std) = mean_and_std(&xs);
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((std - 1.0).abs() < 0.05, "std {std}");
    }
}

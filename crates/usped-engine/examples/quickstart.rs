//! USPED quickstart: erosion on a synthetic hillslope.
//!
//! Demonstrates:
//!   1. Building an elevation grid (a ramp with a shallow valley)
//!   2. Recovering from an unstable timestep via `max_stable_dt`
//!   3. A single run with risk classification
//!   4. A short time series with adaptive timestep reduction
//!   5. Sensitivity ranking and Monte Carlo uncertainty on worker threads
//!
//! Run with:
//!   cargo run --example quickstart

use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use usped_core::{CellSize, ElevationGrid, SimulationParameters};
use usped_engine::{
    Executor, ModeConfig, SensitivityConfig, Simulation, SimulationError, SimulationResult,
    TimeSeriesConfig, UncertaintyConfig,
};
use usped_solver::{RiskTier, SolverError};

// ─── Terrain ────────────────────────────────────────────────────

const ROWS: usize = 16;
const COLS: usize = 16;
const CELL: f64 = 5.0;

// Fraction of the largest stable timestep used by the later modes, leaving
// room for perturbed parameters.
const DT_SAFETY: f64 = 0.1;

fn hillslope() -> ElevationGrid {
    let mid = (COLS - 1) as f64 / 2.0;
    ElevationGrid::from_fn(ROWS, COLS, CellSize::square(CELL), |r, c| {
        let valley = 0.02 * (c as f64 - mid).powi(2);
        200.0 - r as f64 + valley
    })
    .expect("hillslope geometry")
}

// ─── Timestep selection ─────────────────────────────────────────

/// Run once; if the timestep is unstable, retry at the solver's hint.
fn single_run(
    grid: &ElevationGrid,
    params: &SimulationParameters,
) -> Result<SimulationResult, Box<dyn std::error::Error>> {
    let sim = Simulation::new(grid.clone(), params.clone(), ModeConfig::SingleRun)?;
    match sim.run() {
        Err(SimulationError::Solver(SolverError::Unstable(instability))) => {
            let dt = instability.max_stable_dt();
            println!("dt {} unstable ({instability}); retrying at {dt:.3e}", params.dt());
            let retry = params.with_dt(dt)?;
            Ok(Simulation::new(grid.clone(), retry, ModeConfig::SingleRun)?.run()?)
        }
        other => Ok(other?),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let grid = hillslope();
    let params = SimulationParameters::builder()
        .rainfall_erosivity(250.0)
        .dt(0.5)
        .build()?;

    // ─── Single run ─────────────────────────────────────────────

    let single = single_run(&grid, &params)?;
    let params = params.with_dt(single.parameters.dt() * DT_SAFETY)?;
    let s = &single.statistics;
    println!("single run at dt {:.3e}", single.parameters.dt());
    println!("  mean erosion   {:.6} m", s.mean_erosion);
    println!("  peak erosion   {:.6} m", s.peak_erosion);
    println!("  net volume     {:.3} m³", s.net_volume);
    println!("  erosion index  {:.3}", s.erosion_index);
    for tier in RiskTier::ALL {
        println!("  {:<10} {:>4} cells", tier.label(), single.risk.count(tier));
    }

    // ─── Time series ────────────────────────────────────────────

    let mode = ModeConfig::TimeSeries(TimeSeriesConfig {
        num_timesteps: Some(5),
        adaptive: Some(Default::default()),
    });
    let series = Simulation::new(grid.clone(), params.clone(), mode)?.run()?;
    if let Some(record) = series.time_series() {
        println!("time series ({} steps, {} dt reductions)", record.len(), record.dt_reductions());
        for snap in record.snapshots() {
            println!(
                "  step {:>2}  dt {:.3}  mean erosion {:.6}",
                snap.step, snap.dt, snap.statistics.mean_erosion
            );
        }
    }

    // ─── Sensitivity and uncertainty ────────────────────────────

    let threads = Executor::Threaded { workers: None };

    let sens = Simulation::new(
        grid.clone(),
        params.clone(),
        ModeConfig::Sensitivity(SensitivityConfig {
            vary_factor: 0.1,
            ..Default::default()
        }),
    )?
    .with_executor(threads)
    .run()?;
    if let Some(report) = sens.sensitivity() {
        println!("sensitivity (±{:.0}%)", report.vary_factor * 100.0);
        for entry in report.ranked() {
            match entry.index {
                Some(index) => println!("  {:<2} index {index:+.3}", entry.parameter.symbol()),
                None => println!("  {:<2} unstable", entry.parameter.symbol()),
            }
        }
        for (parameter, direction, cause) in report.failures() {
            println!("  {parameter} {direction}: {cause}");
        }
    }

    let unc = Simulation::new(
        grid,
        params,
        ModeConfig::Uncertainty(UncertaintyConfig {
            num_samples: 200,
            ..Default::default()
        }),
    )?
    .with_executor(threads)
    .run()?;
    if let Some(report) = unc.uncertainty() {
        println!(
            "uncertainty: mean {:.6}, {:.0}% CI [{:.6}, {:.6}], {} of {} samples stable",
            report.mean,
            report.confidence * 100.0,
            report.ci_lower,
            report.ci_upper,
            report.sample_count(),
            report.attempted
        );
    }

    Ok(())
}

//! Criterion benchmarks for whole simulation modes.
//!
//! Perturbed passes may exceed the stability limit on rough terrain; the
//! result is black-boxed either way so failures still cost their pass.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use usped_bench::{rolling_hills, stable_params};
use usped_engine::{
    AdaptiveTimestep, Executor, ModeConfig, SensitivityConfig, Simulation, TerrainCache,
    TimeSeriesConfig, UncertaintyConfig,
};

const SIDE: usize = 48;

fn simulation(mode: ModeConfig, safety: f64) -> Simulation {
    let grid = rolling_hills(SIDE, SIDE, 42);
    let params = stable_params(&grid, safety);
    Simulation::new(grid, params, mode).expect("benchmark configuration")
}

fn bench_single_run(c: &mut Criterion) {
    let sim = simulation(ModeConfig::SingleRun, 0.5);
    c.bench_function("single_run_48", |b| b.iter(|| black_box(sim.run())));

    let mut cache = TerrainCache::new();
    c.bench_function("single_run_48_cached", |b| {
        b.iter(|| black_box(sim.run_with_cache(&mut cache)))
    });
}

fn bench_time_series(c: &mut Criterion) {
    let sim = simulation(
        ModeConfig::TimeSeries(TimeSeriesConfig {
            num_timesteps: Some(10),
            adaptive: Some(AdaptiveTimestep::default()),
        }),
        0.5,
    );
    c.bench_function("time_series_48x10", |b| b.iter(|| black_box(sim.run())));
}

fn bench_sensitivity(c: &mut Criterion) {
    let mode = ModeConfig::Sensitivity(SensitivityConfig::default());
    let seq = simulation(mode.clone(), 0.05);
    let par = simulation(mode, 0.05).with_executor(Executor::Threaded { workers: None });
    c.bench_function("sensitivity_48_sequential", |b| b.iter(|| black_box(seq.run())));
    c.bench_function("sensitivity_48_threaded", |b| b.iter(|| black_box(par.run())));
}

fn bench_uncertainty(c: &mut Criterion) {
    let mode = ModeConfig::Uncertainty(UncertaintyConfig {
        num_samples: 64,
        ..Default::default()
    });
    let seq = simulation(mode.clone(), 0.05);
    let par = simulation(mode, 0.05).with_executor(Executor::Threaded { workers: None });
    c.bench_function("uncertainty_48x64_sequential", |b| b.iter(|| black_box(seq.run())));
    c.bench_function("uncertainty_48x64_threaded", |b| b.iter(|| black_box(par.run())));
}

criterion_group!(
    benches,
    bench_single_run,
    bench_time_series,
    bench_sensitivity,
    bench_uncertainty
);
criterion_main!(benches);

//! User-facing simulation handle.
//!
//! [`Simulation`] owns a validated grid, parameter set and mode. Each
//! [`run()`](Simulation::run) analyses the terrain once, dispatches to
//! the mode runner and returns a [`SimulationResult`]. Nothing is
//! mutated: the input grid is left untouched and repeated runs over the
//! same inputs produce identical results.
//!
//! # Example
//!
//! ```ignore
//! let sim = Simulation::new(grid, params, ModeConfig::SingleRun)?;
//! let result = sim.run()?;
//! println!("erosion index {}", result.statistics.erosion_index);
//! ```

use std::time::Instant;

use usped_core::{ElevationGrid, SimulationParameters};

use crate::cache::TerrainCache;
use crate::cancel::CancelToken;
use crate::config::{ConfigError, ModeConfig};
use crate::error::SimulationError;
use crate::executor::Executor;
use crate::metrics::{micros, RunMetrics};
use crate::pipeline::RunContext;
use crate::result::SimulationResult;
use crate::{sensitivity, single, time_series, uncertainty};

// Compile-time assertion: a simulation can be handed to another thread.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Simulation>();
};

/// A configured, ready-to-run simulation.
#[derive(Clone, Debug)]
pub struct Simulation {
    grid: ElevationGrid,
    params: SimulationParameters,
    mode: ModeConfig,
    executor: Executor,
    cancel: CancelToken,
}

impl Simulation {
    /// Validate inputs and build a simulation.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parameters`] for an out-of-range parameter,
    /// [`ConfigError::InvalidMode`] for a bad mode setting and
    /// [`ConfigError::NoValidCells`] if every cell is no-data.
    pub fn new(
        grid: ElevationGrid,
        params: SimulationParameters,
        mode: ModeConfig,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        mode.validate()?;
        if grid.valid_count() == 0 {
            return Err(ConfigError::NoValidCells);
        }
        Ok(Self {
            grid,
            params,
            mode,
            executor: Executor::default(),
            cancel: CancelToken::new(),
        })
    }

    /// Schedule independent passes with `executor`.
    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    /// Observe `token` instead of the simulation's own.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops a run in progress. Clones share the flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Input elevation grid.
    pub fn grid(&self) -> &ElevationGrid {
        &self.grid
    }

    /// Baseline parameters.
    pub fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    /// Configured mode.
    pub fn mode(&self) -> &ModeConfig {
        &self.mode
    }

    /// Run with a fresh terrain cache.
    ///
    /// # Errors
    ///
    /// See [`SimulationError`].
    pub fn run(&self) -> Result<SimulationResult, SimulationError> {
        self.run_with_cache(&mut TerrainCache::new())
    }

    /// Run, reusing terrain analyses held by `cache`.
    ///
    /// Only the initial grid's analysis goes through the cache; time-series
    /// steps after the first analyse their evolved surface directly.
    ///
    /// # Errors
    ///
    /// See [`SimulationError`].
    pub fn run_with_cache(
        &self,
        cache: &mut TerrainCache,
    ) -> Result<SimulationResult, SimulationError> {
        let start = Instant::now();
        if self.cancel.is_cancelled() {
            tracing::warn!(mode = self.mode_name(), "simulation cancelled before start");
            return Err(SimulationError::Cancelled { completed: 0 });
        }

        tracing::info!(
            mode = self.mode_name(),
            rows = self.grid.rows(),
            cols = self.grid.cols(),
            valid_cells = self.grid.valid_count(),
            "simulation started"
        );

        let mut metrics = RunMetrics::default();
        let t0 = Instant::now();
        let derivatives = cache.get_or_analyze(&self.grid);
        metrics.terrain_us += micros(t0.elapsed());

        let ctx = RunContext {
            grid: &self.grid,
            params: &self.params,
            derivatives: &derivatives,
            executor: self.executor,
            cancel: &self.cancel,
        };

        let mut result = match &self.mode {
            ModeConfig::SingleRun => single::run(&ctx, &mut metrics),
            ModeConfig::TimeSeries(c) => time_series::run(&ctx, c, &mut metrics),
            ModeConfig::Sensitivity(c) => sensitivity::run(&ctx, c, &mut metrics),
            ModeConfig::Uncertainty(c) => uncertainty::run(&ctx, c, &mut metrics),
        }
        .inspect_err(|e| {
            if let SimulationError::Cancelled { completed } = e {
                tracing::warn!(completed, mode = self.mode_name(), "simulation cancelled");
            }
        })?;

        result.metrics.total_us = micros(start.elapsed());
        tracing::info!(
            total_us = result.metrics.total_us,
            passes = result.metrics.passes,
            erosion_index = result.statistics.erosion_index,
            "simulation completed"
        );
        Ok(result)
    }

    fn mode_name(&self) -> &'static str {
        match self.mode {
            ModeConfig::SingleRun => "single_run",
            ModeConfig::TimeSeries(_) => "time_series",
            ModeConfig::Sensitivity(_) => "sensitivity",
            ModeConfig::Uncertainty(_) => "uncertainty",
        }
    }
}

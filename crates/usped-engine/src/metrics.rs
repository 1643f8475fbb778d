//! Per-run performance metrics.
//!
//! [`RunMetrics`] accumulates stage timings over every pipeline pass a
//! mode executes, so a sensitivity run with six parameters reports the
//! sum over its thirteen passes.

use std::time::Duration;

/// Timing data collected while producing one result.
///
/// All durations are in microseconds and summed over passes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Wall-clock time for the whole mode, in microseconds.
    pub total_us: u64,
    /// Time spent in terrain analysis, in microseconds.
    pub terrain_us: u64,
    /// Time spent computing transport capacity, in microseconds.
    pub transport_us: u64,
    /// Time spent in the evolution solver, in microseconds.
    pub solver_us: u64,
    /// Time spent aggregating statistics, in microseconds.
    pub aggregation_us: u64,
    /// Pipeline passes executed, including failed ones.
    pub passes: u32,
    /// Transport-clamped cells summed over passes.
    pub clamped_cells: u64,
}

impl RunMetrics {
    /// Fold another pass's metrics into this one. `total_us` is left alone;
    /// the caller sets it from its own wall clock.
    pub fn absorb(&mut self, other: &RunMetrics) {
        self.terrain_us += other.terrain_us;
        self.transport_us += other.transport_us;
        self.solver_us += other.solver_us;
        self.aggregation_us += other.aggregation_us;
        self.passes += other.passes;
        self.clamped_cells += other.clamped_cells;
    }
}

pub(crate) fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

//! Immutable simulation results.
//!
//! Every mode returns a [`SimulationResult`] carrying the common fields
//! (change, erosion and deposition fields, risk tiers, statistics) plus a
//! [`ModeDetails`] variant holding whatever is specific to that mode.
//! The engine keeps no reference to a result once returned.

use std::fmt;

use indexmap::IndexMap;
use usped_core::{ElevationGrid, Field, Parameter, SimulationParameters};
use usped_solver::{ErosionStatistics, RiskClassification, SolverError};

use crate::metrics::RunMetrics;

/// Which mode produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SimulationMode {
    /// [`ModeConfig::SingleRun`](crate::ModeConfig::SingleRun).
    SingleRun,
    /// [`ModeConfig::TimeSeries`](crate::ModeConfig::TimeSeries).
    TimeSeries,
    /// [`ModeConfig::Sensitivity`](crate::ModeConfig::Sensitivity).
    Sensitivity,
    /// [`ModeConfig::Uncertainty`](crate::ModeConfig::Uncertainty).
    Uncertainty,
}

impl SimulationMode {
    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleRun => "single_run",
            Self::TimeSeries => "time_series",
            Self::Sensitivity => "sensitivity",
            Self::Uncertainty => "uncertainty",
        }
    }
}

// ── Time series ─────────────────────────────────────────────────

/// State after one time-series step.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// 1-based step number.
    pub step: u32,
    /// Timestep actually used (smaller than requested after adaptive
    /// reduction).
    pub dt: f64,
    /// Elevation after this step.
    pub elevation: ElevationGrid,
    /// Erosion depth during this step.
    pub erosion_rate: Field,
    /// Deposition depth during this step.
    pub deposition_rate: Field,
    /// Statistics of this step's net erosion.
    pub statistics: ErosionStatistics,
}

/// Ordered per-step snapshots of a time series.
///
/// Inspectable by index any number of times; partial when the series
/// aborted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeriesRecord {
    snapshots: Vec<Snapshot>,
    requested_steps: u32,
    dt_reductions: u32,
}

impl TimeSeriesRecord {
    pub(crate) fn new(requested_steps: u32) -> Self {
        Self {
            snapshots: Vec::with_capacity(requested_steps as usize),
            requested_steps,
            dt_reductions: 0,
        }
    }

    pub(crate) fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub(crate) fn note_reduction(&mut self) {
        self.dt_reductions += 1;
    }

    /// Completed steps.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether no step completed.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot at 0-based `index`.
    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    /// All snapshots in step order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    /// Steps that were requested.
    pub fn requested_steps(&self) -> u32 {
        self.requested_steps
    }

    /// Whether every requested step completed.
    pub fn is_complete(&self) -> bool {
        self.snapshots.len() == self.requested_steps as usize
    }

    /// Adaptive `dt` reductions applied over the series.
    pub fn dt_reductions(&self) -> u32 {
        self.dt_reductions
    }

    /// Elevation after the last completed step.
    pub fn final_elevation(&self) -> Option<&ElevationGrid> {
        self.snapshots.last().map(|s| &s.elevation)
    }

    /// Per-cell sum of erosion minus deposition over completed steps.
    pub fn cumulative_net_erosion(&self) -> Option<Field> {
        let (first, rest) = self.snapshots.split_first()?;
        let net = |s: &Snapshot| s.erosion_rate.zip_with(&s.deposition_rate, |e, d| e - d);
        Some(
            rest.iter()
                .fold(net(first), |acc, s| acc.zip_with(&net(s), |a, b| a + b)),
        )
    }
}

// ── Sensitivity ─────────────────────────────────────────────────

/// Direction of a sensitivity perturbation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Perturbation {
    /// `baseline × (1 − vary_factor)`.
    Low,
    /// `baseline × (1 + vary_factor)`.
    High,
}

impl fmt::Display for Perturbation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::High => "high",
        })
    }
}

/// What one perturbed pass produced.
#[derive(Clone, Debug, PartialEq)]
pub enum PerturbationOutcome {
    /// The pass completed.
    Completed {
        /// Mean erosion of the pass.
        mean_erosion: f64,
        /// Eroded volume of the pass, m³.
        erosion_volume: f64,
    },
    /// The pass was unstable. The other side and the other parameters
    /// are unaffected.
    Failed(SolverError),
}

impl PerturbationOutcome {
    /// Mean erosion, if the pass completed.
    pub fn mean_erosion(&self) -> Option<f64> {
        match self {
            Self::Completed { mean_erosion, .. } => Some(*mean_erosion),
            Self::Failed(_) => None,
        }
    }

    /// Eroded volume, if the pass completed.
    pub fn erosion_volume(&self) -> Option<f64> {
        match self {
            Self::Completed { erosion_volume, .. } => Some(*erosion_volume),
            Self::Failed(_) => None,
        }
    }

    /// Why the pass failed, if it did.
    pub fn failure(&self) -> Option<&SolverError> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed(e) => Some(e),
        }
    }
}

/// Outcome of perturbing one parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityEntry {
    /// The perturbed parameter.
    pub parameter: Parameter,
    /// Baseline value.
    pub baseline_value: f64,
    /// Value used for the low run (after clamping).
    pub low_value: f64,
    /// Value used for the high run (after clamping).
    pub high_value: f64,
    /// Whether the low value was clamped into range.
    pub low_clamped: bool,
    /// Whether the high value was clamped into range.
    pub high_clamped: bool,
    /// The low run.
    pub low: PerturbationOutcome,
    /// The high run.
    pub high: PerturbationOutcome,
    /// `(high − low) / baseline_mean_erosion`; 0 when the baseline is 0,
    /// `None` when either run failed.
    pub index: Option<f64>,
}

impl SensitivityEntry {
    /// The run on the `direction` side.
    pub fn outcome(&self, direction: Perturbation) -> &PerturbationOutcome {
        match direction {
            Perturbation::Low => &self.low,
            Perturbation::High => &self.high,
        }
    }
}

/// One-factor-at-a-time sensitivity report.
///
/// Parameters interact, and this design does not capture that: each
/// entry varies one factor with all others at baseline.
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityReport {
    /// Relative perturbation applied.
    pub vary_factor: f64,
    /// Mean erosion of the baseline run.
    pub baseline_mean_erosion: f64,
    /// Entries in configured order.
    pub entries: IndexMap<Parameter, SensitivityEntry>,
}

impl SensitivityReport {
    /// Entry for `parameter`, if it was varied.
    pub fn get(&self, parameter: Parameter) -> Option<&SensitivityEntry> {
        self.entries.get(&parameter)
    }

    /// Entries by decreasing `|index|`; entries without an index last,
    /// in configured order.
    pub fn ranked(&self) -> Vec<&SensitivityEntry> {
        let key = |e: &SensitivityEntry| e.index.map_or(-1.0, f64::abs);
        let mut v: Vec<_> = self.entries.values().collect();
        v.sort_by(|a, b| key(b).total_cmp(&key(a)));
        v
    }

    /// Every failed perturbation in configured order.
    pub fn failures(&self) -> impl Iterator<Item = (Parameter, Perturbation, &SolverError)> + '_ {
        self.entries.values().flat_map(|e| {
            [Perturbation::Low, Perturbation::High]
                .into_iter()
                .filter_map(move |d| e.outcome(d).failure().map(|cause| (e.parameter, d, cause)))
        })
    }
}

// ── Uncertainty ─────────────────────────────────────────────────

/// Monte Carlo summary of mean erosion.
#[derive(Clone, Debug, PartialEq)]
pub struct UncertaintyReport {
    /// Mean erosion of every successful sample, in draw order.
    pub samples: Vec<f64>,
    /// Sample mean.
    pub mean: f64,
    /// Sample standard deviation (n − 1).
    pub std_dev: f64,
    /// Confidence level of the interval.
    pub confidence: f64,
    /// Lower percentile bound.
    pub ci_lower: f64,
    /// Upper percentile bound.
    pub ci_upper: f64,
    /// Samples drawn.
    pub attempted: usize,
    /// Samples excluded because their pass was unstable.
    pub failed: usize,
    /// Seed used.
    pub seed: u64,
}

impl UncertaintyReport {
    /// Successful samples behind the interval.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Whether `value` lies inside the interval (inclusive).
    pub fn contains(&self, value: f64) -> bool {
        self.ci_lower <= value && value <= self.ci_upper
    }
}

// ── SimulationResult ────────────────────────────────────────────

/// Mode-specific part of a [`SimulationResult`].
#[derive(Clone, Debug, PartialEq)]
pub enum ModeDetails {
    /// Nothing beyond the common fields.
    SingleRun,
    /// Per-step snapshots.
    TimeSeries(TimeSeriesRecord),
    /// Per-parameter perturbation outcomes.
    Sensitivity(SensitivityReport),
    /// Sample distribution and interval.
    Uncertainty(UncertaintyReport),
}

/// Output of one engine invocation.
///
/// For a time series the common fields are cumulative over all steps.
/// For sensitivity and uncertainty they describe the baseline run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationResult {
    /// Producing mode.
    pub mode: SimulationMode,
    /// Parameters of the (baseline) run.
    pub parameters: SimulationParameters,
    /// Final elevation.
    pub elevation: ElevationGrid,
    /// `z_final − z_initial`; `NaN` at no-data.
    pub elevation_change: Field,
    /// Erosion depth.
    pub erosion_rate: Field,
    /// Deposition depth.
    pub deposition_rate: Field,
    /// Risk tiers of the net erosion.
    pub risk: RiskClassification,
    /// Scalar summary.
    pub statistics: ErosionStatistics,
    /// Stage timings.
    pub metrics: RunMetrics,
    /// Mode-specific data.
    pub details: ModeDetails,
}

impl SimulationResult {
    /// Time-series record, if this is a time-series result.
    pub fn time_series(&self) -> Option<&TimeSeriesRecord> {
        match &self.details {
            ModeDetails::TimeSeries(r) => Some(r),
            _ => None,
        }
    }

    /// Sensitivity report, if this is a sensitivity result.
    pub fn sensitivity(&self) -> Option<&SensitivityReport> {
        match &self.details {
            ModeDetails::Sensitivity(r) => Some(r),
            _ => None,
        }
    }

    /// Uncertainty report, if this is an uncertainty result.
    pub fn uncertainty(&self) -> Option<&UncertaintyReport> {
        match &self.details {
            ModeDetails::Uncertainty(r) => Some(r),
            _ => None,
        }
    }
}

//! Run-time failures of a simulation.

use std::error::Error;
use std::fmt;

use usped_core::ParameterError;
use usped_solver::SolverError;

use crate::executor::Cancelled;
use crate::result::TimeSeriesRecord;

/// Why a simulation did not complete.
#[derive(Clone, Debug, PartialEq)]
pub enum SimulationError {
    /// The single or baseline pass failed.
    Solver(SolverError),
    /// A time series stopped at `failed_step`; completed steps are kept.
    TimeSeriesAborted {
        /// 1-based step that failed.
        failed_step: u32,
        /// The failure.
        cause: SolverError,
        /// Snapshots up to the failure.
        partial: Box<TimeSeriesRecord>,
    },
    /// Every uncertainty sample failed.
    NoSuccessfulSamples {
        /// Samples drawn.
        attempted: usize,
    },
    /// A derived parameter set was rejected.
    Parameters(ParameterError),
    /// The cancel token was set before the run finished.
    Cancelled {
        /// Steps, samples or perturbations completed.
        completed: usize,
    },
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solver(e) => write!(f, "simulation failed: {e}"),
            Self::TimeSeriesAborted {
                failed_step,
                cause,
                partial,
            } => write!(
                f,
                "time series aborted at step {failed_step} ({} steps kept): {cause}",
                partial.len()
            ),
            Self::NoSuccessfulSamples { attempted } => {
                write!(f, "all {attempted} uncertainty samples failed")
            }
            Self::Parameters(e) => write!(f, "derived parameters rejected: {e}"),
            Self::Cancelled { completed } => {
                write!(f, "simulation cancelled after {completed} completed units")
            }
        }
    }
}

impl Error for SimulationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Solver(e) => Some(e),
            Self::TimeSeriesAborted { cause, .. } => Some(cause),
            Self::Parameters(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SolverError> for SimulationError {
    fn from(e: SolverError) -> Self {
        Self::Solver(e)
    }
}

impl From<ParameterError> for SimulationError {
    fn from(e: ParameterError) -> Self {
        Self::Parameters(e)
    }
}

impl From<Cancelled> for SimulationError {
    fn from(c: Cancelled) -> Self {
        Self::Cancelled {
            completed: c.completed,
        }
    }
}

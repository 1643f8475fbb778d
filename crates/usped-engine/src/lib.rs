//! Simulation orchestration for USPED erosion modelling.
//!
//! Wraps the terrain, transport and solver crates into four analysis
//! modes behind one entry point, [`Simulation`]:
//!
//! - **single run**: one pass of transport, evolution and aggregation;
//! - **time series**: repeated passes, each on the previous output;
//! - **sensitivity**: one-factor-at-a-time perturbation of the model
//!   factors around a baseline;
//! - **uncertainty**: seeded Monte Carlo over Gaussian-perturbed factors.
//!
//! Independent passes can be fanned out over worker threads with
//! [`Executor::Threaded`]; results are identical to sequential runs.
//! Terrain analyses are memoised by grid content in a [`TerrainCache`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod result;
pub mod simulation;

mod pipeline;
mod sensitivity;
mod single;
mod time_series;
mod uncertainty;

pub use cache::{grid_fingerprint, TerrainCache};
pub use cancel::CancelToken;
pub use config::{
    AdaptiveTimestep, ConfigError, ModeConfig, SensitivityConfig, TimeSeriesConfig,
    UncertaintyConfig,
};
pub use error::SimulationError;
pub use executor::{Cancelled, Executor};
pub use metrics::RunMetrics;
pub use result::{
    ModeDetails, Perturbation, PerturbationOutcome, SensitivityEntry, SensitivityReport,
    SimulationMode, SimulationResult, Snapshot, TimeSeriesRecord, UncertaintyReport,
};
pub use simulation::Simulation;

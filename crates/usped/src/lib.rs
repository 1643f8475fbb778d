//! USPED: soil erosion and deposition on gridded terrain.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all USPED sub-crates. For most users, adding `usped` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use usped::prelude::*;
//!
//! // A 10×10 hillslope falling one metre per row to the south.
//! let grid = ElevationGrid::from_fn(10, 10, CellSize::square(1.0), |r, _| {
//!     100.0 - r as f64
//! })?;
//! let params = SimulationParameters::builder().dt(0.25).build()?;
//!
//! let result = Simulation::new(grid, params, ModeConfig::SingleRun)?.run()?;
//! assert!(result.statistics.mean_erosion > 0.0);
//! assert!(result.risk.count(RiskTier::VeryHigh) > 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `usped-core` | Grids, fields, stencil helpers, parameters |
//! | [`terrain`] | `usped-terrain` | Slope, aspect, D8 routing, flow accumulation |
//! | [`solver`] | `usped-solver` | Transport capacity, evolution step, statistics |
//! | [`engine`] | `usped-engine` | Simulation modes, executors, caching |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Grids, fields and parameters (`usped-core`).
///
/// [`types::ElevationGrid`] carries the no-data mask every other stage
/// honours; [`types::SimulationParameters`] is validated on construction.
pub use usped_core as types;

/// Terrain derivatives (`usped-terrain`).
///
/// [`terrain::analyze`] produces slope, aspect, D8 flow directions and
/// contributing area in one pass.
pub use usped_terrain as terrain;

/// Numerical core (`usped-solver`).
///
/// Transport capacity, one explicit evolution step with stability checks,
/// and aggregation into statistics and risk tiers.
pub use usped_solver as solver;

/// Orchestration (`usped-engine`).
///
/// [`engine::Simulation`] runs single, time-series, sensitivity and
/// uncertainty analyses.
pub use usped_engine as engine;

/// Common imports for typical USPED usage.
///
/// ```rust
/// use usped::prelude::*;
/// ```
pub mod prelude {
    // Data model
    pub use usped_core::{CellSize, ElevationGrid, Field, Parameter, SimulationParameters};

    // Errors
    pub use usped_core::{GridError, ParameterError};
    pub use usped_engine::{ConfigError, SimulationError};
    pub use usped_solver::SolverError;

    // Terrain and statistics
    pub use usped_solver::{ErosionStatistics, RiskClassification, RiskTier};
    pub use usped_terrain::{analyze, TerrainDerivatives};

    // Engine
    pub use usped_engine::{
        AdaptiveTimestep, CancelToken, Executor, ModeConfig, SensitivityConfig, Simulation,
        SimulationResult, TerrainCache, TimeSeriesConfig, UncertaintyConfig,
    };
}

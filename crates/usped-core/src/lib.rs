//! Core types for the USPED erosion/deposition engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! data model every other crate works over: elevation grids with a no-data
//! mask, derived scalar fields, the stencil helpers shared by the terrain
//! analyzer and the solver, and the validated parameter record.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod grid;
pub mod grid_helpers;
pub mod params;

pub use error::{GridError, ParameterError};
pub use field::Field;
pub use grid::{CellSize, ElevationGrid};
pub use params::{Parameter, SimulationParameters, SimulationParametersBuilder, TimeUnit};

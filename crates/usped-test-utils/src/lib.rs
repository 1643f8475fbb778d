//! Test utilities for USPED development.
//!
//! Synthetic elevation grids with known analytic behaviour
//! ([`terrain`]) and parameter presets ([`params`]) shared by the unit,
//! integration and benchmark suites.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod params;
pub mod terrain;

pub use params::{default_params, no_forcing_params, params_with_dt};
pub use terrain::{
    corner_basin, flat_grid, grid_with_holes, row_ramp, slope_onto_floor, NODATA,
};

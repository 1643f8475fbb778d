//! Terrain analysis for the USPED erosion engine.
//!
//! [`analyze`] turns an [`ElevationGrid`](usped_core::ElevationGrid) into
//! [`TerrainDerivatives`]: slope, compass aspect, D8 flow direction and
//! upslope contributing area. Everything here is a pure function of the
//! grid, so derivatives must be recomputed whenever elevation changes.
//!
//! # Flow routing
//!
//! Routing is single-direction D8 with a fixed tie-break order
//! ([`FlowDirection::PRIORITY`]). Local minima are reported as pits and
//! terminate accumulation; they are not filled.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod analyzer;
pub mod flow;

pub use analyzer::{analyze, aspect_from_gradient, TerrainDerivatives, FLAT_ASPECT};
pub use flow::{flow_accumulation, flow_directions, FlowDirection};

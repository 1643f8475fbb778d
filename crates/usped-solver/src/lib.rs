//! Numerical kernel of the USPED erosion engine.
//!
//! # Pipeline (per pass)
//!
//! 1. [`compute_transport_capacity`]: terrain derivatives + parameters → `T`
//! 2. [`step`]: one explicit timestep of `z − (Δt/ρ_b)·(div T − ε·∇²z)`
//! 3. [`summarize`]: erosion statistics and quartile risk tiers
//!
//! Every function is pure over immutable inputs and safe to call from
//! many threads at once.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod evolution;
pub mod stats;
pub mod transport;

pub use evolution::{max_stable_dt, step, Instability, SolverError, StepOutput};
pub use stats::{percentile, summarize, ErosionStatistics, RiskClassification, RiskTier};
pub use transport::{compute_transport_capacity, runoff_depth, TransportCapacityField};

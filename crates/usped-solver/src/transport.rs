//! Runoff and sediment transport capacity.
//!
//! Capacity follows the unit-stream-power form
//! `T = K·C·P·R·Q·A^m·sin(β)^n` with SCS curve-number runoff `Q`.

use usped_core::{Field, SimulationParameters};
use usped_terrain::TerrainDerivatives;

/// Potential maximum retention `S` in millimetres for curve number `cn`.
pub fn potential_retention_mm(cn: f64) -> f64 {
    25400.0 / cn - 254.0
}

/// Event runoff depth in metres.
///
/// `Q = (P − Ia)² / (P − Ia + S)` in millimetres with `Ia = λ·S`, and zero
/// when rainfall does not exceed the initial abstraction.
pub fn runoff_depth(params: &SimulationParameters) -> f64 {
    let s = potential_retention_mm(params.curve_number());
    let ia = params.initial_abstraction_ratio() * s;
    let p = params.rainfall_depth_mm();
    if p <= ia {
        return 0.0;
    }
    let excess = p - ia;
    let q_mm = excess * excess / (excess + s);
    q_mm / 1000.0
}

/// Per-cell transport capacity with the number of cells hit by the ceiling.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportCapacityField {
    capacity: Field,
    clamped_cells: usize,
}

impl TransportCapacityField {
    /// Capacity values; `NaN` at no-data cells.
    pub fn capacity(&self) -> &Field {
        &self.capacity
    }

    /// Cells whose raw capacity exceeded the configured ceiling.
    pub fn clamped_cells(&self) -> usize {
        self.clamped_cells
    }
}

/// Compute `T` for every cell of `derivatives`.
///
/// No-data cells (undefined accumulation) stay undefined. A valid cell
/// whose slope is undefined has nowhere to move sediment and gets zero.
/// Values above [`max_transport_capacity`] (or overflowing to infinity)
/// are clamped to it; clamping is counted, not an error.
///
/// [`max_transport_capacity`]: SimulationParameters::max_transport_capacity
pub fn compute_transport_capacity(
    derivatives: &TerrainDerivatives,
    params: &SimulationParameters,
) -> TransportCapacityField {
    let q = runoff_depth(params);
    let factor = params.soil_erodibility()
        * params.cover_factor()
        * params.practice_factor()
        * params.rainfall_erosivity()
        * q;
    let m = params.area_exponent();
    let n = params.slope_exponent();
    let ceiling = params.max_transport_capacity();

    let mut clamped_cells = 0usize;

    let capacity = derivatives
        .slope()
        .zip_with(derivatives.flow_accumulation(), |beta, a| {
            if a.is_nan() {
                return f64::NAN;
            }
            if beta.is_nan() {
                return 0.0;
            }
            let t = factor * a.powf(m) * beta.sin().powf(n);
            if t > ceiling || !t.is_finite() {
                clamped_cells += 1;
                ceiling
            } else {
                t
            }
        });

    if clamped_cells > 0 {
        tracing::warn!(clamped_cells, ceiling, "transport capacity clamped");
    }

    TransportCapacityField {
        capacity,
        clamped_cells,
    }
}

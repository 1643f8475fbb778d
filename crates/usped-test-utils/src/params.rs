//! Parameter presets.

use usped_core::SimulationParameters;

/// The documented defaults.
pub fn default_params() -> SimulationParameters {
    SimulationParameters::default()
}

/// Defaults with a different timestep.
pub fn params_with_dt(dt: f64) -> SimulationParameters {
    SimulationParameters::builder()
        .dt(dt)
        .build()
        .expect("preset dt must be positive")
}

/// Zero erodibility and zero diffusion: nothing moves.
pub fn no_forcing_params() -> SimulationParameters {
    SimulationParameters::builder()
        .soil_erodibility(0.0)
        .diffusion_coefficient(0.0)
        .build()
        .expect("no-forcing preset")
}

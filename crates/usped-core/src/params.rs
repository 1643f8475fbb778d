//! Simulation parameters, their documented ranges, and validation.
//!
//! [`SimulationParameters`] is an immutable record. It is built through
//! [`SimulationParameters::builder`] (or [`Default`]) and validated once;
//! nothing downstream re-checks ranges. Perturbation-driven modes go
//! through [`SimulationParameters::with_value`], which validates again so a
//! scaled value can never smuggle garbage into the pipeline.

use std::fmt;

use crate::error::ParameterError;

/// Unit attached to the timestep `dt`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    /// Hours.
    Hours,
    /// Days.
    #[default]
    Days,
    /// Years.
    Years,
}

impl TimeUnit {
    /// Short label for reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Hours => "hours",
            Self::Days => "days",
            Self::Years => "years",
        }
    }
}

/// The perturbable model factors, in the order sensitivity analysis visits them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameter {
    /// Rainfall erosivity `R`.
    RainfallErosivity,
    /// Soil erodibility `K`.
    SoilErodibility,
    /// Cover factor `C`.
    CoverFactor,
    /// Practice factor `P`.
    PracticeFactor,
    /// Upslope-area exponent `m`.
    AreaExponent,
    /// Slope exponent `n`.
    SlopeExponent,
}

impl Parameter {
    /// Every perturbable factor: R, K, C, P, m, n.
    pub const ALL: [Parameter; 6] = [
        Self::RainfallErosivity,
        Self::SoilErodibility,
        Self::CoverFactor,
        Self::PracticeFactor,
        Self::AreaExponent,
        Self::SlopeExponent,
    ];

    /// Conventional one-letter symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::RainfallErosivity => "R",
            Self::SoilErodibility => "K",
            Self::CoverFactor => "C",
            Self::PracticeFactor => "P",
            Self::AreaExponent => "m",
            Self::SlopeExponent => "n",
        }
    }

    /// Builder/field name.
    pub fn name(self) -> &'static str {
        match self {
            Self::RainfallErosivity => "rainfall_erosivity",
            Self::SoilErodibility => "soil_erodibility",
            Self::CoverFactor => "cover_factor",
            Self::PracticeFactor => "practice_factor",
            Self::AreaExponent => "area_exponent",
            Self::SlopeExponent => "slope_exponent",
        }
    }

    /// Inclusive valid range `(min, max)`.
    pub fn range(self) -> (f64, f64) {
        match self {
            Self::RainfallErosivity => RAINFALL_EROSIVITY_RANGE,
            Self::SoilErodibility | Self::CoverFactor | Self::PracticeFactor => UNIT_RANGE,
            Self::AreaExponent | Self::SlopeExponent => EXPONENT_RANGE,
        }
    }

    /// Clamp `value` into [`range`](Self::range).
    pub fn clamp(self, value: f64) -> f64 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }

    /// Current value of this factor in `params`.
    pub fn get(self, params: &SimulationParameters) -> f64 {
        match self {
            Self::RainfallErosivity => params.rainfall_erosivity,
            Self::SoilErodibility => params.soil_erodibility,
            Self::CoverFactor => params.cover_factor,
            Self::PracticeFactor => params.practice_factor,
            Self::AreaExponent => params.area_exponent,
            Self::SlopeExponent => params.slope_exponent,
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Self::RainfallErosivity => "[0, 1000]",
            Self::SoilErodibility | Self::CoverFactor | Self::PracticeFactor => "[0, 1]",
            Self::AreaExponent | Self::SlopeExponent => "[0.5, 3.0]",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

const RAINFALL_EROSIVITY_RANGE: (f64, f64) = (0.0, 1000.0);
const UNIT_RANGE: (f64, f64) = (0.0, 1.0);
const EXPONENT_RANGE: (f64, f64) = (0.5, 3.0);

/// Immutable parameter set for one simulation.
///
/// Factor ranges: `R` in `[0, 1000]`; `K`, `C`, `P` in `[0, 1]`; `m`, `n`
/// in `[0.5, 3.0]`; `epsilon` in `[0, 1]`; `dt` positive. Whether `dt` is
/// stable depends on the grid and is checked by the solver at each step.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationParameters {
    rainfall_erosivity: f64,
    soil_erodibility: f64,
    cover_factor: f64,
    practice_factor: f64,
    area_exponent: f64,
    slope_exponent: f64,
    diffusion_coefficient: f64,
    bulk_density: f64,
    dt: f64,
    time_unit: TimeUnit,
    num_timesteps: u32,
    rainfall_depth_mm: f64,
    curve_number: f64,
    initial_abstraction_ratio: f64,
    max_transport_capacity: f64,
    stability_fraction: f64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            rainfall_erosivity: 300.0,
            soil_erodibility: 0.35,
            cover_factor: 0.3,
            practice_factor: 0.5,
            area_exponent: 1.6,
            slope_exponent: 1.3,
            diffusion_coefficient: 0.01,
            bulk_density: 1.3,
            dt: 1.0,
            time_unit: TimeUnit::Days,
            num_timesteps: 10,
            rainfall_depth_mm: 50.0,
            curve_number: 75.0,
            initial_abstraction_ratio: 0.2,
            max_transport_capacity: 1.0e6,
            stability_fraction: 0.5,
        }
    }
}

impl SimulationParameters {
    /// Start a builder seeded with the defaults.
    pub fn builder() -> SimulationParametersBuilder {
        SimulationParametersBuilder {
            params: Self::default(),
        }
    }

    /// Check every field against its documented range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ParameterError`] found, in declaration order.
    pub fn validate(&self) -> Result<(), ParameterError> {
        for p in Parameter::ALL {
            let v = p.get(self);
            let (lo, hi) = p.range();
            if !(v.is_finite() && v >= lo && v <= hi) {
                return Err(ParameterError::new(p.name(), v, p.expected()));
            }
        }
        check_range(
            "diffusion_coefficient",
            self.diffusion_coefficient,
            0.0,
            1.0,
            "[0, 1]",
        )?;
        check_positive("bulk_density", self.bulk_density)?;
        check_positive("dt", self.dt)?;
        if self.num_timesteps == 0 {
            return Err(ParameterError::new("num_timesteps", 0.0, ">= 1"));
        }
        if !(self.rainfall_depth_mm.is_finite() && self.rainfall_depth_mm >= 0.0) {
            return Err(ParameterError::new(
                "rainfall_depth_mm",
                self.rainfall_depth_mm,
                ">= 0",
            ));
        }
        if !(self.curve_number.is_finite() && self.curve_number > 0.0 && self.curve_number <= 100.0)
        {
            return Err(ParameterError::new(
                "curve_number",
                self.curve_number,
                "(0, 100]",
            ));
        }
        check_range(
            "initial_abstraction_ratio",
            self.initial_abstraction_ratio,
            0.0,
            1.0,
            "[0, 1]",
        )?;
        check_positive("max_transport_capacity", self.max_transport_capacity)?;
        if !(self.stability_fraction.is_finite()
            && self.stability_fraction > 0.0
            && self.stability_fraction <= 1.0)
        {
            return Err(ParameterError::new(
                "stability_fraction",
                self.stability_fraction,
                "(0, 1]",
            ));
        }
        Ok(())
    }

    /// A copy with `param` set to `value`, revalidated.
    pub fn with_value(&self, param: Parameter, value: f64) -> Result<Self, ParameterError> {
        let mut next = self.clone();
        match param {
            Parameter::RainfallErosivity => next.rainfall_erosivity = value,
            Parameter::SoilErodibility => next.soil_erodibility = value,
            Parameter::CoverFactor => next.cover_factor = value,
            Parameter::PracticeFactor => next.practice_factor = value,
            Parameter::AreaExponent => next.area_exponent = value,
            Parameter::SlopeExponent => next.slope_exponent = value,
        }
        next.validate()?;
        Ok(next)
    }

    /// A copy with a different timestep, revalidated.
    pub fn with_dt(&self, dt: f64) -> Result<Self, ParameterError> {
        check_positive("dt", dt)?;
        Ok(Self { dt, ..self.clone() })
    }

    /// Rainfall erosivity `R`.
    pub fn rainfall_erosivity(&self) -> f64 {
        self.rainfall_erosivity
    }

    /// Soil erodibility `K`.
    pub fn soil_erodibility(&self) -> f64 {
        self.soil_erodibility
    }

    /// Cover factor `C`.
    pub fn cover_factor(&self) -> f64 {
        self.cover_factor
    }

    /// Practice factor `P`.
    pub fn practice_factor(&self) -> f64 {
        self.practice_factor
    }

    /// Upslope-area exponent `m`.
    pub fn area_exponent(&self) -> f64 {
        self.area_exponent
    }

    /// Slope exponent `n`.
    pub fn slope_exponent(&self) -> f64 {
        self.slope_exponent
    }

    /// Deposition/diffusion coefficient `epsilon`.
    pub fn diffusion_coefficient(&self) -> f64 {
        self.diffusion_coefficient
    }

    /// Bulk density `rho_b`.
    pub fn bulk_density(&self) -> f64 {
        self.bulk_density
    }

    /// Timestep `dt`, in [`time_unit`](Self::time_unit)s.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Unit of `dt`.
    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// Default iteration count for time-series runs.
    pub fn num_timesteps(&self) -> u32 {
        self.num_timesteps
    }

    /// Event rainfall depth feeding the runoff relation, millimetres.
    pub fn rainfall_depth_mm(&self) -> f64 {
        self.rainfall_depth_mm
    }

    /// Runoff curve number describing the soil/cover combination.
    pub fn curve_number(&self) -> f64 {
        self.curve_number
    }

    /// Initial abstraction as a fraction of potential retention.
    pub fn initial_abstraction_ratio(&self) -> f64 {
        self.initial_abstraction_ratio
    }

    /// Ceiling applied to per-cell transport capacity.
    pub fn max_transport_capacity(&self) -> f64 {
        self.max_transport_capacity
    }

    /// Fraction of local relief a single step may remove or add.
    pub fn stability_fraction(&self) -> f64 {
        self.stability_fraction
    }
}

fn check_range(
    name: &'static str,
    v: f64,
    lo: f64,
    hi: f64,
    expected: &'static str,
) -> Result<(), ParameterError> {
    if v.is_finite() && v >= lo && v <= hi {
        Ok(())
    } else {
        Err(ParameterError::new(name, v, expected))
    }
}

fn check_positive(name: &'static str, v: f64) -> Result<(), ParameterError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::new(name, v, "finite and > 0"))
    }
}

/// Builder for [`SimulationParameters`].
///
/// Every field starts at its default; [`build`](Self::build) validates.
#[derive(Clone, Debug)]
pub struct SimulationParametersBuilder {
    params: SimulationParameters,
}

macro_rules! setter {
    ($(#[$doc:meta])* $name:ident: $ty:ty) => {
        $(#[$doc])*
        pub fn $name(mut self, value: $ty) -> Self {
            self.params.$name = value;
            self
        }
    };
}

impl SimulationParametersBuilder {
    setter!(
        /// Rainfall erosivity `R` (default 300).
        rainfall_erosivity: f64
    );
    setter!(
        /// Soil erodibility `K` (default 0.35).
        soil_erodibility: f64
    );
    setter!(
        /// Cover factor `C` (default 0.3).
        cover_factor: f64
    );
    setter!(
        /// Practice factor `P` (default 0.5).
        practice_factor: f64
    );
    setter!(
        /// Upslope-area exponent `m` (default 1.6).
        area_exponent: f64
    );
    setter!(
        /// Slope exponent `n` (default 1.3).
        slope_exponent: f64
    );
    setter!(
        /// Deposition/diffusion coefficient `epsilon` (default 0.01).
        diffusion_coefficient: f64
    );
    setter!(
        /// Bulk density `rho_b` (default 1.3).
        bulk_density: f64
    );
    setter!(
        /// Timestep `dt` (default 1.0).
        dt: f64
    );
    setter!(
        /// Unit of `dt` (default days).
        time_unit: TimeUnit
    );
    setter!(
        /// Time-series iteration count (default 10).
        num_timesteps: u32
    );
    setter!(
        /// Event rainfall depth in mm (default 50).
        rainfall_depth_mm: f64
    );
    setter!(
        /// Runoff curve number (default 75).
        curve_number: f64
    );
    setter!(
        /// Initial abstraction ratio `lambda` (default 0.2).
        initial_abstraction_ratio: f64
    );
    setter!(
        /// Transport capacity ceiling (default 1e6).
        max_transport_capacity: f64
    );
    setter!(
        /// Per-step relief fraction bound (default 0.5).
        stability_fraction: f64
    );

    /// Validate and produce the parameter record.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] naming the first out-of-range field.
    pub fn build(self) -> Result<SimulationParameters, ParameterError> {
        self.params.validate()?;
        Ok(self.params)
    }
}

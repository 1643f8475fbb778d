//! Mode configuration, validation, and error types.
//!
//! A run is described by a [`ModeConfig`]: one variant per simulation
//! mode, each carrying only the settings that mode uses. Everything is
//! checked once by [`Simulation::new`](crate::Simulation::new) before any
//! numerical work starts.

use std::error::Error;
use std::fmt;

use usped_core::{Parameter, ParameterError};

// ── AdaptiveTimestep ──────────────────────────────────────────────

/// Opt-in timestep reduction for time-series runs.
///
/// When a step is unstable the orchestration layer retries it with
/// `dt * reduction_factor`, up to `max_retries` times, and keeps the
/// reduced `dt` for the rest of the series. The solver itself never
/// changes `dt`.
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptiveTimestep {
    /// Multiplier applied to `dt` on each retry, in (0, 1). Default: 0.5.
    pub reduction_factor: f64,
    /// Retries allowed per step before the series aborts. Default: 4.
    pub max_retries: u32,
}

impl Default for AdaptiveTimestep {
    fn default() -> Self {
        Self {
            reduction_factor: 0.5,
            max_retries: 4,
        }
    }
}

// ── Per-mode configs ──────────────────────────────────────────────

/// Settings for [`ModeConfig::TimeSeries`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSeriesConfig {
    /// Steps to run. `None` = the parameters' `num_timesteps`.
    pub num_timesteps: Option<u32>,
    /// Adaptive `dt` reduction; `None` aborts on the first instability.
    pub adaptive: Option<AdaptiveTimestep>,
}

/// Settings for [`ModeConfig::Sensitivity`].
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityConfig {
    /// Relative perturbation, in (0, 1). Default: 0.2.
    pub vary_factor: f64,
    /// Parameters varied one at a time, in report order. Default: R, K,
    /// C, P, m, n.
    pub parameters: Vec<Parameter>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            vary_factor: 0.2,
            parameters: Parameter::ALL.to_vec(),
        }
    }
}

/// Settings for [`ModeConfig::Uncertainty`].
#[derive(Clone, Debug, PartialEq)]
pub struct UncertaintyConfig {
    /// Monte Carlo samples to draw. Default: 100.
    pub num_samples: usize,
    /// Relative standard deviation of the Gaussian perturbation. Default: 0.1.
    pub variation_std: f64,
    /// Confidence level of the percentile interval, in (0, 1). Default: 0.95.
    pub confidence: f64,
    /// RNG seed. Default: 42.
    pub seed: u64,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            num_samples: 100,
            variation_std: 0.1,
            confidence: 0.95,
            seed: 42,
        }
    }
}

// ── ModeConfig ────────────────────────────────────────────────────

/// Which analysis to run, with its settings.
#[derive(Clone, Debug, PartialEq)]
pub enum ModeConfig {
    /// One pipeline pass.
    SingleRun,
    /// Repeated passes feeding each output elevation into the next.
    TimeSeries(TimeSeriesConfig),
    /// One-factor-at-a-time perturbation around a baseline.
    Sensitivity(SensitivityConfig),
    /// Monte Carlo over Gaussian-perturbed parameters.
    Uncertainty(UncertaintyConfig),
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::SingleRun
    }
}

impl ModeConfig {
    /// Check the per-mode settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidMode`] describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::InvalidMode { reason });
        match self {
            Self::SingleRun => Ok(()),
            Self::TimeSeries(c) => {
                if c.num_timesteps == Some(0) {
                    return invalid("num_timesteps must be at least 1".into());
                }
                if let Some(a) = &c.adaptive {
                    if !(a.reduction_factor > 0.0 && a.reduction_factor < 1.0) {
                        return invalid(format!(
                            "adaptive reduction_factor must be in (0, 1), got {}",
                            a.reduction_factor
                        ));
                    }
                }
                Ok(())
            }
            Self::Sensitivity(c) => {
                if !(c.vary_factor > 0.0 && c.vary_factor < 1.0) {
                    return invalid(format!(
                        "vary_factor must be in (0, 1), got {}",
                        c.vary_factor
                    ));
                }
                if c.parameters.is_empty() {
                    return invalid("sensitivity parameter list is empty".into());
                }
                for (i, p) in c.parameters.iter().enumerate() {
                    if c.parameters[..i].contains(p) {
                        return invalid(format!("parameter {p} listed twice"));
                    }
                }
                Ok(())
            }
            Self::Uncertainty(c) => {
                if c.num_samples == 0 {
                    return invalid("num_samples must be at least 1".into());
                }
                if !(c.variation_std.is_finite() && c.variation_std >= 0.0) {
                    return invalid(format!(
                        "variation_std must be finite and >= 0, got {}",
                        c.variation_std
                    ));
                }
                if !(c.confidence > 0.0 && c.confidence < 1.0) {
                    return invalid(format!(
                        "confidence must be in (0, 1), got {}",
                        c.confidence
                    ));
                }
                Ok(())
            }
        }
    }
}

// ── ConfigError ───────────────────────────────────────────────────

/// Errors detected by [`Simulation::new`](crate::Simulation::new).
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A parameter is outside its documented range.
    Parameters(ParameterError),
    /// The grid has no valid cell to simulate.
    NoValidCells,
    /// A per-mode setting is invalid.
    InvalidMode {
        /// Description of the violated constraint.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parameters(e) => write!(f, "invalid parameters: {e}"),
            Self::NoValidCells => write!(f, "elevation grid has no valid cells"),
            Self::InvalidMode { reason } => write!(f, "invalid mode configuration: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parameters(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParameterError> for ConfigError {
    fn from(e: ParameterError) -> Self {
        Self::Parameters(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        for mode in [
            ModeConfig::SingleRun,
            ModeConfig::TimeSeries(TimeSeriesConfig::default()),
            ModeConfig::Sensitivity(SensitivityConfig::default()),
            ModeConfig::Uncertainty(UncertaintyConfig::default()),
        ] {
            assert_eq!(mode.validate(), Ok(()));
        }
    }

    #[test]
    fn default_sensitivity_covers_all_factors() {
        let c = SensitivityConfig::default();
        assert_eq!(c.parameters, Parameter::ALL.to_vec());
        assert_eq!(c.vary_factor, 0.2);
    }

    #[test]
    fn rejects_bad_settings() {
        let bad = [
            ModeConfig::TimeSeries(TimeSeriesConfig {
                num_timesteps: Some(0),
                adaptive: None,
            }),
            ModeConfig::TimeSeries(TimeSeriesConfig {
                num_timesteps: None,
                adaptive: Some(AdaptiveTimestep {
                    reduction_factor: 1.0,
                    max_retries: 2,
                }),
            }),
            ModeConfig::Sensitivity(SensitivityConfig {
                vary_factor: 0.0,
                ..Default::default()
            }),
            ModeConfig::Sensitivity(SensitivityConfig {
                vary_factor: 0.2,
                parameters: vec![Parameter::RainfallErosivity, Parameter::RainfallErosivity],
            }),
            ModeConfig::Uncertainty(UncertaintyConfig {
                num_samples: 0,
                ..Default::default()
            }),
            ModeConfig::Uncertainty(UncertaintyConfig {
                confidence: 1.0,
                ..Default::default()
            }),
        ];
        for mode in bad {
            assert!(
                matches!(mode.validate(), Err(ConfigError::InvalidMode { .. })),
                "{mode:?} should be rejected"
            );
        }
    }

    #[test]
    fn error_display_and_source() {
        let e = ConfigError::from(ParameterError::new("soil_erodibility", 2.0, "[0, 1]"));
        assert!(e.to_string().contains("soil_erodibility"));
        assert!(e.source().is_some());
        assert!(ConfigError::NoValidCells.source().is_none());
    }
}

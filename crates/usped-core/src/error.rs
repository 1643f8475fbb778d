//! Error types shared by every USPED crate.
//!
//! Two subsystems fail before any numerics run: grid construction
//! ([`GridError`]) and parameter validation ([`ParameterError`]). Both are
//! surfaced once, up front, so the pipeline never sees malformed input.

use std::error::Error;
use std::fmt;

/// Errors from constructing or combining grids and fields.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// A grid must have at least one row and one column.
    EmptyGrid,
    /// The value buffer does not match `rows * cols`.
    ShapeMismatch {
        /// Number of cells implied by the grid dimensions.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// Cell spacing must be finite and strictly positive.
    InvalidCellSize {
        /// Spacing along x (columns), metres.
        dx: f64,
        /// Spacing along y (rows), metres.
        dy: f64,
    },
    /// Two grids or fields that must share geometry do not.
    GeometryMismatch {
        /// `(rows, cols)` of the reference grid.
        expected: (usize, usize),
        /// `(rows, cols)` of the offending grid or field.
        actual: (usize, usize),
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => write!(f, "grid must have at least one cell"),
            Self::ShapeMismatch { expected, actual } => {
                write!(f, "grid expects {expected} values, got {actual}")
            }
            Self::InvalidCellSize { dx, dy } => {
                write!(f, "cell size must be finite and positive, got dx={dx} dy={dy}")
            }
            Self::GeometryMismatch { expected, actual } => write!(
                f,
                "geometry mismatch: expected {}x{}, got {}x{}",
                expected.0, expected.1, actual.0, actual.1
            ),
        }
    }
}

impl Error for GridError {}

/// A parameter value outside its documented range.
///
/// Produced by [`SimulationParameters::validate`](crate::SimulationParameters::validate)
/// and the parameter builder. Names the parameter so callers can report it
/// without re-deriving which check failed.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterError {
    /// Parameter name as it appears on the builder.
    pub name: &'static str,
    /// The rejected value.
    pub value: f64,
    /// Human-readable description of the accepted range.
    pub expected: &'static str,
}

impl ParameterError {
    /// Construct an error for `name` holding `value`.
    pub fn new(name: &'static str, value: f64, expected: &'static str) -> Self {
        Self {
            name,
            value,
            expected,
        }
    }
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' = {} is invalid (expected {})",
            self.name, self.value, self.expected
        )
    }
}

impl Error for ParameterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_error_messages_name_the_problem() {
        let e = GridError::ShapeMismatch {
            expected: 100,
            actual: 99,
        };
        assert_eq!(e.to_string(), "grid expects 100 values, got 99");

        let e = GridError::GeometryMismatch {
            expected: (10, 10),
            actual: (5, 10),
        };
        assert!(e.to_string().contains("10x10"));
        assert!(e.to_string().contains("5x10"));
    }

    #[test]
    fn parameter_error_names_parameter_and_range() {
        let e = ParameterError::new("soil_erodibility", 1.5, "[0, 1]");
        let msg = e.to_string();
        assert!(msg.contains("soil_erodibility"), "{msg}");
        assert!(msg.contains("1.5"), "{msg}");
        assert!(msg.contains("[0, 1]"), "{msg}");
    }
}

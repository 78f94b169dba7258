//! Error types for evaluators and the optimizer.
//!
//! This module defines the two error layers used throughout the library:
//! [`EvaluationError`], raised by user-supplied objective and gradient
//! evaluators, and [`OptimizerError`], returned by the optimizer entry points.
//!
//! Only invalid inputs, invalid configurations and evaluator failures are hard
//! errors. Exhausting the iteration budget or hitting a numerically degenerate
//! state mid-run is reported through
//! [`TerminationReason`](crate::optimization::optimizer::TerminationReason)
//! on an ordinary result carrying the best iterate.

use std::fmt;
use thiserror::Error;

/// Errors raised by objective and gradient evaluators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluationError {
    /// The evaluator could not produce a value.
    ///
    /// User code returns this to signal that the point is outside the
    /// function's domain or that an underlying computation failed.
    #[error("Evaluation failed: {reason}")]
    Failed {
        /// Description of the failure
        reason: String,
    },

    /// The evaluator produced a NaN or infinite value.
    #[error("Evaluator returned a non-finite value: {reason}")]
    NonFinite {
        /// Description of the offending value
        reason: String,
    },

    /// The evaluator returned a vector of the wrong length.
    #[error("Evaluator returned a vector of length {actual}, expected {expected}")]
    ShapeMismatch {
        /// Dimension of the problem
        expected: usize,
        /// Length of the returned vector
        actual: usize,
    },
}

impl EvaluationError {
    /// Create a Failed error with a custom reason.
    pub fn failed<S: Into<String>>(reason: S) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Create a NonFinite error with a custom reason.
    pub fn non_finite<S: Into<String>>(reason: S) -> Self {
        Self::NonFinite {
            reason: reason.into(),
        }
    }

    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch { expected, actual }
    }
}

/// Identifies which evaluator produced an [`EvaluationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluatorKind {
    /// The scalar objective f(x).
    Objective,
    /// The gradient ∇f(x).
    Gradient,
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Objective => write!(f, "objective"),
            Self::Gradient => write!(f, "gradient"),
        }
    }
}

/// Errors that can occur during optimization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OptimizerError {
    /// The initial point is unusable.
    ///
    /// This error occurs before any iteration when the initial point is empty
    /// or contains NaN or infinite coordinates.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of why the input is invalid
        reason: String,
    },

    /// The gradient at the initial point does not match its dimension.
    ///
    /// Detected from the first gradient evaluation, before the objective is
    /// ever evaluated.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the initial point
        expected: usize,
        /// Length of the gradient returned by the evaluator
        actual: usize,
    },

    /// An evaluator failed or returned an unusable value.
    ///
    /// Evaluation failures are never retried; the optimizer stops and
    /// surfaces the wrapped error together with the iteration it occurred at.
    #[error("{evaluator} evaluation failed at iteration {iteration}: {source}")]
    Evaluation {
        /// Which evaluator failed
        evaluator: EvaluatorKind,
        /// Iteration during which the failure occurred
        iteration: usize,
        /// The underlying evaluator error
        #[source]
        source: EvaluationError,
    },

    /// Invalid optimizer configuration.
    ///
    /// This error occurs when the optimizer is configured with invalid
    /// parameters (e.g., a growth factor not above one, a negative tolerance).
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },
}

impl OptimizerError {
    /// Create an InvalidInput error with a custom reason.
    pub fn invalid_input<S: Into<String>>(reason: S) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Wrap an evaluator error with the evaluator and iteration it came from.
    pub fn evaluation(evaluator: EvaluatorKind, iteration: usize, source: EvaluationError) -> Self {
        Self::Evaluation {
            evaluator,
            iteration,
            source,
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Returns true for errors caused by the caller's initial point.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::DimensionMismatch { .. })
    }

    /// Returns true for wrapped evaluator failures.
    pub fn is_evaluation_error(&self) -> bool {
        matches!(self, Self::Evaluation { .. })
    }
}

/// Result type alias for evaluator calls.
pub type EvaluationResult<T> = std::result::Result<T, EvaluationError>;

/// Result type alias for optimizer operations.
pub type OptimizerResult<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_evaluation_error_creation() {
        let err = EvaluationError::failed("log of a negative number");
        assert!(matches!(err, EvaluationError::Failed { .. }));
        assert_eq!(err.to_string(), "Evaluation failed: log of a negative number");

        let err = EvaluationError::shape_mismatch(3, 4);
        assert_eq!(
            err.to_string(),
            "Evaluator returned a vector of length 4, expected 3"
        );
    }

    #[test]
    fn test_optimizer_error_creation() {
        let err = OptimizerError::invalid_input("initial point is empty");
        assert!(err.is_input_error());
        assert!(!err.is_evaluation_error());
        assert_eq!(err.to_string(), "Invalid input: initial point is empty");

        let err = OptimizerError::dimension_mismatch(5, 6);
        assert!(err.is_input_error());
        assert_eq!(err.to_string(), "Dimension mismatch: expected 5, got 6");

        let err = OptimizerError::invalid_configuration(
            "growth factor must exceed one",
            "radius_growth_factor",
            "0.5",
        );
        assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }));
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_evaluation_error_wrapping() {
        let err = OptimizerError::evaluation(
            EvaluatorKind::Gradient,
            7,
            EvaluationError::non_finite("component 2 is NaN"),
        );
        assert!(err.is_evaluation_error());
        assert_eq!(
            err.to_string(),
            "gradient evaluation failed at iteration 7: \
             Evaluator returned a non-finite value: component 2 is NaN"
        );

        let source = err.source().map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("Evaluator returned a non-finite value: component 2 is NaN")
        );
    }

    #[test]
    fn test_evaluator_kind_display() {
        assert_eq!(EvaluatorKind::Objective.to_string(), "objective");
        assert_eq!(EvaluatorKind::Gradient.to_string(), "gradient");
    }
}

//! Termination policy and optimization results.
//!
//! This module defines why an optimization run stops and what it returns:
//!
//! - [`TerminationReason`]: converged, out of iterations, or numerically degenerate
//! - [`StoppingCriterion`]: the thresholds the run is measured against
//! - [`ConvergenceChecker`]: maps an [`OptimizerState`] to a stop decision
//! - [`OptimizationResult`]: the immutable outcome of a run
//!
//! # Stopping Rules
//!
//! Before every step the checker evaluates, in order:
//!
//! 1. **Degenerate**: n = 0, or a non-finite coordinate in xₖ or gₖ, a
//!    non-finite ‖gₖ‖, or an invalid last step size αₖ₋₁, or too many
//!    consecutive curvature violations
//! 2. **Converged**: ‖gₖ‖₂ ≤ ε_grad (the only convergence test)
//! 3. **MaxIterations**: k ≥ k_max
//!
//! Convergence therefore wins over the iteration budget when both hold.

use crate::core::types::{is_finite_vector, DVector, Scalar};
use crate::optimization::{optimizer_state::OptimizerState, step_size::is_valid_step_size};
use num_traits::Float;
use std::fmt;

/// Why a run stopped in a numerically degenerate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DegeneracyCause {
    /// The problem has dimension zero.
    EmptyProblem,
    /// An iterate has a NaN or infinite coordinate.
    NonFiniteIterate,
    /// A gradient has a NaN or infinite coordinate, or its norm overflowed.
    NonFiniteGradient,
    /// The step size was not finite and positive.
    InvalidStepSize,
    /// The curvature condition failed too many times in a row.
    CurvatureFailures,
}

impl fmt::Display for DegeneracyCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EmptyProblem => "empty problem",
            Self::NonFiniteIterate => "non-finite iterate",
            Self::NonFiniteGradient => "non-finite gradient",
            Self::InvalidStepSize => "invalid step size",
            Self::CurvatureFailures => "repeated curvature violations",
        };
        f.write_str(text)
    }
}

/// Reasons for terminating optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// ‖∇f(xₖ)‖ ≤ ε_grad
    Converged,
    /// The iteration budget was exhausted without convergence
    MaxIterations,
    /// The iteration could not continue meaningfully
    Degenerate(DegeneracyCause),
}

impl TerminationReason {
    /// Whether this reason means the gradient tolerance was met.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Converged)
    }

    /// Whether this reason is a degenerate stop.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Degenerate(_))
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => f.write_str("converged"),
            Self::MaxIterations => f.write_str("maximum iterations reached"),
            Self::Degenerate(cause) => write!(f, "degenerate ({cause})"),
        }
    }
}

/// Stopping criteria for the iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoppingCriterion<T: Scalar> {
    /// Absolute tolerance on ‖gₖ‖₂
    pub gradient_tolerance: T,

    /// Hard ceiling on the number of iterations
    pub max_iterations: usize,

    /// Consecutive curvature violations tolerated before a degenerate stop
    pub max_consecutive_curvature_failures: Option<usize>,
}

impl<T: Scalar> Default for StoppingCriterion<T> {
    fn default() -> Self {
        Self {
            gradient_tolerance: T::DEFAULT_GRADIENT_TOLERANCE,
            max_iterations: 10_000,
            max_consecutive_curvature_failures: Some(20),
        }
    }
}

impl<T: Scalar> StoppingCriterion<T> {
    /// Creates a new stopping criterion with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Sets the gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Sets how many consecutive curvature violations are tolerated.
    pub fn with_max_consecutive_curvature_failures(mut self, limit: usize) -> Self {
        self.max_consecutive_curvature_failures = Some(limit);
        self
    }

    /// Never stop because of curvature violations alone.
    pub fn without_curvature_failure_limit(mut self) -> Self {
        self.max_consecutive_curvature_failures = None;
        self
    }
}

/// Convergence checker for the stabilized BB iteration.
pub struct ConvergenceChecker;

impl ConvergenceChecker {
    /// Checks if any stopping criterion has been met.
    ///
    /// # Returns
    ///
    /// The termination reason if any criterion is met, otherwise None
    /// (continue iterating).
    pub fn check<T: Scalar>(
        state: &OptimizerState<T>,
        criterion: &StoppingCriterion<T>,
    ) -> Option<TerminationReason> {
        if let Some(cause) = Self::degeneracy(state) {
            return Some(TerminationReason::Degenerate(cause));
        }

        if state.gradient_norm <= criterion.gradient_tolerance {
            return Some(TerminationReason::Converged);
        }

        if state.iteration >= criterion.max_iterations {
            return Some(TerminationReason::MaxIterations);
        }

        if let Some(limit) = criterion.max_consecutive_curvature_failures {
            if state.consecutive_curvature_failures >= limit {
                return Some(TerminationReason::Degenerate(
                    DegeneracyCause::CurvatureFailures,
                ));
            }
        }

        None
    }

    /// Detects a state the iteration cannot continue from.
    pub fn degeneracy<T: Scalar>(state: &OptimizerState<T>) -> Option<DegeneracyCause> {
        if state.dimension() == 0 {
            return Some(DegeneracyCause::EmptyProblem);
        }
        if !is_finite_vector(&state.point) {
            return Some(DegeneracyCause::NonFiniteIterate);
        }
        if !is_finite_vector(&state.gradient) || !<T as Float>::is_finite(state.gradient_norm) {
            return Some(DegeneracyCause::NonFiniteGradient);
        }
        if let Some(alpha) = state.last_step_size {
            if !is_valid_step_size(alpha) {
                return Some(DegeneracyCause::InvalidStepSize);
            }
        }
        None
    }
}

/// Result of an optimization run.
///
/// Carries the best iterate (smallest observed gradient norm) rather than
/// the last one, together with diagnostics. Results are deterministic:
/// identical inputs and configuration produce equal results.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizationResult<T: Scalar> {
    /// The best iterate found
    pub point: DVector<T>,

    /// The objective value f(x) at `point`
    pub value: T,

    /// The gradient norm ‖∇f(x)‖ at `point`
    pub gradient_norm: T,

    /// Total number of iterations performed
    pub iterations: usize,

    /// Iteration that produced `point` (0 for the initial point)
    pub best_iteration: usize,

    /// Total number of objective evaluations
    pub function_evaluations: usize,

    /// Total number of gradient evaluations
    pub gradient_evaluations: usize,

    /// Number of steps that were capped by the stabilization radius
    pub stabilized_iterations: usize,

    /// Reason for termination
    pub termination_reason: TerminationReason,

    /// True if the gradient tolerance was met
    pub converged: bool,
}

impl<T: Scalar> OptimizationResult<T> {
    /// Creates a new optimization result.
    pub fn new(
        point: DVector<T>,
        value: T,
        gradient_norm: T,
        iterations: usize,
        termination_reason: TerminationReason,
    ) -> Self {
        Self {
            point,
            value,
            gradient_norm,
            iterations,
            best_iteration: iterations,
            function_evaluations: 0,
            gradient_evaluations: 0,
            stabilized_iterations: 0,
            termination_reason,
            converged: termination_reason.is_converged(),
        }
    }

    /// Sets the iteration that produced the returned point.
    pub fn with_best_iteration(mut self, iteration: usize) -> Self {
        self.best_iteration = iteration;
        self
    }

    /// Sets the function evaluation count.
    pub fn with_function_evaluations(mut self, count: usize) -> Self {
        self.function_evaluations = count;
        self
    }

    /// Sets the gradient evaluation count.
    pub fn with_gradient_evaluations(mut self, count: usize) -> Self {
        self.gradient_evaluations = count;
        self
    }

    /// Sets the number of stabilized iterations.
    pub fn with_stabilized_iterations(mut self, count: usize) -> Self {
        self.stabilized_iterations = count;
        self
    }
}

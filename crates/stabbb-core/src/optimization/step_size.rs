//! Barzilai–Borwein step size selection.
//!
//! This module computes the scalar step length αₖ used by the gradient step
//! xₖ₊₁ = xₖ − αₖ gₖ from the two most recent iterates and gradients.
//!
//! # Mathematical Foundation
//!
//! ## Secant Pairs
//!
//! For k ≥ 1 let
//! - sₖ = xₖ − xₖ₋₁ (step vector)
//! - yₖ = gₖ − gₖ₋₁ (gradient delta)
//!
//! A quasi-Newton method with Hessian model (1/α) I satisfies the secant
//! equation sₖ ≈ α yₖ in the least-squares sense in one of two ways:
//!
//! - **Long step** (BB1): αₖ = sₖᵀsₖ / sₖᵀyₖ, minimizing ‖sₖ/α − yₖ‖
//! - **Short step** (BB2): αₖ = sₖᵀyₖ / yₖᵀyₖ, minimizing ‖sₖ − α yₖ‖
//!
//! By Cauchy–Schwarz the short step never exceeds the long one.
//!
//! ## Curvature Condition
//!
//! Both ratios are positive exactly when sₖᵀyₖ > 0. On a convex function
//! this always holds; elsewhere it can fail, in which case the selector
//! reports a curvature violation instead of a candidate and never divides
//! by a zero or negative curvature. The quantity sₖᵀyₖ is treated as
//! numerically zero when sₖᵀyₖ ≤ τ ‖sₖ‖ ‖yₖ‖ with τ =
//! [`Scalar::CURVATURE_TOLERANCE`].
//!
//! ## Bootstrapping
//!
//! At k = 0 no secant pair exists. The default bootstrap is
//! α₀ = min(1, 1/‖g₀‖), which moves at most a unit distance.
//!
//! # Examples
//!
//! ```rust
//! # use stabbb_core::prelude::*;
//! let selector = StepSizeSelector::<f64>::new(BBVariant::Long, CurvatureFallback::RadiusStep);
//! let s = DVector::from_vec(vec![1.0, 0.0]);
//! let y = DVector::from_vec(vec![2.0, 0.0]);
//! assert_eq!(selector.select(&s, &y).step_size(), Some(0.5));
//! ```

use crate::core::{
    error::{EvaluationError, EvaluationResult},
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::marker::PhantomData;

/// Which Barzilai–Borwein ratio to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BBVariant {
    /// αₖ = sᵀs / sᵀy
    #[default]
    Long,
    /// αₖ = sᵀy / yᵀy
    Short,
}

/// What to do when the curvature condition sᵀy > 0 fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CurvatureFallback {
    /// Produce no candidate; the stabilizer then takes a step of norm exactly
    /// equal to the current radius along −g.
    #[default]
    RadiusStep,
    /// Substitute α = ‖s‖ / ‖y‖, a positive secant scale that ignores the
    /// sign of the curvature. Falls back to `RadiusStep` when y = 0.
    SecantNormRatio,
}

/// How α₀ is chosen before any secant pair exists.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InitialStepSize<T> {
    /// α₀ = min(1, 1/‖g₀‖).
    #[default]
    Heuristic,
    /// A caller-supplied positive α₀.
    Fixed(T),
    /// α₀ = 1/‖x₀‖_∞ (or the heuristic when x₀ = 0), quartered while the
    /// trial point does not decrease the objective.
    ///
    /// This is the only bootstrap that evaluates the objective.
    Backtracking {
        /// Maximum number of quarterings before the last trial is accepted
        max_reductions: usize,
    },
}

impl<T: Scalar> InitialStepSize<T> {
    /// Backtracking bootstrap with a default reduction budget.
    pub fn backtracking() -> Self {
        Self::Backtracking { max_reductions: 30 }
    }
}

/// Outcome of a step size selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepSizeCandidate<T> {
    /// A positive, finite candidate from the secant pair or bootstrap rule.
    Accepted(T),
    /// The curvature condition failed.
    ///
    /// `substitute` carries the fallback step size when the configured
    /// fallback produces one.
    CurvatureViolated {
        /// Fallback candidate, if any
        substitute: Option<T>,
    },
}

impl<T: Scalar> StepSizeCandidate<T> {
    /// The candidate step size, if one was produced.
    pub fn step_size(&self) -> Option<T> {
        match *self {
            Self::Accepted(alpha) => Some(alpha),
            Self::CurvatureViolated { substitute } => substitute,
        }
    }

    /// Whether the curvature condition failed.
    pub fn violates_curvature(&self) -> bool {
        matches!(self, Self::CurvatureViolated { .. })
    }
}

/// Computes Barzilai–Borwein step sizes from secant pairs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSizeSelector<T> {
    variant: BBVariant,
    fallback: CurvatureFallback,
    _phantom: PhantomData<T>,
}

impl<T: Scalar> Default for StepSizeSelector<T> {
    fn default() -> Self {
        Self::new(BBVariant::default(), CurvatureFallback::default())
    }
}

impl<T: Scalar> StepSizeSelector<T> {
    /// Creates a selector for the given ratio and curvature fallback.
    pub fn new(variant: BBVariant, fallback: CurvatureFallback) -> Self {
        Self {
            variant,
            fallback,
            _phantom: PhantomData,
        }
    }

    /// The configured ratio.
    pub fn variant(&self) -> BBVariant {
        self.variant
    }

    /// The configured curvature fallback.
    pub fn fallback(&self) -> CurvatureFallback {
        self.fallback
    }

    /// Selects αₖ from the step vector `s` and gradient delta `y`.
    ///
    /// Never divides by a non-positive quantity and never returns a NaN,
    /// infinite, zero or negative step size.
    pub fn select(&self, s: &DVector<T>, y: &DVector<T>) -> StepSizeCandidate<T> {
        let sy = s.dot(y);
        let s_norm = s.norm();
        let y_norm = y.norm();

        let curvature_ok = <T as Float>::is_finite(sy)
            && sy > T::zero()
            && sy > T::CURVATURE_TOLERANCE * s_norm * y_norm;

        if curvature_ok {
            let alpha = match self.variant {
                BBVariant::Long => s.norm_squared() / sy,
                BBVariant::Short => sy / y.norm_squared(),
            };
            if is_valid_step_size(alpha) {
                return StepSizeCandidate::Accepted(alpha);
            }
        }

        let substitute = match self.fallback {
            CurvatureFallback::RadiusStep => None,
            CurvatureFallback::SecantNormRatio => {
                Some(s_norm / y_norm).filter(|alpha| is_valid_step_size(*alpha))
            }
        };

        StepSizeCandidate::CurvatureViolated { substitute }
    }

    /// The default bootstrap α₀ = min(1, 1/‖g₀‖).
    ///
    /// A zero or non-finite gradient norm yields 1.
    pub fn bootstrap(gradient_norm: T) -> T {
        let alpha = T::one() / gradient_norm;
        if is_valid_step_size(alpha) {
            <T as Float>::min(T::one(), alpha)
        } else {
            T::one()
        }
    }
}

/// Whether `alpha` is usable as a step size: finite and strictly positive.
pub fn is_valid_step_size<T: Scalar>(alpha: T) -> bool {
    <T as Float>::is_finite(alpha) && alpha > T::zero()
}

/// Result of the backtracking bootstrap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktrackingBootstrap<T> {
    /// The accepted α₀
    pub step_size: T,
    /// Objective evaluations spent on trial points
    pub evaluations: usize,
    /// Whether the trial satisfied f(x₀ − α₀ g₀) ≤ f(x₀); false when the
    /// reduction budget ran out first
    pub accepted: bool,
}

/// Chooses α₀ by quartering 1/‖x₀‖_∞ until f(x₀ − α₀ g₀) ≤ f(x₀).
///
/// `value` is f(x₀). A trial with an equal objective value is accepted.
/// After `max_reductions` quarterings the last trial is returned with
/// `accepted` unset. Any non-finite objective value is an
/// error.
pub fn backtracking_bootstrap<T, F>(
    point: &DVector<T>,
    gradient: &DVector<T>,
    value: T,
    max_reductions: usize,
    mut cost: F,
) -> EvaluationResult<BacktrackingBootstrap<T>>
where
    T: Scalar,
    F: FnMut(&DVector<T>) -> EvaluationResult<T>,
{
    let scale = point.amax();
    let mut alpha = if scale > T::zero() {
        T::one() / scale
    } else {
        StepSizeSelector::<T>::bootstrap(gradient.norm())
    };
    if !is_valid_step_size(alpha) {
        alpha = StepSizeSelector::<T>::bootstrap(gradient.norm());
    }

    let quarter = <T as Scalar>::from_f64(0.25);
    let mut evaluations = 0;

    for reduction in 0..=max_reductions {
        let trial = point - gradient * alpha;
        let trial_value = cost(&trial)?;
        evaluations += 1;

        if !<T as Float>::is_finite(trial_value) {
            return Err(EvaluationError::non_finite(format!(
                "objective is {trial_value} at bootstrap trial step {alpha}"
            )));
        }

        if trial_value <= value {
            return Ok(BacktrackingBootstrap {
                step_size: alpha,
                evaluations,
                accepted: true,
            });
        }

        let reduced = alpha * quarter;
        if reduction == max_reductions || !is_valid_step_size(reduced) {
            break;
        }
        alpha = reduced;
    }

    Ok(BacktrackingBootstrap {
        step_size: alpha,
        evaluations,
        accepted: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vec(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    #[test]
    fn test_long_and_short_ratios() {
        let s = vec(&[1.0, 1.0]);
        let y = vec(&[2.0, 1.0]);
        // sᵀs = 2, sᵀy = 3, yᵀy = 5
        let long = StepSizeSelector::new(BBVariant::Long, CurvatureFallback::RadiusStep);
        let short = StepSizeSelector::new(BBVariant::Short, CurvatureFallback::RadiusStep);

        assert_relative_eq!(long.select(&s, &y).step_size().unwrap(), 2.0 / 3.0);
        assert_relative_eq!(short.select(&s, &y).step_size().unwrap(), 3.0 / 5.0);
    }

    #[test]
    fn test_short_never_exceeds_long() {
        let s = vec(&[0.3, -1.2, 0.5]);
        let y = vec(&[0.4, -0.9, 1.5]);
        let long = StepSizeSelector::new(BBVariant::Long, CurvatureFallback::RadiusStep)
            .select(&s, &y)
            .step_size()
            .unwrap();
        let short = StepSizeSelector::new(BBVariant::Short, CurvatureFallback::RadiusStep)
            .select(&s, &y)
            .step_size()
            .unwrap();
        assert!(short <= long);
    }

    #[test]
    fn test_negative_curvature_is_violation() {
        let selector = StepSizeSelector::<f64>::default();
        let s = vec(&[1.0, 0.0]);
        let y = vec(&[-2.0, 0.0]);

        let candidate = selector.select(&s, &y);
        assert!(candidate.violates_curvature());
        assert_eq!(candidate.step_size(), None);
    }

    #[test]
    fn test_zero_curvature_is_violation() {
        let selector = StepSizeSelector::<f64>::default();

        // y = 0
        let candidate = selector.select(&vec(&[1.0, 2.0]), &vec(&[0.0, 0.0]));
        assert!(candidate.violates_curvature());

        // s orthogonal to y
        let candidate = selector.select(&vec(&[1.0, 0.0]), &vec(&[0.0, 3.0]));
        assert!(candidate.violates_curvature());

        // s = 0
        let candidate = selector.select(&vec(&[0.0, 0.0]), &vec(&[1.0, 1.0]));
        assert!(candidate.violates_curvature());
    }

    #[test]
    fn test_secant_norm_ratio_fallback() {
        let selector =
            StepSizeSelector::<f64>::new(BBVariant::Long, CurvatureFallback::SecantNormRatio);
        let s = vec(&[3.0, 0.0]);
        let y = vec(&[0.0, -1.5]);

        let candidate = selector.select(&s, &y);
        assert!(candidate.violates_curvature());
        assert_relative_eq!(candidate.step_size().unwrap(), 2.0);

        // y = 0 leaves no usable ratio
        let candidate = selector.select(&s, &vec(&[0.0, 0.0]));
        assert_eq!(candidate, StepSizeCandidate::CurvatureViolated { substitute: None });
    }

    #[test]
    fn test_non_finite_pair_is_violation() {
        let selector = StepSizeSelector::<f64>::default();
        let candidate = selector.select(&vec(&[f64::NAN]), &vec(&[1.0]));
        assert!(candidate.violates_curvature());
        assert_eq!(candidate.step_size(), None);
    }

    #[test]
    fn test_bootstrap_heuristic() {
        assert_eq!(StepSizeSelector::<f64>::bootstrap(20.0), 0.05);
        assert_eq!(StepSizeSelector::<f64>::bootstrap(0.5), 1.0);
        assert_eq!(StepSizeSelector::<f64>::bootstrap(0.0), 1.0);
        assert_eq!(StepSizeSelector::<f64>::bootstrap(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_backtracking_bootstrap_accepts_equal_value() {
        // f(x) = x², x0 = 1, g0 = 2: α = 1 lands on x = -1 where f(x) = f(x0).
        let x0 = vec(&[1.0]);
        let g0 = vec(&[2.0]);
        let result = backtracking_bootstrap(&x0, &g0, 1.0, 30, |x: &DVector<f64>| {
            Ok(x[0] * x[0])
        })
        .unwrap();

        assert_eq!(result.step_size, 1.0);
        assert_eq!(result.evaluations, 1);
        assert!(result.accepted);
    }

    #[test]
    fn test_backtracking_bootstrap_reduces_until_no_increase() {
        // f(x) = x², x0 = 1, g0 = 4: α = 1 gives x = -3 (increase),
        // α = 0.25 gives x = 0.
        let x0 = vec(&[1.0]);
        let g0 = vec(&[4.0]);
        let result = backtracking_bootstrap(&x0, &g0, 1.0, 30, |x: &DVector<f64>| {
            Ok(x[0] * x[0])
        })
        .unwrap();

        assert_eq!(result.step_size, 0.25);
        assert_eq!(result.evaluations, 2);
        assert!(result.accepted);
    }

    #[test]
    fn test_backtracking_bootstrap_origin_uses_heuristic() {
        let x0 = vec(&[0.0, 0.0]);
        let g0 = vec(&[4.0, 0.0]);
        let result = backtracking_bootstrap(&x0, &g0, 0.0, 5, |x: &DVector<f64>| {
            Ok(x.norm_squared() + 4.0 * x[0])
        })
        .unwrap();

        assert_eq!(result.step_size, 0.25);
        assert!(result.accepted);
    }

    #[test]
    fn test_backtracking_bootstrap_exhausts_budget() {
        let x0 = vec(&[1.0]);
        let g0 = vec(&[1.0]);
        let result =
            backtracking_bootstrap(&x0, &g0, 0.0, 3, |_: &DVector<f64>| Ok(1.0)).unwrap();

        assert_eq!(result.evaluations, 4);
        assert_eq!(result.step_size, 1.0 / 64.0);
        assert!(!result.accepted);
    }

    #[test]
    fn test_backtracking_bootstrap_rejects_non_finite_values() {
        let x0 = vec(&[1.0]);
        let g0 = vec(&[1.0]);
        let err = backtracking_bootstrap(&x0, &g0, 0.0, 3, |_: &DVector<f64>| Ok(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, EvaluationError::NonFinite { .. }));
    }
}

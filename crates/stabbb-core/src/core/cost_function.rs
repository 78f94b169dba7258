//! Objective and gradient evaluators.
//!
//! The optimizer treats the objective f: ℝⁿ → ℝ and its gradient ∇f as
//! opaque capabilities. Two single-method traits describe them:
//!
//! - [`Evaluator`]: x ↦ f(x)
//! - [`GradientEvaluator`]: x ↦ ∇f(x)
//!
//! Both are implemented for plain closures, so most callers never name them.
//! The driver consumes the combined [`CostFunction`] trait; [`EvaluatorPair`]
//! builds one from any evaluator/gradient pair.
//!
//! Evaluators are assumed side-effect free. The optimizer evaluates each
//! gradient exactly once per iterate and the objective only when a value is
//! actually needed.

use crate::core::{
    error::{EvaluationError, EvaluationResult},
    types::{DMatrix, DVector, Scalar},
};
use num_traits::Float;
use std::cell::Cell;
use std::fmt::{self, Debug};

/// Scalar objective f(x).
pub trait Evaluator<T: Scalar> {
    /// Evaluates the objective at `point`.
    fn evaluate(&self, point: &DVector<T>) -> EvaluationResult<T>;
}

impl<T, F> Evaluator<T> for F
where
    T: Scalar,
    F: Fn(&DVector<T>) -> T,
{
    fn evaluate(&self, point: &DVector<T>) -> EvaluationResult<T> {
        Ok(self(point))
    }
}

/// Gradient ∇f(x) of a scalar objective.
pub trait GradientEvaluator<T: Scalar> {
    /// Evaluates the gradient at `point`. The result must have the same length.
    fn gradient(&self, point: &DVector<T>) -> EvaluationResult<DVector<T>>;
}

impl<T, F> GradientEvaluator<T> for F
where
    T: Scalar,
    F: Fn(&DVector<T>) -> DVector<T>,
{
    fn gradient(&self, point: &DVector<T>) -> EvaluationResult<DVector<T>> {
        Ok(self(point))
    }
}

/// Trait for differentiable objectives consumed by the optimizer.
///
/// Implement this directly for problems that share work between the value
/// and the gradient, or whose evaluation can fail.
pub trait CostFunction<T: Scalar>: Debug {
    /// Evaluates the cost function at a point.
    fn cost(&self, point: &DVector<T>) -> EvaluationResult<T>;

    /// Evaluates the gradient at a point.
    fn gradient(&self, point: &DVector<T>) -> EvaluationResult<DVector<T>>;
}

/// Combines a separate objective and gradient evaluator into a [`CostFunction`].
///
/// # Example
///
/// ```
/// use stabbb_core::prelude::*;
///
/// let cost_fn = EvaluatorPair::new(
///     |x: &DVector<f64>| x.norm_squared(),
///     |x: &DVector<f64>| x * 2.0,
/// );
/// let x = DVector::from_vec(vec![1.0, 2.0]);
/// assert_eq!(cost_fn.cost(&x).unwrap(), 5.0);
/// assert_eq!(cost_fn.gradient(&x).unwrap(), DVector::from_vec(vec![2.0, 4.0]));
/// ```
#[derive(Clone)]
pub struct EvaluatorPair<F, G> {
    objective: F,
    gradient: G,
}

impl<F, G> EvaluatorPair<F, G> {
    /// Pairs an objective with its gradient.
    pub fn new(objective: F, gradient: G) -> Self {
        Self {
            objective,
            gradient,
        }
    }
}

impl<F, G> Debug for EvaluatorPair<F, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluatorPair").finish_non_exhaustive()
    }
}

impl<T, F, G> CostFunction<T> for EvaluatorPair<F, G>
where
    T: Scalar,
    F: Evaluator<T>,
    G: GradientEvaluator<T>,
{
    fn cost(&self, point: &DVector<T>) -> EvaluationResult<T> {
        self.objective.evaluate(point)
    }

    fn gradient(&self, point: &DVector<T>) -> EvaluationResult<DVector<T>> {
        self.gradient.gradient(point)
    }
}

/// A quadratic cost function.
///
/// Computes f(x) = 0.5 * x^T * A * x + b^T * x + c with gradient A x + b.
/// With A symmetric positive definite the unique minimizer solves A x = -b.
#[derive(Debug, Clone)]
pub struct QuadraticCost<T: Scalar> {
    /// The quadratic form matrix (should be symmetric)
    pub a: DMatrix<T>,
    /// The linear term
    pub b: DVector<T>,
    /// The constant term
    pub c: T,
}

impl<T: Scalar> QuadraticCost<T> {
    /// Creates a new quadratic cost function.
    pub fn new(a: DMatrix<T>, b: DVector<T>, c: T) -> Self {
        Self { a, b, c }
    }

    /// Creates a simple quadratic with identity matrix: f(x) = 0.5 * ||x||^2
    pub fn simple(dim: usize) -> Self {
        Self {
            a: DMatrix::identity(dim, dim),
            b: DVector::zeros(dim),
            c: T::zero(),
        }
    }

    /// Creates f(x) = 0.5 * sum_i d_i x_i^2 from the diagonal `d`.
    pub fn diagonal(d: DVector<T>) -> Self {
        let dim = d.len();
        Self {
            a: DMatrix::from_diagonal(&d),
            b: DVector::zeros(dim),
            c: T::zero(),
        }
    }

    /// Problem dimension.
    pub fn dim(&self) -> usize {
        self.b.len()
    }

    /// Solves A x = -b by Cholesky factorization.
    ///
    /// Returns `None` when A is not symmetric positive definite.
    pub fn minimizer(&self) -> Option<DVector<T>> {
        let cholesky = self.a.clone().cholesky()?;
        Some(cholesky.solve(&(-&self.b)))
    }
}

impl<T: Scalar> CostFunction<T> for QuadraticCost<T> {
    fn cost(&self, point: &DVector<T>) -> EvaluationResult<T> {
        if point.len() != self.dim() {
            return Err(EvaluationError::shape_mismatch(self.dim(), point.len()));
        }
        let ax = &self.a * point;
        let quad_term = point.dot(&ax) * <T as Scalar>::from_f64(0.5);
        let linear_term = self.b.dot(point);
        Ok(quad_term + linear_term + self.c)
    }

    fn gradient(&self, point: &DVector<T>) -> EvaluationResult<DVector<T>> {
        if point.len() != self.dim() {
            return Err(EvaluationError::shape_mismatch(self.dim(), point.len()));
        }
        Ok(&self.a * point + &self.b)
    }
}

/// Wrapper to count function evaluations for testing and debugging.
#[derive(Debug)]
pub struct CountingCostFunction<F> {
    /// The underlying cost function
    pub inner: F,
    cost_count: Cell<usize>,
    gradient_count: Cell<usize>,
}

impl<F> CountingCostFunction<F> {
    /// Creates a new counting wrapper around a cost function.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cost_count: Cell::new(0),
            gradient_count: Cell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        self.cost_count.set(0);
        self.gradient_count.set(0);
    }

    /// Returns the current (cost, gradient) evaluation counts.
    pub fn counts(&self) -> (usize, usize) {
        (self.cost_count.get(), self.gradient_count.get())
    }
}

impl<T, F> CostFunction<T> for CountingCostFunction<F>
where
    T: Scalar,
    F: CostFunction<T>,
{
    fn cost(&self, point: &DVector<T>) -> EvaluationResult<T> {
        self.cost_count.set(self.cost_count.get() + 1);
        self.inner.cost(point)
    }

    fn gradient(&self, point: &DVector<T>) -> EvaluationResult<DVector<T>> {
        self.gradient_count.set(self.gradient_count.get() + 1);
        self.inner.gradient(point)
    }
}

/// Utilities for checking gradient implementations.
pub struct DerivativeChecker;

impl DerivativeChecker {
    /// Approximates the gradient by central finite differences.
    ///
    /// Component i uses the step h_i = sqrt(ε) * max(1, |x_i|).
    pub fn gradient_fd<T: Scalar>(
        cost_fn: &impl CostFunction<T>,
        point: &DVector<T>,
    ) -> EvaluationResult<DVector<T>> {
        let n = point.len();
        let mut gradient = DVector::zeros(n);
        let base_step = <T as Float>::sqrt(T::EPSILON);
        let two = <T as Scalar>::from_f64(2.0);

        let mut probe = point.clone();
        for i in 0..n {
            let xi = point[i];
            let h = base_step * <T as Float>::max(T::one(), <T as Float>::abs(xi));

            probe[i] = xi + h;
            let f_plus = cost_fn.cost(&probe)?;
            probe[i] = xi - h;
            let f_minus = cost_fn.cost(&probe)?;
            probe[i] = xi;

            gradient[i] = (f_plus - f_minus) / (two * h);
        }

        Ok(gradient)
    }

    /// Checks if the gradient implementation matches finite differences.
    ///
    /// # Returns
    ///
    /// A tuple of (passes, max_error) where passes indicates if the
    /// gradient is correct within tolerance, and max_error is the
    /// maximum component-wise error.
    pub fn check_gradient<T: Scalar>(
        cost_fn: &impl CostFunction<T>,
        point: &DVector<T>,
        tol: T,
    ) -> EvaluationResult<(bool, T)> {
        let analytical_grad = cost_fn.gradient(point)?;
        let fd_grad = Self::gradient_fd(cost_fn, point)?;

        if analytical_grad.len() != fd_grad.len() {
            return Err(EvaluationError::shape_mismatch(
                fd_grad.len(),
                analytical_grad.len(),
            ));
        }

        let diff = &analytical_grad - &fd_grad;
        let max_error = diff
            .iter()
            .map(|x| <T as Float>::abs(*x))
            .fold(T::zero(), |a, b| <T as Float>::max(a, b));

        Ok((max_error < tol, max_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_closures_are_evaluators() {
        let f = |x: &DVector<f64>| x[0] * x[0];
        let g = |x: &DVector<f64>| DVector::from_vec(vec![2.0 * x[0]]);
        let x = DVector::from_vec(vec![3.0]);

        assert_eq!(f.evaluate(&x).unwrap(), 9.0);
        assert_eq!(GradientEvaluator::gradient(&g, &x).unwrap()[0], 6.0);
    }

    #[test]
    fn test_quadratic_cost() {
        let cost = QuadraticCost::<f64>::simple(3);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        assert_relative_eq!(cost.cost(&x).unwrap(), 7.0, epsilon = 1e-12);
        assert_eq!(cost.gradient(&x).unwrap(), x);
    }

    #[test]
    fn test_quadratic_minimizer() {
        let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let b = DVector::from_vec(vec![-1.0, -2.0]);
        let cost = QuadraticCost::new(a, b, 0.0);

        let x_star = cost.minimizer().unwrap();
        let grad = cost.gradient(&x_star).unwrap();
        assert!(grad.norm() < 1e-12);

        let indefinite = QuadraticCost::diagonal(DVector::from_vec(vec![1.0, -1.0]));
        assert!(indefinite.minimizer().is_none());
    }

    #[test]
    fn test_quadratic_rejects_wrong_length() {
        let cost = QuadraticCost::<f64>::simple(2);
        let x = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        assert_eq!(
            cost.gradient(&x).unwrap_err(),
            EvaluationError::shape_mismatch(2, 3)
        );
    }

    #[test]
    fn test_counting_cost_function() {
        let counting = CountingCostFunction::new(QuadraticCost::<f64>::simple(2));
        let x = DVector::from_vec(vec![1.0, 1.0]);

        counting.cost(&x).unwrap();
        counting.gradient(&x).unwrap();
        counting.gradient(&x).unwrap();
        assert_eq!(counting.counts(), (1, 2));

        counting.reset_counts();
        assert_eq!(counting.counts(), (0, 0));
    }

    #[test]
    fn test_evaluator_pair_propagates_errors() {
        #[derive(Debug)]
        struct Failing;
        impl Evaluator<f64> for Failing {
            fn evaluate(&self, _point: &DVector<f64>) -> EvaluationResult<f64> {
                Err(EvaluationError::failed("outside the domain"))
            }
        }

        let pair = EvaluatorPair::new(Failing, |x: &DVector<f64>| x.clone());
        let x = DVector::from_vec(vec![1.0]);
        assert!(pair.cost(&x).is_err());
        assert!(pair.gradient(&x).is_ok());
    }

    #[test]
    fn test_derivative_checker() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let cost = QuadraticCost::new(a, DVector::from_vec(vec![1.0, -1.0]), 3.0);
        let x = DVector::from_vec(vec![0.3, -0.7]);

        let (passes, max_error) = DerivativeChecker::check_gradient(&cost, &x, 1e-6).unwrap();
        assert!(passes, "max error {max_error}");
    }
}

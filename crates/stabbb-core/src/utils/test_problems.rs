//! Shared test problems for benchmarks and tests.

#![cfg(any(test, feature = "test-utils"))]

use crate::core::{
    cost_function::{CostFunction, QuadraticCost},
    error::{EvaluationError, EvaluationResult},
    types::{DMatrix, DVector},
};
use rand::prelude::*;

/// Starting point of the classic five-dimensional Rosenbrock benchmark.
pub const ROSENBROCK_5_START: [f64; 5] = [1.3, 0.7, 0.8, 1.9, 1.2];

/// Extended Rosenbrock function
///
/// f(x) = Σᵢ 100 (xᵢ₊₁ − xᵢ²)² + (1 − xᵢ)², minimized at x = (1, …, 1).
#[derive(Debug, Clone, Copy)]
pub struct Rosenbrock {
    dim: usize,
}

impl Rosenbrock {
    /// Creates the Rosenbrock function in `dim` ≥ 2 dimensions.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// The global minimizer (1, …, 1).
    pub fn minimizer(&self) -> DVector<f64> {
        DVector::from_element(self.dim, 1.0)
    }

    fn check_len(&self, x: &DVector<f64>) -> EvaluationResult<()> {
        if x.len() == self.dim {
            Ok(())
        } else {
            Err(EvaluationError::shape_mismatch(self.dim, x.len()))
        }
    }
}

impl CostFunction<f64> for Rosenbrock {
    fn cost(&self, x: &DVector<f64>) -> EvaluationResult<f64> {
        self.check_len(x)?;
        let mut cost = 0.0;
        for i in 0..self.dim.saturating_sub(1) {
            let a = 1.0 - x[i];
            let b = x[i + 1] - x[i] * x[i];
            cost += a * a + 100.0 * b * b;
        }
        Ok(cost)
    }

    fn gradient(&self, x: &DVector<f64>) -> EvaluationResult<DVector<f64>> {
        self.check_len(x)?;
        let mut gradient = DVector::zeros(self.dim);
        for i in 0..self.dim.saturating_sub(1) {
            let a = 1.0 - x[i];
            let b = x[i + 1] - x[i] * x[i];
            gradient[i] += -2.0 * a - 400.0 * x[i] * b;
            gradient[i + 1] += 200.0 * b;
        }
        Ok(gradient)
    }
}

/// Random symmetric positive definite quadratic ½xᵀAx + bᵀx.
///
/// A = MᵀM + n I with M uniform in [-1, 1], so every eigenvalue of A is at
/// least n and the problem stays well conditioned in every dimension.
pub fn random_spd_quadratic<R: Rng>(n: usize, rng: &mut R) -> QuadraticCost<f64> {
    let m = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.0));
    let shift = n.max(1) as f64;
    let a = m.transpose() * &m + DMatrix::identity(n, n) * shift;
    let b = DVector::from_fn(n, |_, _| rng.gen_range(-5.0..5.0));
    QuadraticCost::new(a, b, 0.0)
}

/// Random diagonal quadratic ½ Σ dᵢ xᵢ² with eigenvalues spread over
/// [1, condition_number].
pub fn random_diagonal_quadratic<R: Rng>(
    n: usize,
    condition_number: f64,
    rng: &mut R,
) -> QuadraticCost<f64> {
    let log_kappa = condition_number.max(1.0).ln();
    let d = DVector::from_fn(n, |i, _| {
        if i == 0 {
            1.0
        } else if i == 1 {
            condition_number.max(1.0)
        } else {
            (rng.gen_range(0.0..1.0) * log_kappa).exp()
        }
    });
    QuadraticCost::diagonal(d)
}

/// Random point with coordinates uniform in [-scale, scale].
pub fn random_point<R: Rng>(n: usize, scale: f64, rng: &mut R) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.gen_range(-scale..scale))
}

/// Deterministic generator for reproducible tests.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost_function::DerivativeChecker;

    #[test]
    fn test_rosenbrock_minimum() {
        let f = Rosenbrock::new(5);
        let x_star = f.minimizer();
        assert_eq!(f.cost(&x_star).unwrap(), 0.0);
        assert_eq!(f.gradient(&x_star).unwrap().norm(), 0.0);
    }

    #[test]
    fn test_rosenbrock_gradient_matches_finite_differences() {
        let f = Rosenbrock::new(5);
        let x = DVector::from_column_slice(&ROSENBROCK_5_START);
        let (passes, max_error) = DerivativeChecker::check_gradient(&f, &x, 1e-4).unwrap();
        assert!(passes, "max error {max_error}");
    }

    #[test]
    fn test_random_spd_quadratic_is_positive_definite() {
        let mut rng = seeded_rng(7);
        for n in [1, 5, 50] {
            let q = random_spd_quadratic(n, &mut rng);
            let eigenvalues = q.a.clone().symmetric_eigenvalues();
            assert!(eigenvalues.iter().all(|&l| l >= n as f64 - 1e-9));
            assert!(q.minimizer().is_some());
        }
    }

    #[test]
    fn test_random_diagonal_quadratic_condition() {
        let mut rng = seeded_rng(11);
        let q = random_diagonal_quadratic(10, 100.0, &mut rng);
        let d = q.a.diagonal();
        assert_eq!(d.min(), 1.0);
        assert_eq!(d.max(), 100.0);
    }
}

//! Running state of the stabilized Barzilai–Borwein iteration.
//!
//! The driver owns exactly one [`OptimizerState`] for the duration of a run
//! and threads it through the step size selector, the stabilizer and the
//! convergence checker. Nothing else retains iteration state.

use crate::core::types::{DVector, Scalar};
use num_traits::Float;
use std::collections::VecDeque;

/// Number of recent step norms kept by default.
pub const DEFAULT_STEP_HISTORY: usize = 3;

/// The iterate with the smallest gradient norm observed so far.
#[derive(Debug, Clone, PartialEq)]
pub struct BestIterate<T: Scalar> {
    /// The iterate
    pub point: DVector<T>,
    /// Its gradient norm
    pub gradient_norm: T,
    /// Iteration at which it was produced (0 for the initial point)
    pub iteration: usize,
}

/// Mutable optimizer state.
#[derive(Debug, Clone)]
pub struct OptimizerState<T: Scalar> {
    /// Current iterate xₖ
    pub point: DVector<T>,

    /// Gradient gₖ at the current iterate
    pub gradient: DVector<T>,

    /// ‖gₖ‖₂
    pub gradient_norm: T,

    /// Previous iterate xₖ₋₁ (None at k = 0)
    pub previous_point: Option<DVector<T>>,

    /// Previous gradient gₖ₋₁ (None at k = 0)
    pub previous_gradient: Option<DVector<T>>,

    /// Stabilization radius Δₖ for the next step
    pub radius: T,

    /// Number of completed iterations k
    pub iteration: usize,

    /// Step size αₖ₋₁ used to reach the current iterate
    pub last_step_size: Option<T>,

    /// Consecutive stabilized steps ending at the current iterate
    pub consecutive_stabilized: usize,

    /// Consecutive free (unstabilized) steps ending at the current iterate
    pub consecutive_free: usize,

    /// Consecutive iterations whose secant pair violated the curvature condition
    pub consecutive_curvature_failures: usize,

    /// Total number of stabilized steps
    pub stabilized_iterations: usize,

    /// f(x₀), when the bootstrap had to evaluate it
    pub initial_value: Option<T>,

    /// Objective evaluations so far
    pub function_evaluations: usize,

    /// Gradient evaluations so far
    pub gradient_evaluations: usize,

    recent_step_norms: VecDeque<T>,
    step_history: usize,
    best: BestIterate<T>,
}

impl<T: Scalar> OptimizerState<T> {
    /// Creates the state at k = 0 from x₀, g₀ = ∇f(x₀) and Δ₀.
    ///
    /// Counts the gradient evaluation that produced `gradient`.
    pub fn new(point: DVector<T>, gradient: DVector<T>, radius: T) -> Self {
        let gradient_norm = gradient.norm();
        let best = BestIterate {
            point: point.clone(),
            gradient_norm,
            iteration: 0,
        };

        Self {
            point,
            gradient,
            gradient_norm,
            previous_point: None,
            previous_gradient: None,
            radius,
            iteration: 0,
            last_step_size: None,
            consecutive_stabilized: 0,
            consecutive_free: 0,
            consecutive_curvature_failures: 0,
            stabilized_iterations: 0,
            initial_value: None,
            function_evaluations: 0,
            gradient_evaluations: 1,
            recent_step_norms: VecDeque::with_capacity(DEFAULT_STEP_HISTORY),
            step_history: DEFAULT_STEP_HISTORY,
            best,
        }
    }

    /// Sets how many recent step norms are retained.
    pub fn with_step_history(mut self, len: usize) -> Self {
        self.step_history = len.max(1);
        while self.recent_step_norms.len() > self.step_history {
            self.recent_step_norms.pop_front();
        }
        self
    }

    /// Problem dimension n.
    pub fn dimension(&self) -> usize {
        self.point.len()
    }

    /// The secant pair (sₖ, yₖ), available for k ≥ 1.
    pub fn secant_pair(&self) -> Option<(DVector<T>, DVector<T>)> {
        match (&self.previous_point, &self.previous_gradient) {
            (Some(x_prev), Some(g_prev)) => {
                Some((&self.point - x_prev, &self.gradient - g_prev))
            }
            _ => None,
        }
    }

    /// Records whether this iteration's secant pair violated the curvature condition.
    pub fn record_curvature(&mut self, violated: bool) {
        if violated {
            self.consecutive_curvature_failures += 1;
        } else {
            self.consecutive_curvature_failures = 0;
        }
    }

    /// Moves to xₖ₊₁ with gradient gₖ₊₁ after a step of size `step_size`.
    ///
    /// The gradient must already be evaluated; it is counted here.
    pub fn advance(
        &mut self,
        point: DVector<T>,
        gradient: DVector<T>,
        step_size: T,
        step_norm: T,
        stabilized: bool,
    ) {
        let gradient_norm = gradient.norm();

        self.previous_point = Some(std::mem::replace(&mut self.point, point));
        self.previous_gradient = Some(std::mem::replace(&mut self.gradient, gradient));
        self.gradient_norm = gradient_norm;
        self.iteration += 1;
        self.gradient_evaluations += 1;
        self.last_step_size = Some(step_size);

        if stabilized {
            self.consecutive_stabilized += 1;
            self.consecutive_free = 0;
            self.stabilized_iterations += 1;
        } else {
            self.consecutive_free += 1;
            self.consecutive_stabilized = 0;
        }

        if self.recent_step_norms.len() == self.step_history {
            self.recent_step_norms.pop_front();
        }
        self.recent_step_norms.push_back(step_norm);

        // NaN never compares less, so a non-finite gradient cannot become best.
        if gradient_norm < self.best.gradient_norm {
            self.best = BestIterate {
                point: self.point.clone(),
                gradient_norm,
                iteration: self.iteration,
            };
        }
    }

    /// Recent step norms, oldest first.
    pub fn recent_step_norms(&self) -> impl Iterator<Item = T> + '_ {
        self.recent_step_norms.iter().copied()
    }

    /// Smallest of the last `window` step norms, if that many steps were taken.
    pub fn min_recent_step_norm(&self, window: usize) -> Option<T> {
        if window == 0 || self.recent_step_norms.len() < window {
            return None;
        }
        self.recent_step_norms
            .iter()
            .rev()
            .take(window)
            .copied()
            .reduce(|a, b| <T as Float>::min(a, b))
    }

    /// The best iterate observed so far.
    pub fn best(&self) -> &BestIterate<T> {
        &self.best
    }

    /// Consumes the state, returning the best iterate.
    pub fn into_best(self) -> BestIterate<T> {
        self.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    #[test]
    fn test_initial_state() {
        let state = OptimizerState::new(vec(&[3.0, 4.0]), vec(&[6.0, 8.0]), 5.0);

        assert_eq!(state.iteration, 0);
        assert_eq!(state.gradient_norm, 10.0);
        assert_eq!(state.dimension(), 2);
        assert_eq!(state.gradient_evaluations, 1);
        assert_eq!(state.function_evaluations, 0);
        assert!(state.secant_pair().is_none());
        assert_eq!(state.best().iteration, 0);
    }

    #[test]
    fn test_advance_builds_secant_pair() {
        let mut state = OptimizerState::new(vec(&[1.0, 1.0]), vec(&[2.0, 2.0]), 1.0);
        state.advance(vec(&[0.5, 0.5]), vec(&[1.0, 1.0]), 0.25, 0.7, false);

        let (s, y) = state.secant_pair().unwrap();
        assert_eq!(s, vec(&[-0.5, -0.5]));
        assert_eq!(y, vec(&[-1.0, -1.0]));
        assert_eq!(state.iteration, 1);
        assert_eq!(state.last_step_size, Some(0.25));
        assert_eq!(state.gradient_evaluations, 2);
        assert_eq!(state.consecutive_free, 1);
    }

    #[test]
    fn test_stabilization_counters() {
        let mut state = OptimizerState::new(vec(&[1.0]), vec(&[1.0]), 1.0);
        state.advance(vec(&[0.0]), vec(&[0.9]), 1.0, 1.0, true);
        state.advance(vec(&[-1.0]), vec(&[0.8]), 1.0, 1.0, true);
        assert_eq!(state.consecutive_stabilized, 2);
        assert_eq!(state.stabilized_iterations, 2);

        state.advance(vec(&[-1.5]), vec(&[0.7]), 0.5, 0.5, false);
        assert_eq!(state.consecutive_stabilized, 0);
        assert_eq!(state.consecutive_free, 1);
        assert_eq!(state.stabilized_iterations, 2);
    }

    #[test]
    fn test_best_iterate_tracks_smallest_gradient() {
        let mut state = OptimizerState::new(vec(&[0.0]), vec(&[1.0]), 1.0);
        state.advance(vec(&[1.0]), vec(&[0.5]), 1.0, 1.0, false);
        state.advance(vec(&[2.0]), vec(&[3.0]), 1.0, 1.0, false);
        state.advance(vec(&[3.0]), vec(&[f64::NAN]), 1.0, 1.0, false);

        let best = state.best();
        assert_eq!(best.iteration, 1);
        assert_eq!(best.point, vec(&[1.0]));
        assert_eq!(best.gradient_norm, 0.5);
    }

    #[test]
    fn test_curvature_failure_counter() {
        let mut state = OptimizerState::new(vec(&[0.0]), vec(&[1.0]), 1.0);
        state.record_curvature(true);
        state.record_curvature(true);
        assert_eq!(state.consecutive_curvature_failures, 2);
        state.record_curvature(false);
        assert_eq!(state.consecutive_curvature_failures, 0);
    }

    #[test]
    fn test_recent_step_norms_window() {
        let mut state = OptimizerState::new(vec(&[0.0]), vec(&[1.0]), 1.0);
        assert_eq!(state.min_recent_step_norm(3), None);

        for (i, norm) in [4.0, 2.0, 3.0, 5.0].into_iter().enumerate() {
            state.advance(vec(&[i as f64]), vec(&[1.0]), 1.0, norm, false);
        }

        let recent: Vec<f64> = state.recent_step_norms().collect();
        assert_eq!(recent, vec![2.0, 3.0, 5.0]);
        assert_eq!(state.min_recent_step_norm(3), Some(2.0));
        assert_eq!(state.min_recent_step_norm(2), Some(3.0));
        assert_eq!(state.min_recent_step_norm(4), None);
    }
}

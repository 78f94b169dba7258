//! Stabilized Barzilai–Borwein gradient method.
//!
//! The Barzilai–Borwein (BB) method is gradient descent whose step length
//! comes from a secant condition on the last two iterates instead of a line
//! search. It is cheap, often fast, and non-monotone; on general smooth
//! functions its steps can be far too long. This optimizer adds a
//! [`Stabilizer`] that bounds ‖xₖ₊₁ − xₖ‖ by an adaptive radius.
//!
//! # Algorithm Overview
//!
//! ```text
//! INIT:   validate x₀, g₀ = ∇f(x₀), Δ₀
//! repeat:
//!     stop if degenerate, ‖gₖ‖ ≤ ε, or k = k_max
//!     αₖ = bootstrap (k = 0) or BB ratio of (sₖ, yₖ)
//!     αₖ = stabilize(αₖ, ‖gₖ‖, Δₖ)
//!     xₖ₊₁ = xₖ − αₖ gₖ,  gₖ₊₁ = ∇f(xₖ₊₁)
//!     adapt Δ
//! return the iterate with the smallest gradient norm
//! ```
//!
//! Each gradient is evaluated exactly once per iterate. The objective is not
//! needed by the iteration itself; it is evaluated once at the returned
//! point, plus a few times at x₀ when the backtracking bootstrap is used.
//!
//! # Key Features
//!
//! - **Long or short BB step**: [`BBVariant`]
//! - **Adaptive radius**: growth on sustained free progress, optional shrink,
//!   one-time reseed from early step lengths
//! - **Curvature safeguard**: radius steps (or secant norm ratio steps) when
//!   sᵀy ≤ 0, and a degenerate stop after too many in a row
//! - **Best iterate**: the returned point is never a corrupted last iterate
//!
//! # References
//!
//! - Barzilai & Borwein, "Two-point step size gradient methods" (1988)
//! - Raydan, "The Barzilai and Borwein gradient method for the large scale
//!   unconstrained minimization problem" (1997)
//! - Burdakov, Dai & Huang, "Stabilized Barzilai-Borwein method" (2019)

use crate::stabilizer::{RadiusChange, RadiusConfig, RadiusStrategy, Stabilizer};
use num_traits::Float;
use stabbb_core::{
    callback::{IterationSnapshot, NoOpCallback, OptimizationCallback},
    cost_function::{CostFunction, Evaluator, EvaluatorPair, GradientEvaluator},
    error::{EvaluationError, EvaluatorKind, OptimizerError, OptimizerResult},
    optimizer::{
        ConvergenceChecker, DegeneracyCause, OptimizationResult, StoppingCriterion,
        TerminationReason,
    },
    optimizer_state::{OptimizerState, DEFAULT_STEP_HISTORY},
    step_size::{
        backtracking_bootstrap, is_valid_step_size, BBVariant, CurvatureFallback,
        InitialStepSize, StepSizeCandidate, StepSizeSelector,
    },
    types::{is_finite_vector, DVector, Scalar},
};

/// Configuration for the stabilized BB optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StabilizedBBConfig<T: Scalar> {
    /// Absolute tolerance on ‖gₖ‖₂
    pub gradient_tolerance: T,
    /// Hard iteration ceiling
    pub max_iterations: usize,
    /// Consecutive curvature violations tolerated before a degenerate stop
    pub max_consecutive_curvature_failures: Option<usize>,
    /// Long or short BB ratio
    pub variant: BBVariant,
    /// Bootstrap rule for α₀
    pub initial_step_size: InitialStepSize<T>,
    /// Replacement step when sᵀy ≤ 0
    pub curvature_fallback: CurvatureFallback,
    /// Stabilization radius parameters
    pub radius: RadiusConfig<T>,
}

impl<T: Scalar> Default for StabilizedBBConfig<T> {
    fn default() -> Self {
        let stopping = StoppingCriterion::<T>::default();
        Self {
            gradient_tolerance: stopping.gradient_tolerance,
            max_iterations: stopping.max_iterations,
            max_consecutive_curvature_failures: stopping.max_consecutive_curvature_failures,
            variant: BBVariant::Long,
            initial_step_size: InitialStepSize::Heuristic,
            curvature_fallback: CurvatureFallback::RadiusStep,
            radius: RadiusConfig::default(),
        }
    }
}

impl<T: Scalar> StabilizedBBConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the gradient tolerance.
    pub fn with_gradient_tolerance(mut self, tol: T) -> Self {
        self.gradient_tolerance = tol;
        self
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
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

    /// Selects the BB ratio.
    pub fn with_variant(mut self, variant: BBVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Uses the short BB ratio sᵀy / yᵀy.
    pub fn with_short_step(mut self) -> Self {
        self.variant = BBVariant::Short;
        self
    }

    /// Uses a fixed α₀.
    pub fn with_initial_step_size(mut self, alpha: T) -> Self {
        self.initial_step_size = InitialStepSize::Fixed(alpha);
        self
    }

    /// Chooses α₀ by backtracking on the objective.
    pub fn with_backtracking_bootstrap(mut self) -> Self {
        self.initial_step_size = InitialStepSize::backtracking();
        self
    }

    /// Sets the curvature fallback.
    pub fn with_curvature_fallback(mut self, fallback: CurvatureFallback) -> Self {
        self.curvature_fallback = fallback;
        self
    }

    /// Sets the initial radius Δ₀.
    pub fn with_initial_radius(mut self, radius: T) -> Self {
        self.radius = self.radius.with_initial_radius(radius);
        self
    }

    /// Sets the radius growth factor.
    pub fn with_radius_growth_factor(mut self, factor: T) -> Self {
        self.radius = self.radius.with_growth_factor(factor);
        self
    }

    /// Sets the maximum radius.
    pub fn with_max_radius(mut self, radius: T) -> Self {
        self.radius = self.radius.with_max_radius(radius);
        self
    }

    /// Keeps the radius fixed at Δ₀ for the whole run.
    pub fn with_constant_radius(mut self) -> Self {
        self.radius = self.radius.with_strategy(RadiusStrategy::Constant);
        self
    }

    /// Replaces all radius parameters.
    pub fn with_radius_config(mut self, radius: RadiusConfig<T>) -> Self {
        self.radius = radius;
        self
    }

    /// The stopping criterion derived from this configuration.
    pub fn stopping_criterion(&self) -> StoppingCriterion<T> {
        StoppingCriterion {
            gradient_tolerance: self.gradient_tolerance,
            max_iterations: self.max_iterations,
            max_consecutive_curvature_failures: self.max_consecutive_curvature_failures,
        }
    }

    /// Checks every parameter.
    pub fn validate(&self) -> OptimizerResult<()> {
        if !<T as Float>::is_finite(self.gradient_tolerance)
            || self.gradient_tolerance < T::zero()
        {
            return Err(OptimizerError::invalid_configuration(
                "gradient tolerance must be finite and non-negative",
                "gradient_tolerance",
                self.gradient_tolerance.to_string(),
            ));
        }
        if let InitialStepSize::Fixed(alpha) = self.initial_step_size {
            if !is_valid_step_size(alpha) {
                return Err(OptimizerError::invalid_configuration(
                    "initial step size must be finite and positive",
                    "initial_step_size",
                    alpha.to_string(),
                ));
            }
        }
        self.radius.validate()
    }
}

/// Stabilized Barzilai–Borwein optimizer.
#[derive(Debug, Clone)]
pub struct StabilizedBB<T: Scalar> {
    config: StabilizedBBConfig<T>,
    selector: StepSizeSelector<T>,
    stabilizer: Stabilizer<T>,
}

impl<T: Scalar> Default for StabilizedBB<T> {
    fn default() -> Self {
        Self::new(StabilizedBBConfig::default())
    }
}

impl<T: Scalar> StabilizedBB<T> {
    /// Creates a new optimizer with the given configuration.
    pub fn new(config: StabilizedBBConfig<T>) -> Self {
        Self {
            selector: StepSizeSelector::new(config.variant, config.curvature_fallback),
            stabilizer: Stabilizer::new(config.radius),
            config,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StabilizedBBConfig<T> {
        &self.config
    }

    /// Returns the optimizer name.
    pub fn name(&self) -> &str {
        match self.config.variant {
            BBVariant::Long => "Stabilized Barzilai-Borwein (long step)",
            BBVariant::Short => "Stabilized Barzilai-Borwein (short step)",
        }
    }

    /// Minimizes `cost_fn` starting from `initial_point`.
    pub fn optimize<C>(
        &self,
        cost_fn: &C,
        initial_point: &DVector<T>,
    ) -> OptimizerResult<OptimizationResult<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        self.optimize_with_callback(cost_fn, initial_point, &mut NoOpCallback)
    }

    /// Minimizes `cost_fn`, reporting every iteration to `callback`.
    pub fn optimize_with_callback<C, F>(
        &self,
        cost_fn: &C,
        initial_point: &DVector<T>,
        callback: &mut F,
    ) -> OptimizerResult<OptimizationResult<T>>
    where
        C: CostFunction<T> + ?Sized,
        F: OptimizationCallback<T> + ?Sized,
    {
        self.config.validate()?;
        let mut state = self.initialize(cost_fn, initial_point)?;
        let criterion = self.config.stopping_criterion();

        log::debug!(
            "[StabBB] Starting: n={}, ||g0||={:.3e}, radius={:.3e}",
            state.dimension(),
            Scalar::to_f64(state.gradient_norm),
            Scalar::to_f64(state.radius)
        );
        callback.on_optimization_start(initial_point, state.gradient_norm);

        let reason = loop {
            if let Some(reason) = ConvergenceChecker::check(&state, &criterion) {
                break reason;
            }

            let candidate = self.select_step_size(cost_fn, &mut state)?;
            let curvature_violated = candidate.violates_curvature();
            state.record_curvature(curvature_violated);
            if curvature_violated {
                log::debug!(
                    "[StabBB] Curvature condition violated at iter {} ({} in a row)",
                    state.iteration,
                    state.consecutive_curvature_failures
                );
            }

            let step =
                self.stabilizer
                    .stabilize(candidate.step_size(), state.gradient_norm, state.radius);
            if !is_valid_step_size(step.step_size) {
                break TerminationReason::Degenerate(DegeneracyCause::InvalidStepSize);
            }

            let next_point = &state.point - &state.gradient * step.step_size;
            if !is_finite_vector(&next_point) {
                break TerminationReason::Degenerate(DegeneracyCause::NonFiniteIterate);
            }

            let next_iteration = state.iteration + 1;
            let next_gradient = cost_fn.gradient(&next_point).map_err(|e| {
                OptimizerError::evaluation(EvaluatorKind::Gradient, next_iteration, e)
            })?;
            if next_gradient.len() != next_point.len() {
                return Err(OptimizerError::evaluation(
                    EvaluatorKind::Gradient,
                    next_iteration,
                    EvaluationError::shape_mismatch(next_point.len(), next_gradient.len()),
                ));
            }

            state.advance(
                next_point,
                next_gradient,
                step.step_size,
                step.step_norm,
                step.stabilized,
            );
            let change = self.stabilizer.adapt_radius(&mut state, &step);

            log::debug!(
                "[StabBB] iter={}, ||g||={:.3e}, alpha={:.3e}, step={:.3e}, radius={:.3e}{}",
                state.iteration,
                Scalar::to_f64(state.gradient_norm),
                Scalar::to_f64(step.step_size),
                Scalar::to_f64(step.step_norm),
                Scalar::to_f64(state.radius),
                if step.stabilized { " (stabilized)" } else { "" }
            );
            if change == RadiusChange::Reseeded {
                log::debug!(
                    "[StabBB] Radius reseeded to {:.3e} at iter {}",
                    Scalar::to_f64(state.radius),
                    state.iteration
                );
            }

            callback.on_iteration_end(&IterationSnapshot {
                iteration: state.iteration,
                point: &state.point,
                gradient_norm: state.gradient_norm,
                step_size: step.step_size,
                step_norm: step.step_norm,
                radius: step.radius,
                next_radius: state.radius,
                stabilized: step.stabilized,
                curvature_violated,
            });
        };

        let result = self.finish(cost_fn, state, reason)?;
        callback.on_optimization_end(&result);
        Ok(result)
    }

    /// INIT: validates x₀, evaluates g₀ and sets Δ₀.
    fn initialize<C>(
        &self,
        cost_fn: &C,
        initial_point: &DVector<T>,
    ) -> OptimizerResult<OptimizerState<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        let n = initial_point.len();
        if n == 0 {
            return Err(OptimizerError::invalid_input("initial point is empty"));
        }
        if !is_finite_vector(initial_point) {
            return Err(OptimizerError::invalid_input(
                "initial point has non-finite coordinates",
            ));
        }

        let gradient = cost_fn
            .gradient(initial_point)
            .map_err(|e| OptimizerError::evaluation(EvaluatorKind::Gradient, 0, e))?;
        if gradient.len() != n {
            return Err(OptimizerError::dimension_mismatch(n, gradient.len()));
        }
        if !is_finite_vector(&gradient) {
            return Err(OptimizerError::evaluation(
                EvaluatorKind::Gradient,
                0,
                EvaluationError::non_finite("gradient at the initial point"),
            ));
        }

        let radius = self.stabilizer.initial_radius(initial_point);
        let history = self
            .config
            .radius
            .reseed
            .map_or(DEFAULT_STEP_HISTORY, |reseed| reseed.window);

        Ok(OptimizerState::new(initial_point.clone(), gradient, radius).with_step_history(history))
    }

    /// Candidate αₖ: the bootstrap rule at k = 0, the BB ratio afterwards.
    fn select_step_size<C>(
        &self,
        cost_fn: &C,
        state: &mut OptimizerState<T>,
    ) -> OptimizerResult<StepSizeCandidate<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        if let Some((s, y)) = state.secant_pair() {
            return Ok(self.selector.select(&s, &y));
        }

        let alpha = match self.config.initial_step_size {
            InitialStepSize::Heuristic => StepSizeSelector::<T>::bootstrap(state.gradient_norm),
            InitialStepSize::Fixed(alpha) => alpha,
            InitialStepSize::Backtracking { max_reductions } => {
                let value = self.objective_value(cost_fn, &state.point, 0)?;
                state.function_evaluations += 1;
                state.initial_value = Some(value);

                let outcome = backtracking_bootstrap(
                    &state.point,
                    &state.gradient,
                    value,
                    max_reductions,
                    |x| cost_fn.cost(x),
                )
                .map_err(|e| OptimizerError::evaluation(EvaluatorKind::Objective, 0, e))?;
                state.function_evaluations += outcome.evaluations;

                if !outcome.accepted {
                    log::debug!(
                        "[StabBB] Bootstrap backtracking found no acceptable trial after {} trials",
                        outcome.evaluations
                    );
                }
                outcome.step_size
            }
        };

        Ok(StepSizeCandidate::Accepted(alpha))
    }

    fn objective_value<C>(
        &self,
        cost_fn: &C,
        point: &DVector<T>,
        iteration: usize,
    ) -> OptimizerResult<T>
    where
        C: CostFunction<T> + ?Sized,
    {
        let value = cost_fn
            .cost(point)
            .map_err(|e| OptimizerError::evaluation(EvaluatorKind::Objective, iteration, e))?;
        if !<T as Float>::is_finite(value) {
            return Err(OptimizerError::evaluation(
                EvaluatorKind::Objective,
                iteration,
                EvaluationError::non_finite(format!("objective value {value}")),
            ));
        }
        Ok(value)
    }

    /// Builds the result around the best iterate.
    fn finish<C>(
        &self,
        cost_fn: &C,
        mut state: OptimizerState<T>,
        reason: TerminationReason,
    ) -> OptimizerResult<OptimizationResult<T>>
    where
        C: CostFunction<T> + ?Sized,
    {
        let iterations = state.iteration;
        let best_iteration = state.best().iteration;

        let value = match state.initial_value {
            Some(value) if best_iteration == 0 => value,
            _ => {
                let value = self.objective_value(cost_fn, &state.best().point, iterations)?;
                state.function_evaluations += 1;
                value
            }
        };

        let function_evaluations = state.function_evaluations;
        let gradient_evaluations = state.gradient_evaluations;
        let stabilized_iterations = state.stabilized_iterations;
        let best = state.into_best();

        let result = OptimizationResult::new(best.point, value, best.gradient_norm, iterations, reason)
            .with_best_iteration(best.iteration)
            .with_function_evaluations(function_evaluations)
            .with_gradient_evaluations(gradient_evaluations)
            .with_stabilized_iterations(stabilized_iterations);

        match reason {
            TerminationReason::Converged => log::info!(
                "[StabBB] Converged by gradient: iters={}, f={:.6e}, ||g||={:.3e}, fe={}, ge={}, stabilized={}",
                iterations,
                Scalar::to_f64(result.value),
                Scalar::to_f64(result.gradient_norm),
                function_evaluations,
                gradient_evaluations,
                stabilized_iterations
            ),
            TerminationReason::MaxIterations => log::info!(
                "[StabBB] Iteration limit reached: iters={}, best ||g||={:.3e} at iter {}",
                iterations,
                Scalar::to_f64(result.gradient_norm),
                result.best_iteration
            ),
            TerminationReason::Degenerate(cause) => log::warn!(
                "[StabBB] Degenerate termination ({}) at iter {}; returning best iterate from iter {}",
                cause,
                iterations,
                result.best_iteration
            ),
        }

        Ok(result)
    }
}

/// Minimizes an objective given separately from its gradient.
///
/// This is the primary entry point: `objective` maps x ↦ f(x), `gradient`
/// maps x ↦ ∇f(x). Closures need their argument type annotated.
///
/// # Example
///
/// ```
/// use stabbb_core::types::DVector;
/// use stabbb_optim::{minimize, StabilizedBBConfig};
///
/// let x0 = DVector::from_vec(vec![10.0]);
/// let result = minimize(
///     &x0,
///     |x: &DVector<f64>| x[0] * x[0],
///     |x: &DVector<f64>| DVector::from_vec(vec![2.0 * x[0]]),
///     StabilizedBBConfig::default(),
/// )
/// .unwrap();
///
/// assert!(result.converged);
/// assert!(result.point[0].abs() < 1e-5);
/// ```
pub fn minimize<T, F, G>(
    initial_point: &DVector<T>,
    objective: F,
    gradient: G,
    config: StabilizedBBConfig<T>,
) -> OptimizerResult<OptimizationResult<T>>
where
    T: Scalar,
    F: Evaluator<T>,
    G: GradientEvaluator<T>,
{
    StabilizedBB::new(config).optimize(&EvaluatorPair::new(objective, gradient), initial_point)
}

/// [`minimize`] with a per-iteration callback.
pub fn minimize_with_callback<T, F, G, Cb>(
    initial_point: &DVector<T>,
    objective: F,
    gradient: G,
    config: StabilizedBBConfig<T>,
    callback: &mut Cb,
) -> OptimizerResult<OptimizationResult<T>>
where
    T: Scalar,
    F: Evaluator<T>,
    G: GradientEvaluator<T>,
    Cb: OptimizationCallback<T> + ?Sized,
{
    StabilizedBB::new(config).optimize_with_callback(
        &EvaluatorPair::new(objective, gradient),
        initial_point,
        callback,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use stabbb_core::cost_function::QuadraticCost;
    use stabbb_core::callback::HistoryRecorder;

    #[test]
    fn test_config_builder() {
        let config = StabilizedBBConfig::<f64>::new()
            .with_gradient_tolerance(1e-8)
            .with_max_iterations(50)
            .with_short_step()
            .with_initial_step_size(0.01)
            .with_initial_radius(0.5)
            .with_radius_growth_factor(3.0)
            .with_max_radius(10.0);

        assert_eq!(config.gradient_tolerance, 1e-8);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.variant, BBVariant::Short);
        assert_eq!(config.initial_step_size, InitialStepSize::Fixed(0.01));
        assert_eq!(config.radius.growth_factor, 3.0);
        assert_eq!(config.radius.max_radius, 10.0);
        assert!(config.validate().is_ok());

        let criterion = config.stopping_criterion();
        assert_eq!(criterion.max_iterations, 50);
    }

    #[test]
    fn test_config_validation() {
        let bad = [
            StabilizedBBConfig::<f64>::new().with_gradient_tolerance(-1.0),
            StabilizedBBConfig::<f64>::new().with_gradient_tolerance(f64::NAN),
            StabilizedBBConfig::<f64>::new().with_initial_step_size(0.0),
            StabilizedBBConfig::<f64>::new().with_radius_growth_factor(0.5),
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn test_invalid_configuration_is_reported_by_optimize() {
        let optimizer =
            StabilizedBB::new(StabilizedBBConfig::<f64>::new().with_max_radius(-1.0));
        let cost = QuadraticCost::<f64>::simple(2);
        let err = optimizer
            .optimize(&cost, &DVector::from_vec(vec![1.0, 1.0]))
            .unwrap_err();
        assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_simple_quadratic() {
        // f(x) = ½‖x‖²: α₀ = min(1, 1/‖g₀‖) and α₁ = 1 lands exactly on 0.
        let optimizer = StabilizedBB::<f64>::default();
        let cost = QuadraticCost::simple(3);
        let x0 = DVector::from_vec(vec![1.0, -2.0, 0.5]);

        let result = optimizer.optimize(&cost, &x0).unwrap();
        assert!(result.converged);
        assert!(result.point.norm() < 1e-10);
        assert_eq!(result.iterations, 2);
        assert_eq!(result.gradient_evaluations, 3);
        assert_eq!(result.function_evaluations, 1);
    }

    #[test]
    fn test_records_match_result() {
        let optimizer = StabilizedBB::<f64>::default();
        let cost = QuadraticCost::diagonal(DVector::from_vec(vec![1.0, 10.0]));
        let x0 = DVector::from_vec(vec![5.0, 5.0]);

        let mut recorder = HistoryRecorder::new();
        let result = optimizer
            .optimize_with_callback(&cost, &x0, &mut recorder)
            .unwrap();

        assert_eq!(recorder.len(), result.iterations);
        let last = recorder.records().last().unwrap();
        assert_eq!(last.iteration, result.iterations);
        assert_relative_eq!(last.gradient_norm, result.gradient_norm);
        // Converged on the first iterate under tolerance, so it is the best one.
        assert_eq!(last.point, result.point);
    }

    #[test]
    fn test_name() {
        assert!(StabilizedBB::<f64>::default().name().contains("long"));
        let short = StabilizedBB::<f64>::new(StabilizedBBConfig::new().with_short_step());
        assert!(short.name().contains("short"));
    }
}

//! Step stabilization for the Barzilai–Borwein method.
//!
//! Unsafeguarded BB steps can be arbitrarily long on non-quadratic problems.
//! The stabilizer bounds the distance between consecutive iterates by an
//! adaptive radius Δₖ and adapts that radius from the step history, in the
//! spirit of a trust region without a model or an acceptance test.
//!
//! # Algorithm
//!
//! Given a candidate αₖ and the gradient gₖ:
//!
//! 1. tₖ = αₖ ‖gₖ‖ is the length of the candidate step
//! 2. tₖ ≤ Δₖ: the step is taken unchanged (a *free* step)
//! 3. tₖ > Δₖ: αₖ is replaced by Δₖ / ‖gₖ‖ so that ‖xₖ₊₁ − xₖ‖ = Δₖ
//!    (a *stabilized* step)
//!
//! A missing candidate (curvature violation) always yields the stabilized
//! step of norm Δₖ.
//!
//! # Radius Adaptation
//!
//! With [`RadiusStrategy::Adaptive`], after each step:
//!
//! - **Growth**: after `growth_patience` consecutive free steps, a free step
//!   that used at least `growth_activity` of the radius multiplies Δ by
//!   `growth_factor`, capped at `max_radius`
//! - **Shrink**: a stabilized step multiplies Δ by `shrink_factor` ∈ (0, 1]
//!   (1 keeps the radius unchanged)
//! - **Reseed**: once, at iteration `at_iteration`, Δ is reset to
//!   `factor · min(‖sₖ‖, …, ‖sₖ₋window₊₁‖)`, rescaling a heuristic Δ₀ to
//!   the step lengths the problem actually produces
//!
//! Δ is always kept inside [`Scalar::MIN_RADIUS`, `max_radius`], so it stays
//! finite and positive. Once the iterates settle, steps shrink below the
//! radius and the method reduces to plain BB.
//!
//! # References
//!
//! - Barzilai & Borwein, "Two-point step size gradient methods" (1988)
//! - Burdakov, Dai & Huang, "Stabilized Barzilai-Borwein method" (2019)

use approx::relative_eq;
use num_traits::Float;
use stabbb_core::{
    error::{OptimizerError, OptimizerResult},
    optimizer_state::OptimizerState,
    step_size::is_valid_step_size,
    types::{DVector, Scalar},
};

/// How Δ₀ is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InitialRadius<T> {
    /// Δ₀ = max(1, ‖x₀‖₂), capped at the radius ceiling.
    #[default]
    Auto,
    /// A caller-supplied Δ₀.
    Fixed(T),
}

/// How the radius evolves over the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RadiusStrategy {
    /// Grow on sustained free progress, shrink on stabilization, reseed once.
    #[default]
    Adaptive,
    /// Keep Δ₀ for the whole run.
    Constant,
}

/// One-time radius reset from recent step lengths.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadiusReseed<T> {
    /// Iteration count (after the step) at which the reset happens
    pub at_iteration: usize,
    /// Multiplier c in Δ = c · min ‖s‖
    pub factor: T,
    /// Number of most recent step norms considered
    pub window: usize,
}

impl<T: Scalar> Default for RadiusReseed<T> {
    fn default() -> Self {
        Self {
            at_iteration: 4,
            factor: <T as Scalar>::from_f64(0.2),
            window: 3,
        }
    }
}

/// Parameters of the stabilization radius.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RadiusConfig<T> {
    /// Initial radius Δ₀
    pub initial_radius: InitialRadius<T>,
    /// Adaptation strategy
    pub strategy: RadiusStrategy,
    /// Factor applied on growth (> 1, typically 2.0)
    pub growth_factor: T,
    /// Maximum radius
    pub max_radius: T,
    /// Consecutive free steps required before the radius may grow
    pub growth_patience: usize,
    /// Fraction of Δ a free step must use to trigger growth
    pub growth_activity: T,
    /// Factor applied after a stabilized step, in (0, 1]
    pub shrink_factor: T,
    /// Optional one-time reseed
    pub reseed: Option<RadiusReseed<T>>,
}

impl<T: Scalar> Default for RadiusConfig<T> {
    fn default() -> Self {
        Self {
            initial_radius: InitialRadius::Auto,
            strategy: RadiusStrategy::Adaptive,
            growth_factor: <T as Scalar>::from_f64(2.0),
            max_radius: T::DEFAULT_MAX_RADIUS,
            growth_patience: 3,
            growth_activity: <T as Scalar>::from_f64(0.5),
            shrink_factor: T::one(),
            reseed: Some(RadiusReseed::default()),
        }
    }
}

impl<T: Scalar> RadiusConfig<T> {
    /// Creates a new configuration with default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// A radius fixed at `radius` for the whole run.
    pub fn constant(radius: T) -> Self {
        Self {
            initial_radius: InitialRadius::Fixed(radius),
            strategy: RadiusStrategy::Constant,
            reseed: None,
            ..Self::default()
        }
    }

    /// Sets the initial radius.
    pub fn with_initial_radius(mut self, radius: T) -> Self {
        self.initial_radius = InitialRadius::Fixed(radius);
        self
    }

    /// Sets the adaptation strategy.
    pub fn with_strategy(mut self, strategy: RadiusStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the growth factor.
    pub fn with_growth_factor(mut self, factor: T) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Sets the maximum radius.
    pub fn with_max_radius(mut self, radius: T) -> Self {
        self.max_radius = radius;
        self
    }

    /// Sets how many consecutive free steps precede growth.
    pub fn with_growth_patience(mut self, patience: usize) -> Self {
        self.growth_patience = patience;
        self
    }

    /// Sets the fraction of the radius a free step must use to trigger growth.
    pub fn with_growth_activity(mut self, fraction: T) -> Self {
        self.growth_activity = fraction;
        self
    }

    /// Sets the shrink factor applied after stabilized steps.
    pub fn with_shrink_factor(mut self, factor: T) -> Self {
        self.shrink_factor = factor;
        self
    }

    /// Sets the one-time reseed.
    pub fn with_reseed(mut self, reseed: RadiusReseed<T>) -> Self {
        self.reseed = Some(reseed);
        self
    }

    /// Disables the reseed.
    pub fn without_reseed(mut self) -> Self {
        self.reseed = None;
        self
    }

    /// Checks every parameter.
    pub fn validate(&self) -> OptimizerResult<()> {
        let finite = |v: T| <T as Float>::is_finite(v);

        if !finite(self.max_radius) || self.max_radius < T::MIN_RADIUS {
            return Err(invalid(
                "maximum radius must be finite and positive",
                "max_radius",
                self.max_radius,
            ));
        }
        if let InitialRadius::Fixed(radius) = self.initial_radius {
            if !finite(radius) || radius < T::MIN_RADIUS || radius > self.max_radius {
                return Err(invalid(
                    "initial radius must be positive and at most the maximum radius",
                    "initial_radius",
                    radius,
                ));
            }
        }
        if !finite(self.growth_factor) || self.growth_factor <= T::one() {
            return Err(invalid(
                "growth factor must be finite and greater than one",
                "growth_factor",
                self.growth_factor,
            ));
        }
        if !(self.shrink_factor > T::zero() && self.shrink_factor <= T::one()) {
            return Err(invalid(
                "shrink factor must lie in (0, 1]",
                "shrink_factor",
                self.shrink_factor,
            ));
        }
        if !(self.growth_activity >= T::zero() && self.growth_activity <= T::one()) {
            return Err(invalid(
                "growth activity must lie in [0, 1]",
                "growth_activity",
                self.growth_activity,
            ));
        }
        if self.growth_patience == 0 {
            return Err(OptimizerError::invalid_configuration(
                "growth patience must be at least one",
                "growth_patience",
                "0",
            ));
        }
        if let Some(reseed) = self.reseed {
            if !is_valid_step_size(reseed.factor) {
                return Err(invalid(
                    "reseed factor must be finite and positive",
                    "reseed.factor",
                    reseed.factor,
                ));
            }
            if reseed.window == 0 || reseed.at_iteration < reseed.window {
                return Err(OptimizerError::invalid_configuration(
                    "reseed window must be non-empty and fit before the reseed iteration",
                    "reseed.window",
                    reseed.window.to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn invalid<T: Scalar>(reason: &str, parameter: &str, value: T) -> OptimizerError {
    OptimizerError::invalid_configuration(reason, parameter, value.to_string())
}

/// A step after stabilization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizedStep<T> {
    /// Effective step size, always finite and positive for a finite nonzero gradient
    pub step_size: T,
    /// ‖xₖ₊₁ − xₖ‖ = step_size · ‖gₖ‖
    pub step_norm: T,
    /// Radius Δₖ the step was measured against
    pub radius: T,
    /// Whether the candidate was replaced by the radius step
    pub stabilized: bool,
}

impl<T: Scalar> StabilizedStep<T> {
    /// Whether the step ends on the boundary of the radius.
    pub fn on_boundary(&self) -> bool {
        relative_eq!(
            self.step_norm,
            self.radius,
            epsilon = T::EPSILON,
            max_relative = <T as Scalar>::from_f64(1e3) * T::EPSILON
        )
    }
}

/// What the radius adaptation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RadiusChange {
    /// Δ kept its value
    Unchanged,
    /// Δ was multiplied by the growth factor (possibly capped)
    Grown,
    /// Δ was multiplied by the shrink factor
    Shrunk,
    /// Δ was reset from recent step norms
    Reseeded,
}

/// Caps BB steps to the stabilization radius and adapts the radius.
#[derive(Debug, Clone)]
pub struct Stabilizer<T: Scalar> {
    config: RadiusConfig<T>,
}

impl<T: Scalar> Stabilizer<T> {
    /// Creates a stabilizer from a radius configuration.
    pub fn new(config: RadiusConfig<T>) -> Self {
        Self { config }
    }

    /// The radius configuration.
    pub fn config(&self) -> &RadiusConfig<T> {
        &self.config
    }

    /// Δ₀ for the initial point `x0`.
    pub fn initial_radius(&self, x0: &DVector<T>) -> T {
        let radius = match self.config.initial_radius {
            InitialRadius::Fixed(radius) => radius,
            InitialRadius::Auto => <T as Float>::max(T::one(), x0.norm()),
        };
        self.clamp(radius)
    }

    /// Applies the radius bound to a candidate step size.
    ///
    /// `candidate` is `None` when no usable step size exists; the result is
    /// then the step of norm exactly `radius`.
    pub fn stabilize(&self, candidate: Option<T>, gradient_norm: T, radius: T) -> StabilizedStep<T> {
        if let Some(alpha) = candidate.filter(|alpha| is_valid_step_size(*alpha)) {
            let step_norm = alpha * gradient_norm;
            if step_norm <= radius {
                return StabilizedStep {
                    step_size: alpha,
                    step_norm,
                    radius,
                    stabilized: false,
                };
            }
        }

        StabilizedStep {
            step_size: radius / gradient_norm,
            step_norm: radius,
            radius,
            stabilized: true,
        }
    }

    /// Updates `state.radius` after the step `step` has been applied to `state`.
    pub fn adapt_radius(
        &self,
        state: &mut OptimizerState<T>,
        step: &StabilizedStep<T>,
    ) -> RadiusChange {
        if self.config.strategy == RadiusStrategy::Constant {
            return RadiusChange::Unchanged;
        }

        let mut change = RadiusChange::Unchanged;

        if step.stabilized {
            if self.config.shrink_factor < T::one() {
                state.radius = self.clamp(state.radius * self.config.shrink_factor);
                change = RadiusChange::Shrunk;
            }
        } else if state.consecutive_free >= self.config.growth_patience
            && step.step_norm >= self.config.growth_activity * step.radius
            && state.radius < self.config.max_radius
        {
            state.radius = self.clamp(state.radius * self.config.growth_factor);
            change = RadiusChange::Grown;
        }

        if let Some(reseed) = self.config.reseed {
            if state.iteration == reseed.at_iteration {
                if let Some(min_step) = state.min_recent_step_norm(reseed.window) {
                    let candidate = reseed.factor * min_step;
                    if is_valid_step_size(candidate) {
                        state.radius = self.clamp(candidate);
                        change = RadiusChange::Reseeded;
                    }
                }
            }
        }

        change
    }

    fn clamp(&self, radius: T) -> T {
        <T as Float>::min(
            <T as Float>::max(radius, T::MIN_RADIUS),
            self.config.max_radius,
        )
    }
}

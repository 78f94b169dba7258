//! Callback support for optimization algorithms.
//!
//! Callbacks observe the iteration; they cannot steer it. Each completed
//! iteration produces one [`IterationSnapshot`], handed to the callback
//! after the step has been taken and the radius adapted. The snapshot
//! borrows the iterate from the optimizer; callbacks that keep history
//! copy it into an owned [`IterationRecord`].

use crate::core::types::{DVector, Scalar};
use crate::optimization::optimizer::OptimizationResult;

/// View of one completed iteration k → k+1.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IterationSnapshot<'a, T: Scalar> {
    /// Iteration count after the step (k + 1)
    pub iteration: usize,

    /// The new iterate xₖ₊₁
    pub point: &'a DVector<T>,

    /// ‖gₖ₊₁‖ at the new iterate
    pub gradient_norm: T,

    /// Effective step size αₖ actually applied along −gₖ
    pub step_size: T,

    /// Realized step norm ‖xₖ₊₁ − xₖ‖ = αₖ ‖gₖ‖
    pub step_norm: T,

    /// Radius Δₖ that bounded this step
    pub radius: T,

    /// Radius Δₖ₊₁ after adaptation
    pub next_radius: T,

    /// Whether the step was capped to the radius
    pub stabilized: bool,

    /// Whether the secant pair of this iteration violated the curvature condition
    pub curvature_violated: bool,
}

impl<T: Scalar> IterationSnapshot<'_, T> {
    /// Copies the snapshot, iterate included, into an owned record.
    pub fn to_record(&self) -> IterationRecord<T> {
        IterationRecord {
            iteration: self.iteration,
            point: self.point.clone(),
            gradient_norm: self.gradient_norm,
            step_size: self.step_size,
            step_norm: self.step_norm,
            radius: self.radius,
            next_radius: self.next_radius,
            stabilized: self.stabilized,
            curvature_violated: self.curvature_violated,
        }
    }
}

/// Owned copy of an [`IterationSnapshot`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IterationRecord<T: Scalar> {
    /// Iteration count after the step (k + 1)
    pub iteration: usize,
    /// The new iterate xₖ₊₁
    pub point: DVector<T>,
    /// ‖gₖ₊₁‖ at the new iterate
    pub gradient_norm: T,
    /// Effective step size αₖ
    pub step_size: T,
    /// Realized step norm ‖xₖ₊₁ − xₖ‖
    pub step_norm: T,
    /// Radius Δₖ that bounded this step
    pub radius: T,
    /// Radius Δₖ₊₁ after adaptation
    pub next_radius: T,
    /// Whether the step was capped to the radius
    pub stabilized: bool,
    /// Whether the curvature condition was violated
    pub curvature_violated: bool,
}

/// Trait for optimization callbacks.
///
/// Callbacks allow monitoring the optimization process for logging,
/// visualization or history collection. They return nothing and cannot
/// alter control flow.
///
/// Closures `FnMut(&IterationSnapshot<'_, T>)` are callbacks.
pub trait OptimizationCallback<T: Scalar> {
    /// Called once before the first iteration with x₀ and ‖g₀‖.
    fn on_optimization_start(&mut self, initial_point: &DVector<T>, gradient_norm: T) {
        let _ = (initial_point, gradient_norm);
    }

    /// Called at the end of each iteration.
    fn on_iteration_end(&mut self, snapshot: &IterationSnapshot<'_, T>);

    /// Called once with the final result.
    fn on_optimization_end(&mut self, result: &OptimizationResult<T>) {
        let _ = result;
    }
}

impl<T, F> OptimizationCallback<T> for F
where
    T: Scalar,
    F: FnMut(&IterationSnapshot<'_, T>),
{
    fn on_iteration_end(&mut self, snapshot: &IterationSnapshot<'_, T>) {
        self(snapshot);
    }
}

/// A no-op callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T: Scalar> OptimizationCallback<T> for NoOpCallback {
    fn on_iteration_end(&mut self, _snapshot: &IterationSnapshot<'_, T>) {}
}

/// Collects an owned record of every iteration.
#[derive(Debug, Clone, Default)]
pub struct HistoryRecorder<T: Scalar> {
    records: Vec<IterationRecord<T>>,
}

impl<T: Scalar> HistoryRecorder<T> {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Recorded iterations in order.
    pub fn records(&self) -> &[IterationRecord<T>] {
        &self.records
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Step sizes αₖ in iteration order.
    pub fn step_sizes(&self) -> Vec<T> {
        self.records.iter().map(|s| s.step_size).collect()
    }

    /// Gradient norms ‖gₖ₊₁‖ in iteration order.
    pub fn gradient_norms(&self) -> Vec<T> {
        self.records.iter().map(|s| s.gradient_norm).collect()
    }

    /// Consumes the recorder, returning the records.
    pub fn into_records(self) -> Vec<IterationRecord<T>> {
        self.records
    }
}

impl<T: Scalar> OptimizationCallback<T> for HistoryRecorder<T> {
    fn on_optimization_start(&mut self, _initial_point: &DVector<T>, _gradient_norm: T) {
        self.records.clear();
    }

    fn on_iteration_end(&mut self, snapshot: &IterationSnapshot<'_, T>) {
        self.records.push(snapshot.to_record());
    }
}

/// A callback that logs progress through the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LoggingCallback {
    log_every: usize,
}

impl LoggingCallback {
    /// Logs every `log_every` iterations (at least every iteration).
    pub fn new(log_every: usize) -> Self {
        Self {
            log_every: log_every.max(1),
        }
    }
}

impl<T: Scalar> OptimizationCallback<T> for LoggingCallback {
    fn on_optimization_start(&mut self, initial_point: &DVector<T>, gradient_norm: T) {
        log::info!(
            "Starting optimization: n={}, |g0|={:.3e}",
            initial_point.len(),
            Scalar::to_f64(gradient_norm)
        );
    }

    fn on_iteration_end(&mut self, snapshot: &IterationSnapshot<'_, T>) {
        if snapshot.iteration % self.log_every == 0 {
            log::info!(
                "Iteration {}: |g|={:.3e}, alpha={:.3e}, radius={:.3e}{}",
                snapshot.iteration,
                Scalar::to_f64(snapshot.gradient_norm),
                Scalar::to_f64(snapshot.step_size),
                Scalar::to_f64(snapshot.next_radius),
                if snapshot.stabilized { " (stabilized)" } else { "" }
            );
        }
    }

    fn on_optimization_end(&mut self, result: &OptimizationResult<T>) {
        log::info!(
            "Optimization complete after {} iterations ({}): f={:.6e}, |g|={:.3e}",
            result.iterations,
            result.termination_reason,
            Scalar::to_f64(result.value),
            Scalar::to_f64(result.gradient_norm)
        );
    }
}

//! Core traits and types for stabilized Barzilai–Borwein optimization.
//!
//! This crate provides the building blocks of the stabilized BB iteration
//! xₖ₊₁ = xₖ − αₖ gₖ: evaluator traits for the objective and its gradient,
//! the Barzilai–Borwein step size selector, the running optimizer state,
//! the convergence checker and the result and callback types. The
//! stabilizer and the driver loop live in `stabbb-optim`.
//!
//! # Key Concepts
//!
//! - **Secant pair**: sₖ = xₖ − xₖ₋₁ and yₖ = gₖ − gₖ₋₁
//! - **BB step size**: αₖ from sₖ and yₖ, with no line search
//! - **Stabilization radius**: an adaptive bound Δₖ on ‖xₖ₊₁ − xₖ‖
//! - **Best iterate**: the iterate with the smallest observed gradient norm
//!
//! # Modules
//!
//! - [`core::cost_function`]: Evaluator traits and reference cost functions
//! - [`core::error`]: Error types for evaluators and the optimizer
//! - [`core::types`]: Scalar trait with its numerical constants, vector aliases
//! - [`optimization::step_size`]: Barzilai–Borwein step size selection
//! - [`optimization::optimizer_state`]: Running state of the iteration
//! - [`optimization::optimizer`]: Termination policy and results
//! - [`optimization::callback`]: Per-iteration observation hooks

pub mod core;
pub mod optimization;
pub mod utils;

// Re-export commonly used items at the crate root
pub use crate::core::error::{
    EvaluationError, EvaluationResult, EvaluatorKind, OptimizerError, OptimizerResult,
};
pub use crate::core::{cost_function, error, types};
pub use crate::optimization::{callback, optimizer, optimizer_state, step_size};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use stabbb_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::cost_function::{
        CostFunction, CountingCostFunction, DerivativeChecker, Evaluator, EvaluatorPair,
        GradientEvaluator, QuadraticCost,
    };
    pub use crate::core::error::{
        EvaluationError, EvaluationResult, EvaluatorKind, OptimizerError, OptimizerResult,
    };
    pub use crate::core::types::{DMatrix, DVector, Scalar};
    pub use crate::optimization::callback::{
        HistoryRecorder, IterationRecord, IterationSnapshot, LoggingCallback, NoOpCallback,
        OptimizationCallback,
    };
    pub use crate::optimization::optimizer::{
        ConvergenceChecker, DegeneracyCause, OptimizationResult, StoppingCriterion,
        TerminationReason,
    };
    pub use crate::optimization::optimizer_state::{BestIterate, OptimizerState};
    pub use crate::optimization::step_size::{
        BBVariant, CurvatureFallback, InitialStepSize, StepSizeCandidate, StepSizeSelector,
    };
}

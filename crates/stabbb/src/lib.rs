//! # stabbb
//!
//! Unconstrained minimization of smooth functions with the stabilized
//! Barzilai–Borwein gradient method.
//!
//! The iteration is plain gradient descent xₖ₊₁ = xₖ − αₖ gₖ whose step
//! size αₖ comes from the last secant pair, with the step length bounded by
//! an adaptive radius. Only the gradient is needed to iterate; the objective
//! is evaluated for the final report.
//!
//! ## Quick Start
//!
//! ```rust
//! use stabbb::prelude::*;
//!
//! // f(x) = (x₀ − 1)² + 10 (x₁ + 2)²
//! let objective = |x: &DVector<f64>| (x[0] - 1.0).powi(2) + 10.0 * (x[1] + 2.0).powi(2);
//! let gradient = |x: &DVector<f64>| {
//!     DVector::from_vec(vec![2.0 * (x[0] - 1.0), 20.0 * (x[1] + 2.0)])
//! };
//!
//! let x0 = DVector::from_vec(vec![0.0, 0.0]);
//! let result = minimize(&x0, objective, gradient, StabilizedBBConfig::default())?;
//!
//! assert!(result.converged);
//! assert!((result.point[0] - 1.0).abs() < 1e-5);
//! assert!((result.point[1] + 2.0).abs() < 1e-5);
//! # Ok::<(), stabbb::OptimizerError>(())
//! ```
//!
//! ## Crates
//!
//! - `stabbb-core`: evaluator traits, BB step sizes, state, results, callbacks
//! - `stabbb-optim`: the radius stabilizer and the optimizer loop

pub use stabbb_core as core;
pub use stabbb_optim as optim;

pub use nalgebra;

pub use stabbb_core::{
    EvaluationError, EvaluationResult, EvaluatorKind, OptimizerError, OptimizerResult,
};
pub use stabbb_optim::{minimize, minimize_with_callback, StabilizedBB, StabilizedBBConfig};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use stabbb_core::prelude::*;
    pub use stabbb_optim::{
        minimize, minimize_with_callback, InitialRadius, RadiusConfig, RadiusReseed,
        RadiusStrategy, StabilizedBB, StabilizedBBConfig,
    };
}

//! Stabilized Barzilai–Borwein optimization.
//!
//! This crate provides the radius stabilizer and the optimizer loop on top
//! of the building blocks in `stabbb-core`.
//!
//! # Available Components
//!
//! - **StabilizedBB**: the gradient method with BB step sizes and a step norm bound
//! - **Stabilizer**: caps steps to the radius Δ and adapts Δ between iterations
//! - **minimize**: one-call entry point taking an objective and a gradient
//!
//! # Examples
//!
//! ```rust
//! use stabbb_core::{cost_function::QuadraticCost, types::DVector};
//! use stabbb_optim::{StabilizedBB, StabilizedBBConfig};
//!
//! let cost_fn = QuadraticCost::<f64>::diagonal(DVector::from_vec(vec![1.0, 4.0, 9.0]));
//! let optimizer = StabilizedBB::new(
//!     StabilizedBBConfig::new()
//!         .with_gradient_tolerance(1e-8)
//!         .with_max_iterations(500),
//! );
//!
//! let result = optimizer
//!     .optimize(&cost_fn, &DVector::from_vec(vec![1.0, 1.0, 1.0]))
//!     .unwrap();
//! assert!(result.converged);
//! ```

pub mod stabilized_bb;
pub mod stabilizer;

pub use stabilized_bb::{minimize, minimize_with_callback, StabilizedBB, StabilizedBBConfig};
pub use stabilizer::{
    InitialRadius, RadiusChange, RadiusConfig, RadiusReseed, RadiusStrategy, StabilizedStep,
    Stabilizer,
};

// Re-export commonly used items from core
pub use stabbb_core::{
    optimizer::{OptimizationResult, TerminationReason},
    step_size::{BBVariant, CurvatureFallback, InitialStepSize},
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports() {
        let config = StabilizedBBConfig::<f64>::new()
            .with_variant(BBVariant::Short)
            .with_curvature_fallback(CurvatureFallback::SecantNormRatio)
            .with_radius_config(RadiusConfig::constant(0.5));
        let optimizer = StabilizedBB::new(config);
        assert_eq!(optimizer.config().radius.strategy, RadiusStrategy::Constant);
    }
}

//! Type definitions and aliases for stabilized Barzilai–Borwein optimization.
//!
//! This module provides the scalar trait the algorithms are generic over,
//! with its precision-dependent constants, and the vector aliases.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the necessary numeric traits required
/// by the optimizer. Because both [`RealField`] and [`Float`] provide
/// methods such as `sqrt`, `abs` or `is_finite`, call sites use the
/// fully-qualified form `<T as Float>::sqrt(x)`.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance for gradient norm convergence.
    const DEFAULT_GRADIENT_TOLERANCE: Self;

    /// Relative threshold below which sᵀy counts as numerically zero.
    const CURVATURE_TOLERANCE: Self;

    /// Smallest stabilization radius the optimizer will ever use.
    const MIN_RADIUS: Self;

    /// Default upper bound on the stabilization radius.
    const DEFAULT_MAX_RADIUS: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-5;
    const CURVATURE_TOLERANCE: Self = f32::EPSILON;
    const MIN_RADIUS: Self = 1e-30;
    const DEFAULT_MAX_RADIUS: Self = 1e6;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_GRADIENT_TOLERANCE: Self = 1e-5;
    const CURVATURE_TOLERANCE: Self = 1e-16;
    const MIN_RADIUS: Self = 1e-200;
    const DEFAULT_MAX_RADIUS: Self = 1e6;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Returns true when every component of `v` is finite.
pub fn is_finite_vector<T: Scalar>(v: &DVector<T>) -> bool {
    v.iter().all(|x| <T as Float>::is_finite(*x))
}

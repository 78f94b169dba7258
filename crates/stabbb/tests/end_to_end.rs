//! End-to-end usage through the facade crate

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use stabbb::core::utils::test_problems::{Rosenbrock, ROSENBROCK_5_START};
use stabbb::prelude::*;

#[test]
fn test_minimize_with_logging_callback() {
    let cost_fn = Rosenbrock::new(5);
    let x0 = DVector::from_column_slice(&ROSENBROCK_5_START);

    let mut callback = LoggingCallback::new(50);
    let result = StabilizedBB::<f64>::default()
        .optimize_with_callback(&cost_fn, &x0, &mut callback)
        .unwrap();

    assert!(result.termination_reason.is_converged());
    assert_relative_eq!(result.point, cost_fn.minimizer(), epsilon = 1e-3);
}

#[test]
fn test_counts_match_evaluations() {
    let cost_fn = CountingCostFunction::new(QuadraticCost::<f64>::diagonal(DVector::from_vec(
        vec![1.0, 2.0, 4.0, 8.0],
    )));
    let x0 = DVector::from_element(4, 3.0);

    let result = StabilizedBB::<f64>::default().optimize(&cost_fn, &x0).unwrap();

    let (cost_calls, gradient_calls) = cost_fn.counts();
    assert_eq!(result.function_evaluations, cost_calls);
    assert_eq!(result.gradient_evaluations, gradient_calls);
    // One gradient per iterate, x₀ included.
    assert_eq!(gradient_calls, result.iterations + 1);
    assert_eq!(cost_calls, 1);
}

#[test]
fn test_custom_radius_configuration() {
    let radius = RadiusConfig::new()
        .with_initial_radius(0.25)
        .with_growth_factor(1.5)
        .with_max_radius(4.0)
        .without_reseed();
    let config = StabilizedBBConfig::new().with_radius_config(radius);

    let mut max_radius = 0.0_f64;
    let mut callback = |s: &IterationSnapshot<'_, f64>| {
        max_radius = max_radius.max(s.next_radius);
    };
    let result = minimize_with_callback(
        &DVector::from_vec(vec![20.0, -20.0]),
        |x: &DVector<f64>| x.norm_squared(),
        |x: &DVector<f64>| x * 2.0,
        config,
        &mut callback,
    )
    .unwrap();

    assert!(result.converged);
    assert!(result.stabilized_iterations > 0);
    assert!(max_radius <= 4.0);
}

#[test]
fn test_reexported_nalgebra_vectors() {
    let x0 = stabbb::nalgebra::DVector::from_vec(vec![3.0_f64, -1.0]);
    let result = minimize(
        &x0,
        |x: &stabbb::nalgebra::DVector<f64>| x.norm_squared(),
        |x: &stabbb::nalgebra::DVector<f64>| x * 2.0,
        StabilizedBBConfig::default(),
    )
    .unwrap();

    assert!(result.converged);
    assert!(result.point.amax() < 1e-5);
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_round_trip() {
    let config = StabilizedBBConfig::<f64>::new().with_short_step().with_max_iterations(42);
    let json = serde_json::to_string(&config).unwrap();
    let restored: StabilizedBBConfig<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(config, restored);

    let result = minimize(
        &DVector::from_vec(vec![2.0]),
        |x: &DVector<f64>| x[0] * x[0],
        |x: &DVector<f64>| x * 2.0,
        config,
    )
    .unwrap();
    let json = serde_json::to_string(&result).unwrap();
    let restored: OptimizationResult<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(result, restored);
}

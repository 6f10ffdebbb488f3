use std::f64::consts::PI;

use compound_bond::geometry::{
    Geometry, angle, angle_gradient, dihedral, dihedral_gradient, distance, distance_gradient,
};
use glam::DVec3;

const EPS: f64 = 1e-10;

fn assert_approx_eq(actual: f64, expected: f64, tol: f64, msg: &str) {
    let diff = (actual - expected).abs();
    assert!(
        diff < tol,
        "{msg}: expected {expected}, got {actual} (diff={diff}, tol={tol})"
    );
}

fn assert_vec_approx_eq(actual: DVec3, expected: DVec3, tol: f64, msg: &str) {
    assert!(
        (actual - expected).abs().max_element() < tol,
        "{msg}: expected {expected}, got {actual}"
    );
}

/// Central-difference gradient of `f` with respect to point `which`.
fn numerical_gradient<F>(points: &[DVec3], which: usize, f: F) -> DVec3
where
    F: Fn(&[DVec3]) -> f64,
{
    let h = 1e-6;
    let mut grad = DVec3::ZERO;
    for axis in 0..3 {
        let mut plus = points.to_vec();
        let mut minus = points.to_vec();
        plus[which][axis] += h;
        minus[which][axis] -= h;
        grad[axis] = (f(&plus) - f(&minus)) / (2.0 * h);
    }
    grad
}

// ============================================================================
// Distance
// ============================================================================

#[test]
fn test_distance_value_and_symmetry() {
    let a = DVec3::new(1.0, 2.0, 3.0);
    let b = DVec3::new(4.0, 6.0, 3.0);
    assert_approx_eq(distance(a, b), 5.0, 1e-12, "3-4-5 triangle");
    assert_eq!(distance(a, b), distance(b, a));
}

#[test]
fn test_distance_gradient() {
    let a = DVec3::ZERO;
    let b = DVec3::new(1.0, 0.0, 0.0);
    let [ga, gb] = distance_gradient(a, b, EPS);
    assert_vec_approx_eq(ga, DVec3::new(-1.0, 0.0, 0.0), 1e-12, "grad a");
    assert_vec_approx_eq(gb, DVec3::new(1.0, 0.0, 0.0), 1e-12, "grad b");
}

#[test]
fn test_distance_coincident_points() {
    let p = DVec3::new(0.5, 0.5, 0.5);
    assert_eq!(distance(p, p), 0.0);
    let [ga, gb] = distance_gradient(p, p, EPS);
    assert_eq!(ga, DVec3::ZERO);
    assert_eq!(gb, DVec3::ZERO);
}

// ============================================================================
// Angle
// ============================================================================

#[test]
fn test_right_angle() {
    let theta = angle(DVec3::X, DVec3::ZERO, DVec3::Y, EPS);
    assert_approx_eq(theta, PI / 2.0, 1e-12, "right angle");
}

#[test]
fn test_straight_angle_is_finite() {
    let theta = angle(DVec3::X, DVec3::ZERO, -DVec3::X, EPS);
    assert_approx_eq(theta, PI, 1e-12, "straight angle");
    for g in angle_gradient(DVec3::X, DVec3::ZERO, -DVec3::X, EPS) {
        assert!(g.is_finite(), "gradient {g}");
    }
}

#[test]
fn test_angle_with_coincident_points_is_finite() {
    let theta = angle(DVec3::ZERO, DVec3::ZERO, DVec3::Y, EPS);
    assert!(theta.is_finite());
    for g in angle_gradient(DVec3::ZERO, DVec3::ZERO, DVec3::Y, EPS) {
        assert!(g.is_finite(), "gradient {g}");
    }
}

#[test]
fn test_angle_gradient_matches_finite_difference() {
    let points = [
        DVec3::new(1.2, 0.1, -0.3),
        DVec3::new(0.0, 0.2, 0.1),
        DVec3::new(-0.4, 1.1, 0.5),
    ];
    let analytic = angle_gradient(points[0], points[1], points[2], EPS);
    for (i, g) in analytic.iter().enumerate() {
        let numeric = numerical_gradient(&points, i, |p| angle(p[0], p[1], p[2], EPS));
        assert_vec_approx_eq(*g, numeric, 1e-6, &format!("angle gradient, point {i}"));
    }
}

// ============================================================================
// Dihedral
// ============================================================================

#[test]
fn test_dihedral_cis_and_trans() {
    let a = DVec3::new(1.0, 0.0, 0.0);
    let b = DVec3::ZERO;
    let c = DVec3::new(0.0, 1.0, 0.0);

    let cis = dihedral(a, b, c, DVec3::new(1.0, 1.0, 0.0), EPS);
    assert_approx_eq(cis, 0.0, 1e-12, "cis");

    let trans = dihedral(a, b, c, DVec3::new(-1.0, 1.0, 0.0), EPS);
    assert_approx_eq(trans, PI, 1e-12, "trans");
}

#[test]
fn test_dihedral_perpendicular() {
    let phi = dihedral(
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::ZERO,
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(0.0, 1.0, 1.0),
        EPS,
    );
    assert_approx_eq(phi.abs(), PI / 2.0, 1e-12, "perpendicular");
}

#[test]
fn test_dihedral_range() {
    // Rotate the last point around the central axis through a full turn.
    for step in 0..36 {
        let t = step as f64 * 10.0_f64.to_radians();
        let d = DVec3::new(t.cos(), 1.0, t.sin());
        let phi = dihedral(DVec3::X, DVec3::ZERO, DVec3::Y, d, EPS);
        assert!(phi > -PI && phi <= PI, "phi = {phi}");
    }
}

#[test]
fn test_dihedral_gradient_matches_finite_difference() {
    let points = [
        DVec3::new(1.1, -0.2, 0.3),
        DVec3::new(0.0, 0.1, 0.0),
        DVec3::new(0.2, 1.3, -0.1),
        DVec3::new(-0.7, 1.5, 0.9),
    ];
    let analytic = dihedral_gradient(points[0], points[1], points[2], points[3], EPS);
    for (i, g) in analytic.iter().enumerate() {
        let numeric = numerical_gradient(&points, i, |p| dihedral(p[0], p[1], p[2], p[3], EPS));
        assert_vec_approx_eq(*g, numeric, 1e-6, &format!("dihedral gradient, point {i}"));
    }
}

#[test]
fn test_dihedral_colinear_is_finite() {
    let phi = dihedral(DVec3::ZERO, DVec3::X, 2.0 * DVec3::X, 3.0 * DVec3::X, EPS);
    assert!(phi.is_finite());
    for g in dihedral_gradient(DVec3::ZERO, DVec3::X, 2.0 * DVec3::X, 3.0 * DVec3::X, EPS) {
        assert!(g.is_finite(), "gradient {g}");
    }
}

// ============================================================================
// Combined evaluation
// ============================================================================

#[test]
fn test_geometry_evaluate_matches_free_functions() {
    let points = [
        DVec3::new(1.1, -0.2, 0.3),
        DVec3::new(0.0, 0.1, 0.0),
        DVec3::new(0.2, 1.3, -0.1),
        DVec3::new(-0.7, 1.5, 0.9),
    ];
    let [a, b, c, d] = points;

    let dist = Geometry::Distance([2, 0]).evaluate(&points, EPS);
    assert_eq!(dist.value, distance(c, a));
    assert_eq!(dist.gradient[..2], distance_gradient(c, a, EPS));
    assert_eq!(dist.gradient[2..], [DVec3::ZERO; 2]);

    let theta = Geometry::Angle([0, 1, 2]).evaluate(&points, EPS);
    assert_eq!(theta.value, angle(a, b, c, EPS));
    assert_eq!(theta.gradient[..3], angle_gradient(a, b, c, EPS));
    assert_eq!(theta.gradient[3], DVec3::ZERO);

    let phi = Geometry::Dihedral([0, 1, 2, 3]).evaluate(&points, EPS);
    assert_eq!(phi.value, dihedral(a, b, c, d, EPS));
    assert_eq!(phi.gradient, dihedral_gradient(a, b, c, d, EPS));
}

// Derived geometry functions and their analytical gradients.
//
// Each function is paired with a gradient routine returning dValue/dr for every
// particle it references, in argument order. Degenerate configurations
// (coincident points, zero-length legs, colinear dihedral atoms) are guarded so
// that values and gradients stay finite.
//
// Angle gradients follow the chain rule dTheta/dx = -(1/sinTheta) * dCos/dx used
// for UFF angle bending; dihedral gradients use the Blondel-Karplus formulation
// (J. Comput. Chem. 17, 1132 (1996)).

use glam::DVec3;
use std::f64::consts::PI;

/// Lower bound for sin(theta) when converting dCos/dx into dTheta/dx.
const MIN_SIN_THETA: f64 = 1e-8;

/// A derived-geometry call with its arguments resolved to bond-local particle slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Geometry {
    Distance([usize; 2]),
    Angle([usize; 3]),
    Dihedral([usize; 4]),
}

impl Geometry {
    pub fn name(&self) -> &'static str {
        match self {
            Geometry::Distance(_) => "distance",
            Geometry::Angle(_) => "angle",
            Geometry::Dihedral(_) => "dihedral",
        }
    }

    /// Bond-local particle indices, in argument order.
    pub fn particles(&self) -> &[usize] {
        match self {
            Geometry::Distance(p) => p,
            Geometry::Angle(p) => p,
            Geometry::Dihedral(p) => p,
        }
    }

    /// Value and gradient with respect to every argument particle, in
    /// argument order. Unused gradient slots are zero.
    #[inline]
    pub fn evaluate(&self, positions: &[DVec3], epsilon: f64) -> GeometryValue {
        let mut gradient = [DVec3::ZERO; 4];
        let value = match *self {
            Geometry::Distance([a, b]) => {
                let (pa, pb) = (positions[a], positions[b]);
                gradient[..2].copy_from_slice(&distance_gradient(pa, pb, epsilon));
                distance(pa, pb)
            }
            Geometry::Angle([a, b, c]) => {
                let (pa, pb, pc) = (positions[a], positions[b], positions[c]);
                gradient[..3].copy_from_slice(&angle_gradient(pa, pb, pc, epsilon));
                angle(pa, pb, pc, epsilon)
            }
            Geometry::Dihedral([a, b, c, d]) => {
                let (pa, pb, pc, pd) = (positions[a], positions[b], positions[c], positions[d]);
                gradient = dihedral_gradient(pa, pb, pc, pd, epsilon);
                dihedral(pa, pb, pc, pd, epsilon)
            }
        };
        GeometryValue { value, gradient }
    }
}

/// A geometry call evaluated for one bond.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryValue {
    pub value: f64,
    pub gradient: [DVec3; 4],
}

// ============================================================================
// Distance
// ============================================================================

/// `|a - b|`
#[inline]
pub fn distance(a: DVec3, b: DVec3) -> f64 {
    (a - b).length()
}

/// Gradient of `|a - b|` with respect to `a` and `b`.
///
/// dD/da = (a - b) / D, dD/db = -dD/da. Coincident points give a zero gradient.
#[inline]
pub fn distance_gradient(a: DVec3, b: DVec3, epsilon: f64) -> [DVec3; 2] {
    let delta = a - b;
    let dist = delta.length().max(epsilon);
    let grad = delta / dist;
    [grad, -grad]
}

// ============================================================================
// Angle
// ============================================================================

/// Angle at vertex `b` formed by `a`, `b`, `c`, in radians within `[0, pi]`.
#[inline]
pub fn angle(a: DVec3, b: DVec3, c: DVec3, epsilon: f64) -> f64 {
    cos_angle(a - b, c - b, epsilon).acos()
}

#[inline]
fn cos_angle(v1: DVec3, v2: DVec3, epsilon: f64) -> f64 {
    let d1 = v1.length().max(epsilon);
    let d2 = v2.length().max(epsilon);
    (v1.dot(v2) / (d1 * d2)).clamp(-1.0, 1.0)
}

/// Gradient of the angle at vertex `b` with respect to `a`, `b`, `c`.
pub fn angle_gradient(a: DVec3, b: DVec3, c: DVec3, epsilon: f64) -> [DVec3; 3] {
    // Vectors from vertex to end atoms
    let p12 = a - b;
    let p32 = c - b;
    let dist1 = p12.length().max(epsilon);
    let dist2 = p32.length().max(epsilon);

    // Unit vectors from vertex toward end atoms
    let r1 = p12 / dist1;
    let r2 = p32 / dist2;

    let cos_theta = r1.dot(r2).clamp(-1.0, 1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt().max(MIN_SIN_THETA);

    let dcos_ds1 = (r2 - cos_theta * r1) / dist1;
    let dcos_ds3 = (r1 - cos_theta * r2) / dist2;

    // dTheta/dx = -(1/sinTheta) * dCos/dx
    let factor = -1.0 / sin_theta;
    let grad1 = factor * dcos_ds1;
    let grad3 = factor * dcos_ds3;
    [grad1, -grad1 - grad3, grad3]
}

// ============================================================================
// Dihedral
// ============================================================================
//
// With F = a - b, G = b - c, H = d - c, the plane normals are A = F x G and
// B = H x G. The dihedral is the signed angle between A and B:
//   phi = atan2(-(A x B) . G / |G|, A . B)
// so a cis arrangement gives 0 and trans gives pi.

/// Dihedral angle of `a-b-c-d` in `(-pi, pi]`.
pub fn dihedral(a: DVec3, b: DVec3, c: DVec3, d: DVec3, epsilon: f64) -> f64 {
    let f = a - b;
    let g = b - c;
    let h = d - c;
    let na = f.cross(g);
    let nb = h.cross(g);

    let g_len = g.length().max(epsilon);
    let y = -na.cross(nb).dot(g) / g_len;
    let x = na.dot(nb);
    let phi = y.atan2(x);
    if phi <= -PI { phi + 2.0 * PI } else { phi }
}

/// Gradient of the dihedral angle of `a-b-c-d` with respect to each of the four points.
pub fn dihedral_gradient(
    a: DVec3,
    b: DVec3,
    c: DVec3,
    d: DVec3,
    epsilon: f64,
) -> [DVec3; 4] {
    let f = a - b;
    let g = b - c;
    let h = d - c;
    let na = f.cross(g);
    let nb = h.cross(g);

    let a2 = na.length_squared().max(epsilon);
    let b2 = nb.length_squared().max(epsilon);
    let g_len = g.length().max(epsilon);

    let grad_a = -(g_len / a2) * na;
    let grad_d = (g_len / b2) * nb;

    let fg = f.dot(g) / (a2 * g_len);
    let hg = h.dot(g) / (b2 * g_len);

    let grad_b = -grad_a + fg * na - hg * nb;
    let grad_c = -grad_d - fg * na + hg * nb;
    [grad_a, grad_b, grad_c, grad_d]
}

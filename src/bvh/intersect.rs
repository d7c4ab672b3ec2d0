//! Ray–triangle intersection (Möller–Trumbore).
//!
//! Closed-form barycentric test, no plane equation precomputed. Every dot
//! and cross product uses the same `origin`/`direction` pair, so rays that
//! were carried into mesh-local space by an instance inverse stay consistent.

use crate::util::{Ray, Vec3};

/// Default tolerance for the determinant, barycentric edges and `t`.
pub const DEFAULT_EPSILON: f32 = 1e-6;

/// Parametric hit on a single triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray, in units of the ray direction.
    pub t: f32,
    /// Barycentric weight of the second vertex.
    pub u: f32,
    /// Barycentric weight of the third vertex.
    pub v: f32,
}

/// Möller–Trumbore test returning the full hit record.
///
/// `None` when the ray is parallel to the triangle plane (`|det| < epsilon`),
/// passes outside the triangle, or the hit is not strictly ahead of the
/// origin (`t <= epsilon`). Degenerate triangles have a zero determinant
/// and never hit.
#[inline]
pub fn intersect_triangle_uv(a: Vec3, b: Vec3, c: Vec3, ray: &Ray, epsilon: f32) -> Option<TriangleHit> {
    let edge1 = b - a;
    let edge2 = c - a;

    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < epsilon {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - a;
    let u = inv_det * s.dot(p);
    if u < -epsilon || u > 1.0 + epsilon {
        return None;
    }

    let q = s.cross(edge1);
    let v = inv_det * ray.direction.dot(q);
    if v < -epsilon || u + v > 1.0 + epsilon {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    if t > epsilon && t.is_finite() {
        Some(TriangleHit { t, u, v })
    } else {
        None
    }
}

/// Möller–Trumbore test returning only `t`, or `+inf` on a miss.
#[inline]
pub fn intersect_triangle(a: Vec3, b: Vec3, c: Vec3, ray: &Ray, epsilon: f32) -> f32 {
    intersect_triangle_uv(a, b, c, ray, epsilon).map_or(f32::INFINITY, |hit| hit.t)
}

/// Triangle test used by BVH traversal.
///
/// Traversal is generic over the tester so callers can swap in an
/// instrumented or alternative test without touching the tree walk.
pub trait TriangleTester {
    fn test(&self, a: Vec3, b: Vec3, c: Vec3, ray: &Ray) -> Option<TriangleHit>;
}

/// The default tester.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MollerTrumbore {
    pub epsilon: f32,
}

impl MollerTrumbore {
    pub fn new(epsilon: f32) -> Self {
        Self { epsilon }
    }
}

impl Default for MollerTrumbore {
    fn default() -> Self {
        Self { epsilon: DEFAULT_EPSILON }
    }
}

impl TriangleTester for MollerTrumbore {
    #[inline]
    fn test(&self, a: Vec3, b: Vec3, c: Vec3, ray: &Ray) -> Option<TriangleHit> {
        intersect_triangle_uv(a, b, c, ray, self.epsilon)
    }
}

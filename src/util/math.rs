//! Math type re-exports and picking-specific geometry primitives.
//!
//! This module re-exports types from `glam` and provides the two shapes
//! every query is built from: [`Aabb`] and [`Ray`].

// Re-export glam types
pub use glam::{
    // Single precision vectors
    Vec2, Vec3, Vec4,
    // Single precision matrices
    Mat3, Mat4,
    // Quaternions
    Quat,
};

use std::fmt;

/// Axis-aligned bounding box with single precision.
///
/// The empty box is inverted (`min = +inf`, `max = -inf`) so that the first
/// [`add_point`](Aabb::add_point) always lands exactly on the point,
/// whatever its sign. A zeroed box is *not* empty: it already contains the
/// origin.
#[derive(Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Empty bounding box (inverted, will expand on first point).
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Additive identity for [`add_point`](Self::add_point) and [`merge`](Self::merge).
    #[inline]
    pub const fn empty() -> Self {
        Self::EMPTY
    }

    /// Create a new bounding box from min and max points.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point of the iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut b = Self::EMPTY;
        for p in points {
            b.add_point(p);
        }
        b
    }

    /// Check if this box contains no points at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand this box to include a point.
    #[inline]
    pub fn add_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand this box to include another box.
    #[inline]
    pub fn merge(&mut self, other: &Self) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Get the size (extents) of the box. Zero for an empty box.
    #[inline]
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Axis with the greatest extent (0=x, 1=y, 2=z). Ties favour the lower axis.
    #[inline]
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();
        let mut axis = 0;
        if e.y > e[axis] {
            axis = 1;
        }
        if e.z > e[axis] {
            axis = 2;
        }
        axis
    }

    /// Inclusive point containment.
    #[inline]
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True if `other` lies entirely inside this box. An empty box is inside everything.
    #[inline]
    pub fn contains_box(&self, other: &Self) -> bool {
        other.is_empty() || (self.contains_point(other.min) && self.contains_point(other.max))
    }

    /// Box around the eight transformed corners.
    pub fn transformed(&self, m: &Mat4) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let (lo, hi) = (self.min, self.max);
        Self::from_points((0..8).map(|i| {
            let corner = Vec3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            m.transform_point3(corner)
        }))
    }

    /// Slab test returning the clamped entry and exit parameters.
    ///
    /// Returns `Some((t_near, t_far))` with `t_near >= 0` when the ray
    /// touches the box in front of its origin. A ray parallel to an axis
    /// only misses when its origin lies outside that slab; an origin on a
    /// slab plane (`min` or `max`) is inside.
    #[inline]
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32)> {
        if self.is_empty() {
            return None;
        }

        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;
        for axis in 0..3 {
            let origin = ray.origin[axis];
            if ray.direction[axis] == 0.0 {
                // 0 * inf would be NaN on the slab planes
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (self.min[axis] - origin) * ray.inv_direction[axis];
            let t2 = (self.max[axis] - origin) * ray.inv_direction[axis];
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
        }

        if t_far >= t_near && t_far >= 0.0 {
            Some((t_near.max(0.0), t_far))
        } else {
            None
        }
    }

    /// Whether the ray hits this box at or ahead of its origin.
    #[inline]
    pub fn has_intersection(&self, ray: &Ray) -> bool {
        self.intersect_ray(ray).is_some()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aabb({:?} - {:?})", self.min, self.max)
    }
}

/// A ray with a precomputed reciprocal direction for slab tests.
///
/// The direction is stored as given. Rays carried into mesh-local space by
/// an instance inverse keep their scale, so a hit parameter `t` means the
/// same point along the original world ray in every instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    /// Create a ray. Zero direction components give infinite reciprocals.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.recip(),
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Carry the ray through `m`: the origin as a point, the direction as a
    /// vector (translation is not applied to it).
    #[inline]
    pub fn transformed(&self, m: &Mat4) -> Self {
        Self::new(m.transform_point3(self.origin), m.transform_vector3(self.direction))
    }

    /// Unproject a cursor position into a world-space ray.
    ///
    /// `ndc` is in normalized device coordinates (`[-1, 1]` on both axes,
    /// y up). Near and far planes are taken at depth 0 and 1. The returned
    /// direction is unit length, so hit parameters are world distances.
    pub fn from_screen(ndc: Vec2, inverse_view_projection: &Mat4) -> Option<Self> {
        let near = inverse_view_projection.project_point3(ndc.extend(0.0));
        let far = inverse_view_projection.project_point3(ndc.extend(1.0));
        let direction = (far - near).normalize_or_zero();
        if !near.is_finite() || direction == Vec3::ZERO {
            return None;
        }
        Some(Self::new(near, direction))
    }
}

/// `+inf`-safe minimum of two hit distances. NaN never wins.
#[inline]
pub fn min_distance(a: f32, b: f32) -> f32 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => f32::INFINITY,
        (true, false) => b,
        (false, true) => a,
        (false, false) => a.min(b),
    }
}

//! Closest-hit traversal.

use crate::geom::TriangleMesh;
use crate::util::Ray;

use super::intersect::{MollerTrumbore, TriangleTester};
use super::Bvh;

/// Closest hit within one mesh, in the mesh's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    /// Distance along the (local) ray.
    pub t: f32,
    /// Original triangle number, i.e. position in the index buffer the
    /// mesh was loaded with, before the build reordered it.
    pub triangle: u32,
    pub u: f32,
    pub v: f32,
}

struct Traversal<'a, T: ?Sized> {
    bvh: &'a Bvh,
    mesh: &'a TriangleMesh,
    ray: &'a Ray,
    tester: &'a T,
    closest: f32,
    best: Option<MeshHit>,
}

impl<T: TriangleTester + ?Sized> Traversal<'_, T> {
    fn visit(&mut self, node_index: usize) {
        let Some(node) = self.bvh.nodes.get(node_index) else {
            return;
        };
        match node.bounds.intersect_ray(self.ray) {
            Some((t_near, _)) if t_near <= self.closest => {}
            _ => return,
        }

        if !node.is_leaf() {
            let first = node.child_index as usize;
            self.visit(first);
            self.visit(first + 1);
            return;
        }

        for slot in node.triangle_slots() {
            let Some([a, b, c]) = self.mesh.triangle(slot) else {
                continue;
            };
            let Some(hit) = self.tester.test(a, b, c, self.ray) else {
                continue;
            };
            if hit.t >= 0.0 && hit.t < self.closest {
                self.closest = hit.t;
                self.best = Some(MeshHit {
                    t: hit.t,
                    triangle: self.bvh.triangle_id(slot).unwrap_or(slot as u32),
                    u: hit.u,
                    v: hit.v,
                });
            }
        }
    }
}

impl Bvh {
    /// Closest hit distance below `current_closest`, or `current_closest`
    /// itself when nothing in the mesh is nearer.
    ///
    /// `mesh` must be the mesh this tree was built over (with the index
    /// buffer as reordered by the build). Pass `f32::INFINITY` to search
    /// the whole ray.
    pub fn closest_hit(&self, mesh: &TriangleMesh, ray: &Ray, current_closest: f32) -> f32 {
        self.closest_hit_with(mesh, ray, current_closest, &MollerTrumbore::default())
            .map_or(current_closest, |hit| hit.t)
    }

    /// Closest hit record strictly nearer than `current_closest`.
    ///
    /// Subtrees whose box is missed, or entered beyond the best distance so
    /// far, are skipped without testing any of their triangles. Children
    /// are visited first-then-second, so the second benefits from any
    /// tighter bound found in the first.
    pub fn closest_hit_with<T: TriangleTester + ?Sized>(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        current_closest: f32,
        tester: &T,
    ) -> Option<MeshHit> {
        let mut traversal = Traversal {
            bvh: self,
            mesh,
            ray,
            tester,
            closest: if current_closest.is_nan() { f32::INFINITY } else { current_closest },
            best: None,
        };
        traversal.visit(0);
        traversal.best
    }
}

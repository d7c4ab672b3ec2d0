//! Per-mesh bounding volume hierarchy.
//!
//! Flat array layout, built once per mesh at load time:
//! - node 0 is the root, children of a node are adjacent slots
//! - leaves own contiguous runs of the (reordered) index buffer
//!
//! ## Pipeline
//! ```text
//! TriangleMesh → Bvh::build (median split) → MeshBvh (Arc'd mesh + tree) → closest_hit
//! ```

pub mod build;
pub mod intersect;
pub mod node;
pub mod query;
mod stats;

use std::sync::Arc;

use crate::geom::TriangleMesh;
use crate::util::{Aabb, MalformedGeometry, Ray};

pub use build::{BuildOptions, DEFAULT_LEAF_THRESHOLD};
pub use intersect::{
    intersect_triangle, intersect_triangle_uv, MollerTrumbore, TriangleHit, TriangleTester, DEFAULT_EPSILON,
};
pub use node::{node_capacity, BvhNode, GpuBvhNode};
pub use query::MeshHit;
pub use stats::BvhStats;

/// Immutable BVH over one mesh's index buffer.
///
/// Holds only node ranges and the slot-to-triangle table; vertex and index
/// data stay with the mesh.
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Box<[BvhNode]>,
    triangle_ids: Box<[u32]>,
    nodes_used: usize,
    leaf_threshold: usize,
}

impl Bvh {
    /// All pre-sized node slots, including any the build did not reach.
    #[inline]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    #[inline]
    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }

    /// Box around every vertex the mesh's triangles reference.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.root().bounds
    }

    /// Arena size fixed before the build.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Slots handed out by the build cursor.
    #[inline]
    pub fn nodes_used(&self) -> usize {
        self.nodes_used
    }

    #[inline]
    pub fn leaf_threshold(&self) -> usize {
        self.leaf_threshold
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangle_ids.len()
    }

    /// Original triangle number of the triangle now stored at `slot`.
    #[inline]
    pub fn triangle_id(&self, slot: usize) -> Option<u32> {
        self.triangle_ids.get(slot).copied()
    }

    /// Reachable leaves in index-buffer order.
    pub fn leaves(&self) -> Vec<&BvhNode> {
        let mut leaves = Vec::new();
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if node.is_leaf() {
                leaves.push(node);
            } else {
                let first = node.child_index as usize;
                stack.push(first + 1);
                stack.push(first);
            }
        }
        leaves
    }

    /// Node array packed for GPU upload.
    pub fn to_gpu_nodes(&self) -> Vec<GpuBvhNode> {
        self.nodes.iter().map(BvhNode::to_gpu).collect()
    }
}

/// A mesh together with its BVH, ready for picking.
///
/// The build reorders the mesh's index buffer, after which the mesh is
/// frozen behind an `Arc`: the tree's ranges can only ever be read against
/// the buffers they were built for.
#[derive(Debug, Clone)]
pub struct MeshBvh {
    mesh: Arc<TriangleMesh>,
    bvh: Bvh,
    options: BuildOptions,
    tester: MollerTrumbore,
}

impl MeshBvh {
    /// Validate `mesh`, build its tree and freeze it.
    pub fn build(mut mesh: TriangleMesh, options: &BuildOptions) -> Result<Self, MalformedGeometry> {
        let bvh = Bvh::build(&mesh.vertices, &mut mesh.indices, options)?;
        Ok(Self {
            mesh: Arc::new(mesh),
            bvh,
            options: *options,
            tester: MollerTrumbore::new(options.epsilon),
        })
    }

    /// The mesh with its index buffer in BVH order.
    #[inline]
    pub fn mesh(&self) -> &Arc<TriangleMesh> {
        &self.mesh
    }

    #[inline]
    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Whether this tree is what building `mesh` with `options` would give.
    ///
    /// `mesh` is the buffer pair as loaded, before any reordering: vertices
    /// must match exactly and every reordered triangle must sit at its
    /// original number in `mesh.indices`.
    pub fn is_built_from(&self, mesh: &TriangleMesh, options: &BuildOptions) -> bool {
        if self.options != *options
            || self.mesh.indices.len() != mesh.indices.len()
            || self.mesh.vertices != mesh.vertices
        {
            return false;
        }
        self.mesh.indices.chunks_exact(3).enumerate().all(|(slot, corners)| {
            let original = self.bvh.triangle_id(slot).map(|id| id as usize * 3);
            original.and_then(|i| mesh.indices.get(i..i + 3)) == Some(corners)
        })
    }

    /// Local-space bounds of the mesh.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.bvh.bounds()
    }

    /// Closest hit distance below `current_closest` (or `current_closest`).
    pub fn closest_hit(&self, ray: &Ray, current_closest: f32) -> f32 {
        self.closest_hit_record(ray, current_closest)
            .map_or(current_closest, |hit| hit.t)
    }

    /// Closest hit record strictly nearer than `current_closest`.
    pub fn closest_hit_record(&self, ray: &Ray, current_closest: f32) -> Option<MeshHit> {
        self.bvh.closest_hit_with(&self.mesh, ray, current_closest, &self.tester)
    }

    pub fn stats(&self) -> BvhStats {
        self.bvh.stats()
    }
}

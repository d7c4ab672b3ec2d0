//! Median-split BVH builder.
//!
//! Splits a node's triangle range at the median centroid along the longest
//! axis of the node's box, recursing until a range fits in a leaf. The node
//! array is sized up front by [`node_capacity`]; a single "next free node"
//! cursor hands out child pairs, so node indices are stable for the whole
//! build and no node is ever appended.

use crate::geom::mesh::validate_indices;
use crate::geom::Vertex;
use crate::util::{Aabb, MalformedGeometry, Vec3};

use super::intersect::DEFAULT_EPSILON;
use super::node::{node_capacity, BvhNode};
use super::Bvh;

/// Maximum triangles per leaf before a node is split.
pub const DEFAULT_LEAF_THRESHOLD: usize = 10;

/// Build-time knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    /// Largest triangle count a leaf may hold. Must be at least 1.
    pub leaf_threshold: usize,
    /// Tolerance handed to the mesh's triangle tests.
    pub epsilon: f32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            leaf_threshold: DEFAULT_LEAF_THRESHOLD,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl BuildOptions {
    pub fn with_leaf_threshold(mut self, leaf_threshold: usize) -> Self {
        self.leaf_threshold = leaf_threshold;
        self
    }
}

/// One triangle as the builder sees it.
///
/// The three corner indices, the original triangle number and the cached
/// geometry travel together, so a partition swap can never leave one of
/// them behind.
#[derive(Debug, Clone, Copy)]
struct TriangleRecord {
    corners: [u32; 3],
    id: u32,
    centroid: Vec3,
    bounds: Aabb,
}

impl TriangleRecord {
    /// Corners must already be validated against `vertices`.
    fn new(corners: [u32; 3], id: u32, vertices: &[Vertex]) -> Self {
        let [a, b, c] = corners.map(|i| vertices[i as usize].position);
        Self {
            corners,
            id,
            centroid: (a + b + c) / 3.0,
            bounds: Aabb::from_points([a, b, c]),
        }
    }
}

fn range_bounds(records: &[TriangleRecord]) -> Aabb {
    records.iter().fold(Aabb::EMPTY, |mut b, r| {
        b.merge(&r.bounds);
        b
    })
}

struct Builder<'a> {
    records: &'a mut [TriangleRecord],
    nodes: &'a mut [BvhNode],
    next_free: usize,
    leaf_threshold: usize,
}

impl Builder<'_> {
    fn split(&mut self, node_index: usize) {
        let node = self.nodes[node_index];
        let count = node.triangle_count();
        if count <= self.leaf_threshold {
            return;
        }

        let left = self.next_free;
        debug_assert!(left + 1 < self.nodes.len(), "BVH arena exhausted at node {node_index}");
        if left + 1 >= self.nodes.len() {
            // Unreachable while node_capacity holds; keep the node as an oversized leaf.
            tracing::error!(node_index, capacity = self.nodes.len(), "BVH arena exhausted");
            return;
        }
        self.next_free += 2;

        let axis = node.bounds.longest_axis();
        let first = node.start_index as usize / 3;
        let range = &mut self.records[first..first + count];
        let median = count / 2;
        range.select_nth_unstable_by(median, |a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

        let (low, high) = range.split_at(median);
        let low_bounds = range_bounds(low);
        let high_bounds = range_bounds(high);
        tracing::trace!(
            node_index,
            axis,
            count,
            overlap = low_bounds.max[axis] - high_bounds.min[axis],
            "split"
        );

        let low_count = (median * 3) as u32;
        self.nodes[node_index].child_index = left as u32;
        self.nodes[left] = BvhNode {
            bounds: low_bounds,
            child_index: 0,
            start_index: node.start_index,
            index_count: low_count,
        };
        self.nodes[left + 1] = BvhNode {
            bounds: high_bounds,
            child_index: 0,
            start_index: node.start_index + low_count,
            index_count: node.index_count - low_count,
        };

        self.split(left);
        self.split(left + 1);
    }
}

impl Bvh {
    /// Build a BVH over `indices`, reordering whole triangles in place.
    ///
    /// The index buffer is rejected if its length is not a multiple of 3 or
    /// any index is out of range for `vertices`. On success every leaf
    /// covers a contiguous run of the reordered buffer and
    /// [`triangle_id`](Self::triangle_id) maps each run slot back to its
    /// original triangle number. Vertices are only read.
    #[tracing::instrument(skip_all, fields(tri_count = indices.len() / 3))]
    pub fn build(
        vertices: &[Vertex],
        indices: &mut [u32],
        options: &BuildOptions,
    ) -> Result<Self, MalformedGeometry> {
        let leaf_threshold = options.leaf_threshold;
        if leaf_threshold == 0 {
            return Err(MalformedGeometry::ZeroLeafThreshold);
        }
        validate_indices(vertices.len(), indices)?;

        let mut records: Vec<TriangleRecord> = indices
            .chunks_exact(3)
            .enumerate()
            .map(|(id, c)| TriangleRecord::new([c[0], c[1], c[2]], id as u32, vertices))
            .collect();

        let capacity = node_capacity(records.len(), leaf_threshold);
        let mut nodes = vec![BvhNode::UNUSED; capacity];
        nodes[0] = BvhNode {
            bounds: range_bounds(&records),
            child_index: 0,
            start_index: 0,
            index_count: indices.len() as u32,
        };

        let mut builder = Builder {
            records: &mut records,
            nodes: &mut nodes,
            next_free: 1,
            leaf_threshold,
        };
        builder.split(0);
        let nodes_used = builder.next_free;

        let mut triangle_ids = Vec::with_capacity(records.len());
        for (chunk, record) in indices.chunks_exact_mut(3).zip(&records) {
            chunk.copy_from_slice(&record.corners);
            triangle_ids.push(record.id);
        }

        tracing::debug!(nodes_used, capacity, leaf_threshold, "BVH built");

        Ok(Self {
            nodes: nodes.into_boxed_slice(),
            triangle_ids: triangle_ids.into_boxed_slice(),
            nodes_used,
            leaf_threshold,
        })
    }
}

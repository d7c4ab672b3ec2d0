//! BVH node types and arena sizing.
//!
//! The tree lives in a flat array sized once, before any split, from the
//! layer-halving formula in [`node_capacity`]. Node identity is the array
//! index; children of node `n` sit at `child_index` and `child_index + 1`.

use bytemuck::{Pod, Zeroable};

use crate::util::Aabb;

/// Tree node over a contiguous slice of the mesh index buffer.
///
/// `child_index == 0` marks a leaf (the root is never anybody's child).
/// `start_index` and `index_count` are in index-buffer units and always
/// multiples of 3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub child_index: u32,
    pub start_index: u32,
    pub index_count: u32,
}

impl BvhNode {
    /// Placeholder for pre-sized slots the build never reaches.
    pub const UNUSED: Self = Self {
        bounds: Aabb::EMPTY,
        child_index: 0,
        start_index: 0,
        index_count: 0,
    };

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.child_index == 0
    }

    /// Number of triangles under this node.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.index_count as usize / 3
    }

    /// Triangle slots (index-buffer triangle numbers) covered by this node.
    #[inline]
    pub fn triangle_slots(&self) -> std::ops::Range<usize> {
        let first = self.start_index as usize / 3;
        first..first + self.triangle_count()
    }

    /// Pack for GPU upload.
    pub fn to_gpu(&self) -> GpuBvhNode {
        let (left_or_first, count) = if self.is_leaf() {
            (self.start_index / 3, self.index_count / 3)
        } else {
            (self.child_index, 0)
        };
        GpuBvhNode {
            aabb_min: self.bounds.min.to_array(),
            left_or_first,
            aabb_max: self.bounds.max.to_array(),
            count,
        }
    }
}

impl Default for BvhNode {
    fn default() -> Self {
        Self::UNUSED
    }
}

/// GPU-friendly BVH node (32 bytes), for debug overlays that draw the tree.
///
/// Internal node: left_or_first = left child index, count = 0
/// Leaf node: left_or_first = first triangle, count = triangle count
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GpuBvhNode {
    pub aabb_min: [f32; 3],
    pub left_or_first: u32,
    pub aabb_max: [f32; 3],
    pub count: u32,
}

/// Arena size for a mesh of `triangle_count` triangles.
///
/// Starting from the triangle count, halve (rounding up) until the count
/// fits in a leaf; every halving adds a layer of `2^layer` nodes. The
/// larger half of a median split holds `ceil(n / 2)` triangles, so the
/// deepest possible leaf is bounded by this layer count and the build
/// never needs a slot past the end. `leaf_threshold` must be non-zero.
pub fn node_capacity(triangle_count: usize, leaf_threshold: usize) -> usize {
    debug_assert!(leaf_threshold > 0);
    let mut capacity = 1;
    let mut layer_width = 1;
    let mut count = triangle_count;
    while count > leaf_threshold {
        count = count.div_ceil(2);
        layer_width *= 2;
        capacity += layer_width;
    }
    capacity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Vec3;

    #[test]
    fn test_capacity_layer_halving() {
        assert_eq!(node_capacity(0, 10), 1);
        assert_eq!(node_capacity(1, 10), 1);
        assert_eq!(node_capacity(10, 10), 1);
        assert_eq!(node_capacity(11, 10), 3);
        assert_eq!(node_capacity(20, 10), 3);
        assert_eq!(node_capacity(40, 10), 7);
        assert_eq!(node_capacity(41, 10), 15);
        assert_eq!(node_capacity(8, 1), 15);
    }

    #[test]
    fn test_capacity_rounds_odd_counts_up() {
        // 21 -> 11 -> 6: the 11-triangle half still has to split.
        assert_eq!(node_capacity(21, 10), 7);
    }

    #[test]
    fn test_gpu_layout() {
        assert_eq!(std::mem::size_of::<GpuBvhNode>(), 32);

        let leaf = BvhNode {
            bounds: Aabb::new(Vec3::ZERO, Vec3::ONE),
            child_index: 0,
            start_index: 30,
            index_count: 12,
        };
        let gpu = leaf.to_gpu();
        assert_eq!((gpu.left_or_first, gpu.count), (10, 4));
        assert_eq!(gpu.aabb_max, [1.0, 1.0, 1.0]);

        let inner = BvhNode { child_index: 5, ..leaf };
        let gpu = inner.to_gpu();
        assert_eq!((gpu.left_or_first, gpu.count), (5, 0));
    }

    #[test]
    fn test_triangle_slots() {
        let node = BvhNode { start_index: 9, index_count: 6, ..BvhNode::UNUSED };
        assert_eq!(node.triangle_slots(), 3..5);
        assert!(node.is_leaf());
    }
}

//! Tree shape statistics for diagnostics and the CLI.

use std::fmt;

use super::Bvh;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub triangle_count: usize,
    /// Pre-sized arena length.
    pub node_capacity: usize,
    /// Nodes reachable from the root.
    pub reachable_nodes: usize,
    pub leaf_count: usize,
    /// Root is depth 0.
    pub max_depth: usize,
    pub min_leaf_triangles: usize,
    pub max_leaf_triangles: usize,
}

impl Bvh {
    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats {
            triangle_count: self.triangle_count(),
            node_capacity: self.node_count(),
            min_leaf_triangles: usize::MAX,
            ..Default::default()
        };

        let mut stack = vec![(0usize, 0usize)];
        while let Some((index, depth)) = stack.pop() {
            let node = &self.nodes[index];
            stats.reachable_nodes += 1;
            stats.max_depth = stats.max_depth.max(depth);
            if node.is_leaf() {
                stats.leaf_count += 1;
                stats.min_leaf_triangles = stats.min_leaf_triangles.min(node.triangle_count());
                stats.max_leaf_triangles = stats.max_leaf_triangles.max(node.triangle_count());
            } else {
                let first = node.child_index as usize;
                stack.push((first, depth + 1));
                stack.push((first + 1, depth + 1));
            }
        }

        if stats.leaf_count == 0 {
            stats.min_leaf_triangles = 0;
        }
        stats
    }
}

impl fmt::Display for BvhStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tris, {}/{} nodes, {} leaves ({}..{} tris), depth {}",
            self.triangle_count,
            self.reachable_nodes,
            self.node_capacity,
            self.leaf_count,
            self.min_leaf_triangles,
            self.max_leaf_triangles,
            self.max_depth,
        )
    }
}

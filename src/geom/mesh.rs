//! Triangle mesh data as handed over by the model loader.

use bytemuck::{Pod, Zeroable};

use crate::util::{Aabb, MalformedGeometry, Vec2, Vec3};

/// Mesh vertex. Only `position` takes part in picking.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub texture_index: u32,
}

impl Vertex {
    /// Vertex with only a position set.
    #[inline]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

/// Indexed triangle list.
///
/// `indices` is a flat list of vertex numbers, three per triangle.
/// [`validate`](Self::validate) checks the two structural invariants the
/// BVH builder relies on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Build a mesh from bare positions.
    pub fn from_positions(positions: impl IntoIterator<Item = Vec3>, indices: Vec<u32>) -> Self {
        Self {
            vertices: positions.into_iter().map(Vertex::from_position).collect(),
            indices,
        }
    }

    /// Number of whole triangles in the index buffer.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Positions of the triangle stored at `slot` (index-buffer order).
    ///
    /// `None` if the slot or any of its indices is out of range.
    #[inline]
    pub fn triangle(&self, slot: usize) -> Option<[Vec3; 3]> {
        let corners = self.indices.get(slot * 3..slot * 3 + 3)?;
        Some([
            self.vertices.get(corners[0] as usize)?.position,
            self.vertices.get(corners[1] as usize)?.position,
            self.vertices.get(corners[2] as usize)?.position,
        ])
    }

    /// Check that the index buffer describes whole triangles over existing vertices.
    pub fn validate(&self) -> Result<(), MalformedGeometry> {
        validate_indices(self.vertices.len(), &self.indices)
    }

    /// Box around every vertex the index buffer references.
    ///
    /// Unreferenced vertices (e.g. leftovers of a shared vertex pool) do
    /// not widen the box.
    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(
            self.indices
                .iter()
                .filter_map(|&i| self.vertices.get(i as usize))
                .map(|v| v.position),
        )
    }
}

/// Shared index validation used by the mesh and the BVH builder.
pub(crate) fn validate_indices(vertex_count: usize, indices: &[u32]) -> Result<(), MalformedGeometry> {
    if indices.len() % 3 != 0 {
        return Err(MalformedGeometry::IndexCountNotMultipleOfThree { len: indices.len() });
    }
    if u32::try_from(indices.len()).is_err() {
        return Err(MalformedGeometry::TooManyIndices { len: indices.len() });
    }
    if let Some((position, &index)) = indices
        .iter()
        .enumerate()
        .find(|&(_, &i)| i as usize >= vertex_count)
    {
        return Err(MalformedGeometry::IndexOutOfRange {
            position,
            index,
            vertex_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriangleMesh {
        TriangleMesh::from_positions(
            [
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(50.0, 50.0, 50.0), // unreferenced
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<Vertex>(), 36);
    }

    #[test]
    fn test_triangle_lookup() {
        let mesh = quad();
        assert_eq!(mesh.triangle_count(), 2);
        let [a, b, c] = mesh.triangle(1).unwrap();
        assert_eq!(a, Vec3::ZERO);
        assert_eq!(b, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(c, Vec3::new(0.0, 1.0, 0.0));
        assert!(mesh.triangle(2).is_none());
    }

    #[test]
    fn test_bounds_skip_unreferenced_vertices() {
        let b = quad().bounds();
        assert_eq!(b.min, Vec3::ZERO);
        assert_eq!(b.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_validate() {
        assert!(quad().validate().is_ok());

        let mut bad = quad();
        bad.indices.push(0);
        assert_eq!(
            bad.validate(),
            Err(MalformedGeometry::IndexCountNotMultipleOfThree { len: 7 })
        );

        let mut bad = quad();
        bad.indices[4] = 9;
        assert_eq!(
            bad.validate(),
            Err(MalformedGeometry::IndexOutOfRange { position: 4, index: 9, vertex_count: 5 })
        );
    }
}

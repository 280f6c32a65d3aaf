//! Triangle mesh input.
//!
//! This module provides [`TriangleMesh`], the validated face-vertex
//! representation the rest of the crate consumes: vertex positions, optional
//! per-vertex UV coordinates, and triangle index triples.
//!
//! Positions are expected to already be in the coordinate space the caller
//! wants edge lengths measured in (world space, typically); the crate never
//! applies a transform itself.
//!
//! # Example
//!
//! ```
//! use patina::mesh::TriangleMesh;
//! use nalgebra::{Point2, Point3};
//!
//! let mesh = TriangleMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.5, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap()
//! .with_uvs(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.5, 1.0),
//! ])
//! .unwrap();
//!
//! assert_eq!(mesh.triangle_count(), 1);
//! ```

use nalgebra::{Point2, Point3};

use crate::error::{MeshColorError, Result};

/// A triangle mesh in face-vertex form.
///
/// Construction validates that every triangle index is in range, so the rest
/// of the crate can index without re-checking. Degenerate triangles (repeated
/// indices, zero-length edges) are accepted: the patch allocator resolves them
/// to the minimum resolution rather than rejecting the mesh.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    positions: Vec<Point3<f32>>,
    uvs: Option<Vec<Point2<f32>>>,
    triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a mesh from vertex positions and triangle index triples.
    ///
    /// Fails with [`MeshColorError::InvalidVertexIndex`] if any triangle
    /// references a vertex outside `positions`.
    pub fn new(positions: Vec<Point3<f32>>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        for (ti, tri) in triangles.iter().enumerate() {
            for &vi in tri {
                if vi as usize >= positions.len() {
                    return Err(MeshColorError::InvalidVertexIndex {
                        triangle: ti,
                        vertex: vi,
                    });
                }
            }
        }

        Ok(Self {
            positions,
            uvs: None,
            triangles,
        })
    }

    /// Attach per-vertex UV coordinates.
    ///
    /// Fails with [`MeshColorError::UvCountMismatch`] if the UV count does not
    /// equal the vertex count.
    pub fn with_uvs(mut self, uvs: Vec<Point2<f32>>) -> Result<Self> {
        if uvs.len() != self.positions.len() {
            return Err(MeshColorError::UvCountMismatch {
                uvs: uvs.len(),
                vertices: self.positions.len(),
            });
        }
        self.uvs = Some(uvs);
        Ok(self)
    }

    /// Get the number of triangles.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Get the number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get all vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    /// Get all triangle index triples.
    #[inline]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Get the per-vertex UV coordinates, if any were attached.
    #[inline]
    pub fn uvs(&self) -> Option<&[Point2<f32>]> {
        self.uvs.as_deref()
    }

    /// Get the index triple of one triangle.
    #[inline]
    pub fn triangle(&self, index: usize) -> [u32; 3] {
        self.triangles[index]
    }

    /// Get the corner positions of one triangle, in declared order A, B, C.
    #[inline]
    pub fn corner_positions(&self, index: usize) -> [Point3<f32>; 3] {
        let [a, b, c] = self.triangles[index];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Get the corner UVs of one triangle, in declared order A, B, C.
    ///
    /// Returns `None` if the mesh carries no UVs.
    #[inline]
    pub fn corner_uvs(&self, index: usize) -> Option<[Point2<f32>; 3]> {
        let uvs = self.uvs.as_deref()?;
        let [a, b, c] = self.triangles[index];
        Some([uvs[a as usize], uvs[b as usize], uvs[c as usize]])
    }

    /// Compute the three edge lengths of a triangle: |AB|, |AC|, |BC|.
    ///
    /// Degenerate edges simply have length zero.
    pub fn edge_lengths(&self, index: usize) -> [f32; 3] {
        let [a, b, c] = self.corner_positions(index);
        [(a - b).norm(), (a - c).norm(), (b - c).norm()]
    }

    /// Compute the mean of the three edge lengths of a triangle.
    pub fn average_edge_length(&self, index: usize) -> f32 {
        let [ab, ac, bc] = self.edge_lengths(index);
        (ab + ac + bc) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap()
    }

    #[test]
    fn test_basic_accessors() {
        let mesh = unit_triangle();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle(0), [0, 1, 2]);
        assert!(mesh.uvs().is_none());
    }

    #[test]
    fn test_invalid_vertex_index() {
        let result = TriangleMesh::new(
            vec![Point3::new(0.0, 0.0, 0.0)],
            vec![[0, 1, 2]], // indices 1 and 2 are out of range
        );
        assert!(matches!(
            result,
            Err(MeshColorError::InvalidVertexIndex { triangle: 0, vertex: 1 })
        ));
    }

    #[test]
    fn test_uv_count_mismatch() {
        let result = unit_triangle().with_uvs(vec![Point2::new(0.0, 0.0)]);
        assert!(matches!(
            result,
            Err(MeshColorError::UvCountMismatch { uvs: 1, vertices: 3 })
        ));
    }

    #[test]
    fn test_degenerate_triangle_accepted() {
        // Repeated indices are legal input; only out-of-range indices fail.
        let mesh = TriangleMesh::new(
            vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
            vec![[0, 0, 1]],
        )
        .unwrap();
        let [ab, ac, bc] = mesh.edge_lengths(0);
        assert_eq!(ab, 0.0);
        assert_eq!(ac, 1.0);
        assert_eq!(bc, 1.0);
    }

    #[test]
    fn test_edge_lengths() {
        let mesh = unit_triangle();
        let [ab, ac, bc] = mesh.edge_lengths(0);
        assert!((ab - 1.0).abs() < 1e-6);
        assert!((ac - 1.0).abs() < 1e-6);
        assert!((bc - 2.0f32.sqrt()).abs() < 1e-6);

        let avg = mesh.average_edge_length(0);
        assert!((avg - (2.0 + 2.0f32.sqrt()) / 3.0).abs() < 1e-6);
    }
}

//! # Patina
//!
//! Adaptive per-triangle color storage ("mesh colors") for triangle meshes.
//!
//! Patina assigns every triangle of a mesh its own color patch — a
//! barycentric lattice whose resolution adapts to the triangle's size — and
//! packs all patches into one flat, tightly addressed buffer. Alongside it,
//! patina resolves triangle adjacency from the index data alone, giving a
//! renderer the neighbor information it needs to filter seamlessly across
//! patch boundaries. No texture atlas, no UV seams in the stored data.
//!
//! ## Features
//!
//! - **Adaptive patch packing**: per-triangle power-of-two resolutions from a
//!   colors-per-unit density, with deterministic, gap-free addressing
//! - **Adjacency resolution**: neighbor triangle + local edge across each of
//!   a triangle's three edges, boundary-aware, tolerant of non-manifold input
//! - **Image sampling**: fill patches by point-sampling any UV-mapped image
//! - **Multi-mesh registry**: sub-allocate many meshes out of shared,
//!   fixed-capacity arenas instead of one buffer pair per mesh
//! - **GPU-ready layout**: every output is a tightly packed `#[repr(C)]`
//!   array with a byte view for direct buffer upload
//!
//! ## Quick Start
//!
//! ```
//! use patina::prelude::*;
//! use nalgebra::{Point2, Point3};
//!
//! // A single triangle with UVs.
//! let mesh = TriangleMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap()
//! .with_uvs(vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(0.0, 1.0),
//! ])
//! .unwrap();
//!
//! // Build its color data at 4 colors per unit length.
//! let set = MeshColorSet::new(&mesh, 4.0).unwrap();
//! println!("patch colors: {}", set.total_color_count());
//!
//! // Bind-ready bytes.
//! let _meta = set.meta_bytes();
//! let _adjacency = set.adjacency_bytes();
//! let _patches = set.patch_bytes();
//! ```
//!
//! ## Many Meshes, Shared Arenas
//!
//! ```
//! use patina::prelude::*;
//! use nalgebra::Point3;
//!
//! # let mesh = TriangleMesh::new(
//! #     vec![
//! #         Point3::new(0.0, 0.0, 0.0),
//! #         Point3::new(1.0, 0.0, 0.0),
//! #         Point3::new(0.0, 1.0, 0.0),
//! #     ],
//! #     vec![[0, 1, 2]],
//! # ).unwrap();
//! let mut registry = VirtualRegistry::new(RegistryCapacity::default());
//!
//! let handle = registry.register(&mesh, 4.0, None).unwrap();
//! let (offset, count) = registry.meta_range(handle).unwrap();
//! println!("mesh occupies meta slots {}..{}", offset, offset + count);
//!
//! registry.unregister(handle).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adjacency;
pub mod colors;
pub mod error;
pub mod mesh;
pub mod patch;
pub mod registry;
pub mod sampler;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use patina::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adjacency::{resolve_adjacency, AdjacencyInfo, EdgeKey, BOUNDARY};
    pub use crate::colors::MeshColorSet;
    pub use crate::error::{MeshColorError, Result};
    pub use crate::mesh::TriangleMesh;
    pub use crate::patch::{
        allocate_patches, colors_per_patch, MetaInfo, PatchLayout, Rgba8,
    };
    pub use crate::registry::{MeshHandle, RegistryCapacity, VirtualRegistry};
    pub use crate::sampler::{sample_patches, ImageSource, SampleOptions};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{Point2, Point3};

    #[test]
    fn test_end_to_end_quad() {
        let mesh = TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
        .with_uvs(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();

        let mut set = MeshColorSet::new(&mesh, 2.0).unwrap();

        // Addresses tile the patch buffer.
        let total: usize = set
            .meta()
            .iter()
            .map(|m| colors_per_patch(m.resolution))
            .sum();
        assert_eq!(total, set.total_color_count());

        // The diagonal is shared, everything else is boundary.
        let paired: usize = set
            .adjacency()
            .iter()
            .map(|a| (0..3).filter(|&e| !a.is_boundary(e)).count())
            .sum();
        assert_eq!(paired, 2);

        // Sampling a solid image floods every patch color.
        let image = image::RgbaImage::from_pixel(8, 8, image::Rgba([1, 2, 3, 4]));
        set.sample(&mesh, &image).unwrap();
        assert!(set.patches().iter().all(|c| *c == Rgba8::new(1, 2, 3, 4)));
    }
}

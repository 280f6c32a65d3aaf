//! Per-mesh color set.
//!
//! [`MeshColorSet`] ties the three core passes together for a single mesh:
//! patch allocation, adjacency resolution, and (optionally) image sampling.
//! It owns the three output arrays — meta, adjacency, patch colors — and
//! exposes them both as typed slices and as byte views a GPU consumer can
//! bind directly.
//!
//! All data is computed once from the mesh's immutable geometry. If the
//! geometry changes, build a new set; nothing is patched incrementally.

use bytemuck::cast_slice;
use log::debug;

use crate::adjacency::{resolve_adjacency, AdjacencyInfo};
use crate::error::Result;
use crate::mesh::TriangleMesh;
use crate::patch::{allocate_patches, MetaInfo, Rgba8};
use crate::sampler::{sample_patches, ImageSource, SampleOptions};

/// The complete mesh-colors data for one mesh.
///
/// # Example
///
/// ```
/// use patina::colors::MeshColorSet;
/// use patina::mesh::TriangleMesh;
/// use nalgebra::Point3;
///
/// let mesh = TriangleMesh::new(
///     vec![
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
///     vec![[0, 1, 2]],
/// )
/// .unwrap();
///
/// let set = MeshColorSet::new(&mesh, 2.0).unwrap();
/// assert_eq!(set.meta().len(), 1);
/// assert_eq!(set.meta_bytes().len(), 8);
/// assert_eq!(set.adjacency_bytes().len(), 24);
/// ```
#[derive(Debug, Clone)]
pub struct MeshColorSet {
    meta: Vec<MetaInfo>,
    adjacency: Vec<AdjacencyInfo>,
    patches: Vec<Rgba8>,
}

impl MeshColorSet {
    /// Build the color set for a mesh at the given color density.
    ///
    /// Runs patch allocation and adjacency resolution. The patch buffer is
    /// allocated but not sampled; its contents are unspecified until
    /// [`sample`](Self::sample) is called.
    pub fn new(mesh: &TriangleMesh, colors_per_unit: f32) -> Result<Self> {
        let layout = allocate_patches(mesh, colors_per_unit)?;
        let adjacency = resolve_adjacency(mesh.triangles());
        let patches = vec![Rgba8::new(0, 0, 0, 0); layout.total_color_count];

        debug!(
            "built color set: {} triangles, {} colors",
            layout.meta.len(),
            layout.total_color_count
        );

        Ok(Self {
            meta: layout.meta,
            adjacency,
            patches,
        })
    }

    /// Sample the patch buffer from an image with default options.
    pub fn sample<S: ImageSource + ?Sized>(&mut self, mesh: &TriangleMesh, image: &S) -> Result<()> {
        self.sample_with(mesh, image, &SampleOptions::default())
    }

    /// Sample the patch buffer from an image with explicit options.
    pub fn sample_with<S: ImageSource + ?Sized>(
        &mut self,
        mesh: &TriangleMesh,
        image: &S,
        options: &SampleOptions,
    ) -> Result<()> {
        sample_patches(mesh, &self.meta, image, &mut self.patches, options)
    }

    /// Get the number of triangles this set covers.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.meta.len()
    }

    /// Get the total number of patch colors.
    #[inline]
    pub fn total_color_count(&self) -> usize {
        self.patches.len()
    }

    /// Per-triangle patch metadata, in triangle order.
    #[inline]
    pub fn meta(&self) -> &[MetaInfo] {
        &self.meta
    }

    /// Per-triangle adjacency, in triangle order.
    #[inline]
    pub fn adjacency(&self) -> &[AdjacencyInfo] {
        &self.adjacency
    }

    /// The shared patch color buffer.
    #[inline]
    pub fn patches(&self) -> &[Rgba8] {
        &self.patches
    }

    /// The meta buffer as tightly packed bytes (8 per triangle).
    #[inline]
    pub fn meta_bytes(&self) -> &[u8] {
        cast_slice(&self.meta)
    }

    /// The adjacency buffer as tightly packed bytes (24 per triangle).
    #[inline]
    pub fn adjacency_bytes(&self) -> &[u8] {
        cast_slice(&self.adjacency)
    }

    /// The patch buffer as tightly packed bytes (4 per color).
    #[inline]
    pub fn patch_bytes(&self) -> &[u8] {
        cast_slice(&self.patches)
    }
}

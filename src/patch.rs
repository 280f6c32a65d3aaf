//! Patch arithmetic and allocation.
//!
//! A *patch* is the set of colors owned by one triangle, stored contiguously
//! in a shared flat buffer. This module provides:
//!
//! - the counting arithmetic relating a patch's lattice resolution to its
//!   color count ([`colors_per_patch`] and friends);
//! - the barycentric lattice traversal that defines each color's linear
//!   offset within its patch ([`lattice_points`], [`barycentric`]);
//! - [`allocate_patches`]: per-triangle adaptive resolution selection plus
//!   the sequential prefix sum that assigns every triangle a non-overlapping
//!   base address.
//!
//! # Patch layout
//!
//! A patch of resolution `r` holds one color per lattice point `(i, j)` with
//! `i + j <= r`, traversed `i` outer and `j` inner. That traversal order *is*
//! the storage order; consumers reconstructing lattice positions must walk it
//! identically. The count decomposes as 3 corner colors, `r - 1` colors per
//! edge, and `(r - 1)(r - 2) / 2` interior colors:
//!
//! ```
//! use patina::patch::colors_per_patch;
//!
//! assert_eq!(colors_per_patch(1), 3);  // corners only
//! assert_eq!(colors_per_patch(2), 6);  // corners + 1 color per edge
//! assert_eq!(colors_per_patch(4), 15);
//! ```

use bytemuck::{Pod, Zeroable};
use log::trace;
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::error::{MeshColorError, Result};
use crate::mesh::TriangleMesh;

/// Per-triangle patch metadata, in the exact layout GPU consumers bind.
///
/// `address` is the patch's base offset into the shared color buffer;
/// `resolution` is its lattice resolution (a power of two, at least 1).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MetaInfo {
    /// Base offset of this triangle's patch in the shared color buffer.
    pub address: u32,
    /// Lattice resolution of this triangle's patch.
    pub resolution: u32,
}

/// One RGBA8 texel of a patch.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Create a texel from its four channels.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl From<[u8; 4]> for Rgba8 {
    #[inline]
    fn from(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

/// The patch layout computed for one mesh: per-triangle metadata plus the
/// total length of the shared color buffer the addresses tile.
#[derive(Debug, Clone)]
pub struct PatchLayout {
    /// Per-triangle metadata, in triangle order.
    pub meta: Vec<MetaInfo>,
    /// Total number of colors across all patches. Per-triangle address ranges
    /// tile `[0, total_color_count)` exactly, with no gaps or overlaps.
    pub total_color_count: usize,
}

/// Number of colors a patch stores per corner. One, at every resolution.
#[inline]
pub const fn colors_per_vertex() -> usize {
    1
}

/// Number of interior colors a patch stores per edge.
#[inline]
pub const fn colors_per_edge(resolution: u32) -> usize {
    (resolution as usize).saturating_sub(1)
}

/// Number of interior face colors of a patch.
#[inline]
pub const fn colors_per_face(resolution: u32) -> usize {
    let r = resolution as usize;
    if r < 2 {
        0
    } else {
        (r - 1) * (r - 2) / 2
    }
}

/// Total number of colors in a patch of the given resolution.
///
/// Equals the number of lattice points `(i, j)` with `i + j <= resolution`,
/// i.e. `(r + 1)(r + 2) / 2`.
#[inline]
pub const fn colors_per_patch(resolution: u32) -> usize {
    3 * colors_per_vertex() + 3 * colors_per_edge(resolution) + colors_per_face(resolution)
}

/// Round up to the next power of two, with a floor of 1.
///
/// Uses the standard bit smear. Powers of two map to themselves.
#[inline]
pub const fn next_power_of_two(x: u32) -> u32 {
    if x <= 1 {
        return 1;
    }

    let mut x = x - 1;
    x |= x >> 1;
    x |= x >> 2;
    x |= x >> 4;
    x |= x >> 8;
    x |= x >> 16;
    x + 1
}

/// Barycentric weights of lattice point `(i, j)` at the given resolution.
///
/// Returns `(u, v, w)` with `u = i/r`, `v = j/r`, `w = 1 - u - v`, weighting
/// the triangle's corners A, B, C respectively.
#[inline]
pub fn barycentric(i: u32, j: u32, resolution: u32) -> Vector3<f32> {
    let u = i as f32 / resolution as f32;
    let v = j as f32 / resolution as f32;
    Vector3::new(u, v, 1.0 - u - v)
}

/// Iterate the lattice points of a patch in storage order.
///
/// Yields `(i, j)` with `i` as the outer index (`0..=resolution`) and `j` as
/// the inner index (`0..=resolution - i`). The iteration position of each
/// point is its linear offset within the patch.
pub fn lattice_points(resolution: u32) -> impl Iterator<Item = (u32, u32)> {
    (0..=resolution).flat_map(move |i| (0..=resolution - i).map(move |j| (i, j)))
}

/// Compute the lattice resolution for one triangle.
///
/// `resolution = next_power_of_two(ceil(avg_edge_length * colors_per_unit))`,
/// clamped to a minimum of 1. Degenerate triangles have a zero average edge
/// length and land on the minimum.
#[inline]
fn triangle_resolution(avg_edge_length: f32, colors_per_unit: f32) -> u32 {
    let raw = (avg_edge_length * colors_per_unit).ceil();
    if raw <= 1.0 {
        return 1;
    }
    next_power_of_two(raw as u32)
}

/// Compute per-triangle patch resolutions and base addresses for a mesh.
///
/// Resolutions are derived from each triangle's average edge length (in the
/// mesh's own coordinate space) and the requested color density. Addresses
/// are a sequential prefix sum over the fixed triangle order, so the result
/// is deterministic for identical geometry and density.
///
/// The resolution pass runs in parallel by default; use
/// [`allocate_patches_sequential`] for single-threaded execution. Both
/// produce identical output.
///
/// # Example
///
/// ```
/// use patina::mesh::TriangleMesh;
/// use patina::patch::allocate_patches;
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
/// let layout = allocate_patches(&mesh, 3.0).unwrap();
/// assert_eq!(layout.meta[0].address, 0);
/// assert_eq!(layout.meta[0].resolution, 4);
/// ```
pub fn allocate_patches(mesh: &TriangleMesh, colors_per_unit: f32) -> Result<PatchLayout> {
    allocate_patches_impl(mesh, colors_per_unit, true)
}

/// Compute the patch layout single-threaded. Useful for benchmarking.
pub fn allocate_patches_sequential(mesh: &TriangleMesh, colors_per_unit: f32) -> Result<PatchLayout> {
    allocate_patches_impl(mesh, colors_per_unit, false)
}

fn allocate_patches_impl(
    mesh: &TriangleMesh,
    colors_per_unit: f32,
    parallel: bool,
) -> Result<PatchLayout> {
    if !(colors_per_unit > 0.0) {
        return Err(MeshColorError::InvalidDensity {
            value: colors_per_unit,
        });
    }

    let n = mesh.triangle_count();

    let resolutions: Vec<u32> = if parallel {
        (0..n)
            .into_par_iter()
            .map(|ti| triangle_resolution(mesh.average_edge_length(ti), colors_per_unit))
            .collect()
    } else {
        (0..n)
            .map(|ti| triangle_resolution(mesh.average_edge_length(ti), colors_per_unit))
            .collect()
    };

    // Addresses are a strict prefix sum over triangle order; this pass stays
    // sequential so every address is final before anything consumes it.
    let mut meta = Vec::with_capacity(n);
    let mut running_total = 0usize;
    for resolution in resolutions {
        meta.push(MetaInfo {
            address: running_total as u32,
            resolution,
        });
        running_total += colors_per_patch(resolution);
    }

    trace!(
        "allocated {} patches, {} colors total",
        meta.len(),
        running_total
    );

    Ok(PatchLayout {
        meta,
        total_color_count: running_total,
    })
}

//! Patch color sampling.
//!
//! This module fills a mesh's patch buffer by evaluating every patch lattice
//! point against a source image: barycentric weights interpolate the
//! triangle's corner UVs, the interpolated UV picks a pixel (point sampling,
//! no filtering), and the pixel's color lands at the lattice point's offset
//! within the patch.
//!
//! Sampling is optional — a mesh whose colors come from painting or baking
//! can skip it entirely, in which case patch memory keeps whatever contents
//! it had.
//!
//! # Example
//!
//! ```
//! use patina::mesh::TriangleMesh;
//! use patina::patch::{allocate_patches, Rgba8};
//! use patina::sampler::{sample_patches, SampleOptions};
//! use image::{Rgba, RgbaImage};
//! use nalgebra::{Point2, Point3};
//!
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
//! let layout = allocate_patches(&mesh, 2.0).unwrap();
//! let image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
//!
//! let mut patches = vec![Rgba8::new(0, 0, 0, 0); layout.total_color_count];
//! sample_patches(&mesh, &layout.meta, &image, &mut patches, &SampleOptions::default()).unwrap();
//!
//! assert!(patches.iter().all(|c| *c == Rgba8::new(255, 0, 0, 255)));
//! ```

use nalgebra::Point2;
use rayon::prelude::*;

use crate::error::{MeshColorError, Result};
use crate::mesh::TriangleMesh;
use crate::patch::{barycentric, colors_per_patch, MetaInfo, Rgba8};

/// A point-sampled 2D color source.
///
/// `Sync` is a supertrait because sampling fans out across triangles; any
/// image shared between threads read-only qualifies.
pub trait ImageSource: Sync {
    /// Image width in pixels.
    fn width(&self) -> u32;

    /// Image height in pixels.
    fn height(&self) -> u32;

    /// Fetch the pixel at the given coordinates.
    ///
    /// Coordinates are always within `0..width` and `0..height`; the sampler
    /// clamps before calling.
    fn sample(&self, x: u32, y: u32) -> Rgba8;
}

impl ImageSource for image::RgbaImage {
    #[inline]
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    #[inline]
    fn height(&self) -> u32 {
        self.dimensions().1
    }

    #[inline]
    fn sample(&self, x: u32, y: u32) -> Rgba8 {
        Rgba8::from(self.get_pixel(x, y).0)
    }
}

/// Options for patch sampling.
#[derive(Debug, Clone)]
pub struct SampleOptions {
    /// Whether to sample triangles in parallel (default: true).
    pub parallel: bool,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl SampleOptions {
    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Fill a patch buffer by point-sampling an image at every lattice point.
///
/// For each triangle, lattice point `(i, j)` is traversed with `i` outer and
/// `j` inner; its barycentric weights `(u, v, w)` interpolate the corner UVs
/// as `u*uv_a + v*uv_b + w*uv_c`, and the resulting UV is scaled by the image
/// size and truncated to pick a pixel. The traversal position is the color's
/// offset within the patch, so the buffer layout matches what any consumer of
/// [`MetaInfo`] addresses expects.
///
/// Triangles are sampled in parallel when `options.parallel` is set; each
/// patch is a disjoint sub-slice of `patches`, so the two modes produce
/// identical output.
///
/// # Errors
///
/// Fails with [`MeshColorError::MissingUvs`] if the mesh carries no UV
/// coordinates.
///
/// # Panics
///
/// Panics if `patches` is shorter than the layout's total color count, or if
/// `meta` does not match the mesh's triangle count. Buffers produced by
/// [`allocate_patches`](crate::patch::allocate_patches) always match.
pub fn sample_patches<S>(
    mesh: &TriangleMesh,
    meta: &[MetaInfo],
    image: &S,
    patches: &mut [Rgba8],
    options: &SampleOptions,
) -> Result<()>
where
    S: ImageSource + ?Sized,
{
    let uvs = mesh.uvs().ok_or(MeshColorError::MissingUvs)?;
    assert_eq!(meta.len(), mesh.triangle_count());

    // Carve the shared buffer into one disjoint slice per patch. Addresses
    // are a contiguous prefix sum, so this is a linear walk.
    let mut rest = patches;
    let mut patch_slices = Vec::with_capacity(meta.len());
    for info in meta {
        let (patch, tail) =
            std::mem::take(&mut rest).split_at_mut(colors_per_patch(info.resolution));
        patch_slices.push(patch);
        rest = tail;
    }

    let sample_one = |ti: usize, patch: &mut [Rgba8]| {
        let [a, b, c] = mesh.triangle(ti);
        let (uv_a, uv_b, uv_c) = (uvs[a as usize], uvs[b as usize], uvs[c as usize]);
        sample_triangle(uv_a, uv_b, uv_c, meta[ti].resolution, image, patch);
    };

    if options.parallel {
        patch_slices
            .into_par_iter()
            .enumerate()
            .for_each(|(ti, patch)| sample_one(ti, patch));
    } else {
        for (ti, patch) in patch_slices.into_iter().enumerate() {
            sample_one(ti, patch);
        }
    }

    Ok(())
}

/// Sample every lattice point of one patch.
fn sample_triangle<S>(
    uv_a: Point2<f32>,
    uv_b: Point2<f32>,
    uv_c: Point2<f32>,
    resolution: u32,
    image: &S,
    patch: &mut [Rgba8],
) where
    S: ImageSource + ?Sized,
{
    let width = image.width();
    let height = image.height();

    let mut offset = 0;
    for i in 0..=resolution {
        for j in 0..=resolution - i {
            let bary = barycentric(i, j, resolution);
            let uv = uv_a.coords * bary.x + uv_b.coords * bary.y + uv_c.coords * bary.z;

            // Truncate toward zero, then clamp into the image.
            let px = ((uv.x * width as f32) as i64).clamp(0, width as i64 - 1) as u32;
            let py = ((uv.y * height as f32) as i64).clamp(0, height as i64 - 1) as u32;

            patch[offset] = image.sample(px, py);
            offset += 1;
        }
    }
}

//! Multi-mesh registry over shared arenas.
//!
//! [`VirtualRegistry`] amortizes allocation across many meshes: instead of
//! one meta buffer and one adjacency buffer per mesh, every registered mesh
//! receives a contiguous sub-range of two shared, fixed-capacity arenas sized
//! once at construction. A renderer binds each arena as a single GPU buffer
//! and indexes into it with the per-mesh range offsets.
//!
//! Registration is atomic: a mesh either receives valid ranges in both
//! arenas, or the call fails with a capacity error and the registry is left
//! exactly as it was. Ranges are handed back on unregistration and reused by
//! later registrations (first-fit).
//!
//! The registry is a single mutation point; exclusive access is expressed
//! through `&mut self`, so no further locking is needed. Wrap it in a mutex
//! if registrations must come from several threads.
//!
//! # Example
//!
//! ```
//! use patina::mesh::TriangleMesh;
//! use patina::registry::{RegistryCapacity, VirtualRegistry};
//! use nalgebra::Point3;
//!
//! let mesh = TriangleMesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//!
//! let mut registry = VirtualRegistry::new(RegistryCapacity::default());
//! let handle = registry.register(&mesh, 2.0, None).unwrap();
//!
//! assert_eq!(registry.meta(handle).unwrap().len(), 1);
//! registry.unregister(handle).unwrap();
//! ```

use bytemuck::cast_slice;
use log::debug;

use crate::adjacency::{resolve_adjacency, AdjacencyInfo};
use crate::error::{MeshColorError, Result};
use crate::mesh::TriangleMesh;
use crate::patch::{allocate_patches, MetaInfo, Rgba8};
use crate::sampler::{sample_patches, ImageSource, SampleOptions};

/// Arena and mesh-count bounds for a [`VirtualRegistry`].
///
/// Fixed at construction; every registration is validated against them.
#[derive(Debug, Clone)]
pub struct RegistryCapacity {
    /// Maximum number of simultaneously registered meshes.
    pub max_meshes: usize,
    /// Total meta slots (one per triangle) in the shared meta arena.
    pub meta_slots: usize,
    /// Total adjacency slots (one per triangle) in the shared adjacency arena.
    pub adjacency_slots: usize,
    /// Ceiling on the color density a registration may request; higher
    /// requests are clamped down to protect the arenas.
    pub max_colors_per_unit: f32,
}

impl Default for RegistryCapacity {
    fn default() -> Self {
        Self {
            max_meshes: 512,
            meta_slots: 1 << 20,
            adjacency_slots: 1 << 20,
            max_colors_per_unit: 256.0,
        }
    }
}

impl RegistryCapacity {
    /// Set the maximum number of registered meshes.
    pub fn with_max_meshes(mut self, max_meshes: usize) -> Self {
        self.max_meshes = max_meshes;
        self
    }

    /// Set the meta arena capacity in slots.
    pub fn with_meta_slots(mut self, meta_slots: usize) -> Self {
        self.meta_slots = meta_slots;
        self
    }

    /// Set the adjacency arena capacity in slots.
    pub fn with_adjacency_slots(mut self, adjacency_slots: usize) -> Self {
        self.adjacency_slots = adjacency_slots;
        self
    }

    /// Set the density ceiling.
    pub fn with_max_colors_per_unit(mut self, max_colors_per_unit: f32) -> Self {
        self.max_colors_per_unit = max_colors_per_unit;
        self
    }
}

/// Handle to a registered mesh.
///
/// Handles are generation-checked: after the mesh is unregistered, the handle
/// goes stale and every registry call with it fails with
/// [`MeshColorError::UnknownMesh`], even if the slot has been reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle {
    index: u32,
    generation: u32,
}

/// First-fit allocator over `[0, capacity)`, tracking occupied ranges sorted
/// by offset. Releasing a range implicitly coalesces free space, since only
/// occupied ranges are stored.
#[derive(Debug)]
struct RangeAllocator {
    capacity: usize,
    ranges: Vec<(usize, usize)>,
}

impl RangeAllocator {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ranges: Vec::new(),
        }
    }

    /// Reserve `len` contiguous slots, returning the range offset.
    fn allocate(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return Some(0);
        }

        let mut cursor = 0;
        for (i, &(start, rlen)) in self.ranges.iter().enumerate() {
            if start - cursor >= len {
                self.ranges.insert(i, (cursor, len));
                return Some(cursor);
            }
            cursor = start + rlen;
        }

        if self.capacity >= cursor + len {
            self.ranges.push((cursor, len));
            return Some(cursor);
        }

        None
    }

    /// Return a previously allocated range.
    fn release(&mut self, offset: usize, len: usize) {
        if len == 0 {
            return;
        }
        let position = self
            .ranges
            .iter()
            .position(|&(start, rlen)| start == offset && rlen == len);
        debug_assert!(position.is_some(), "releasing unknown range");
        if let Some(i) = position {
            self.ranges.remove(i);
        }
    }

    /// Total occupied slots.
    fn used(&self) -> usize {
        self.ranges.iter().map(|&(_, len)| len).sum()
    }
}

/// Data held for one registered mesh.
#[derive(Debug)]
struct Entry {
    meta_offset: usize,
    adjacency_offset: usize,
    triangle_count: usize,
    patches: Vec<Rgba8>,
}

/// One registry slot. The generation advances every time the slot's mesh is
/// unregistered, invalidating outstanding handles.
#[derive(Debug)]
struct Slot {
    generation: u32,
    entry: Option<Entry>,
}

/// Registry sub-allocating many meshes' color data out of shared arenas.
///
/// See the [module documentation](self) for the overall contract.
#[derive(Debug)]
pub struct VirtualRegistry {
    capacity: RegistryCapacity,
    meta_arena: Vec<MetaInfo>,
    adjacency_arena: Vec<AdjacencyInfo>,
    meta_ranges: RangeAllocator,
    adjacency_ranges: RangeAllocator,
    slots: Vec<Slot>,
    free_slots: Vec<usize>,
    registered: usize,
}

impl VirtualRegistry {
    /// Create a registry with the given capacities. Arena storage is
    /// allocated up front and never grows.
    pub fn new(capacity: RegistryCapacity) -> Self {
        let meta_arena = vec![MetaInfo { address: 0, resolution: 0 }; capacity.meta_slots];
        let adjacency_arena = vec![AdjacencyInfo::ISOLATED; capacity.adjacency_slots];
        let meta_ranges = RangeAllocator::new(capacity.meta_slots);
        let adjacency_ranges = RangeAllocator::new(capacity.adjacency_slots);

        Self {
            capacity,
            meta_arena,
            adjacency_arena,
            meta_ranges,
            adjacency_ranges,
            slots: Vec::new(),
            free_slots: Vec::new(),
            registered: 0,
        }
    }

    /// Register a mesh: compute its color data and reserve arena ranges.
    ///
    /// Runs patch allocation, adjacency resolution, and — when `image` is
    /// supplied — sampling, then reserves one meta slot and one adjacency
    /// slot per triangle. Without an image the mesh's patch buffer is left
    /// unsampled (contents unspecified).
    ///
    /// On any failure (invalid density, mesh-count bound, arena exhaustion,
    /// sampling error) the registry is left unchanged.
    pub fn register(
        &mut self,
        mesh: &TriangleMesh,
        colors_per_unit: f32,
        image: Option<&dyn ImageSource>,
    ) -> Result<MeshHandle> {
        if !(colors_per_unit > 0.0) {
            return Err(MeshColorError::InvalidDensity {
                value: colors_per_unit,
            });
        }
        if self.registered == self.capacity.max_meshes {
            return Err(MeshColorError::MeshCapacityExceeded {
                capacity: self.capacity.max_meshes,
            });
        }

        let density = colors_per_unit.min(self.capacity.max_colors_per_unit);

        // Compute everything before touching registry state, so failure
        // leaves no partial registration behind.
        let layout = allocate_patches(mesh, density)?;
        let adjacency = resolve_adjacency(mesh.triangles());
        let mut patches = vec![Rgba8::new(0, 0, 0, 0); layout.total_color_count];
        if let Some(image) = image {
            sample_patches(mesh, &layout.meta, image, &mut patches, &SampleOptions::default())?;
        }

        let triangle_count = mesh.triangle_count();

        let meta_offset = self.meta_ranges.allocate(triangle_count).ok_or(
            MeshColorError::ArenaExhausted {
                arena: "meta",
                requested: triangle_count,
                capacity: self.capacity.meta_slots,
            },
        )?;
        let adjacency_offset = match self.adjacency_ranges.allocate(triangle_count) {
            Some(offset) => offset,
            None => {
                self.meta_ranges.release(meta_offset, triangle_count);
                return Err(MeshColorError::ArenaExhausted {
                    arena: "adjacency",
                    requested: triangle_count,
                    capacity: self.capacity.adjacency_slots,
                });
            }
        };

        self.meta_arena[meta_offset..meta_offset + triangle_count].copy_from_slice(&layout.meta);
        self.adjacency_arena[adjacency_offset..adjacency_offset + triangle_count]
            .copy_from_slice(&adjacency);

        let entry = Entry {
            meta_offset,
            adjacency_offset,
            triangle_count,
            patches,
        };

        let index = match self.free_slots.pop() {
            Some(index) => {
                self.slots[index].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                self.slots.len() - 1
            }
        };
        self.registered += 1;

        debug!(
            "registered mesh: {} triangles, meta range {}..{}, adjacency range {}..{}",
            triangle_count,
            meta_offset,
            meta_offset + triangle_count,
            adjacency_offset,
            adjacency_offset + triangle_count,
        );

        Ok(MeshHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        })
    }

    /// Unregister a mesh, releasing its arena ranges for reuse.
    ///
    /// The handle (and any copy of it) goes stale.
    pub fn unregister(&mut self, handle: MeshHandle) -> Result<()> {
        let index = handle.index as usize;
        let slot = self
            .slots
            .get_mut(index)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(MeshColorError::UnknownMesh)?;
        let entry = slot.entry.take().ok_or(MeshColorError::UnknownMesh)?;
        slot.generation += 1;

        self.meta_ranges.release(entry.meta_offset, entry.triangle_count);
        self.adjacency_ranges
            .release(entry.adjacency_offset, entry.triangle_count);
        self.free_slots.push(index);
        self.registered -= 1;

        debug!(
            "unregistered mesh: released meta range {}..{}",
            entry.meta_offset,
            entry.meta_offset + entry.triangle_count,
        );

        Ok(())
    }

    /// Per-triangle meta records of a registered mesh.
    pub fn meta(&self, handle: MeshHandle) -> Result<&[MetaInfo]> {
        let entry = self.entry(handle)?;
        Ok(&self.meta_arena[entry.meta_offset..entry.meta_offset + entry.triangle_count])
    }

    /// Per-triangle adjacency records of a registered mesh.
    pub fn adjacency(&self, handle: MeshHandle) -> Result<&[AdjacencyInfo]> {
        let entry = self.entry(handle)?;
        Ok(&self.adjacency_arena
            [entry.adjacency_offset..entry.adjacency_offset + entry.triangle_count])
    }

    /// Patch colors of a registered mesh.
    pub fn patches(&self, handle: MeshHandle) -> Result<&[Rgba8]> {
        Ok(&self.entry(handle)?.patches)
    }

    /// Offset and length of a mesh's range in the meta arena.
    pub fn meta_range(&self, handle: MeshHandle) -> Result<(usize, usize)> {
        let entry = self.entry(handle)?;
        Ok((entry.meta_offset, entry.triangle_count))
    }

    /// Offset and length of a mesh's range in the adjacency arena.
    pub fn adjacency_range(&self, handle: MeshHandle) -> Result<(usize, usize)> {
        let entry = self.entry(handle)?;
        Ok((entry.adjacency_offset, entry.triangle_count))
    }

    /// The whole meta arena as tightly packed bytes, for GPU upload.
    pub fn meta_arena_bytes(&self) -> &[u8] {
        cast_slice(&self.meta_arena)
    }

    /// The whole adjacency arena as tightly packed bytes, for GPU upload.
    pub fn adjacency_arena_bytes(&self) -> &[u8] {
        cast_slice(&self.adjacency_arena)
    }

    /// Number of currently registered meshes.
    #[inline]
    pub fn mesh_count(&self) -> usize {
        self.registered
    }

    /// Occupied slots in the meta arena.
    #[inline]
    pub fn meta_slots_used(&self) -> usize {
        self.meta_ranges.used()
    }

    /// Occupied slots in the adjacency arena.
    #[inline]
    pub fn adjacency_slots_used(&self) -> usize {
        self.adjacency_ranges.used()
    }

    /// The capacities this registry was built with.
    #[inline]
    pub fn registry_capacity(&self) -> &RegistryCapacity {
        &self.capacity
    }

    fn entry(&self, handle: MeshHandle) -> Result<&Entry> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(MeshColorError::UnknownMesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use nalgebra::{Point2, Point3};

    /// A tiny two-triangle quad; resolution 1 everywhere at low density.
    fn small_quad() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.01, 0.0, 0.0),
                Point3::new(0.01, 0.01, 0.0),
                Point3::new(0.0, 0.01, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
        .with_uvs(vec![
            Point2::new(0.5, 0.5),
            Point2::new(0.5, 0.5),
            Point2::new(0.5, 0.5),
            Point2::new(0.5, 0.5),
        ])
        .unwrap()
    }

    fn small_capacity() -> RegistryCapacity {
        RegistryCapacity::default()
            .with_max_meshes(8)
            .with_meta_slots(8)
            .with_adjacency_slots(8)
    }

    #[test]
    fn test_register_and_read_back() {
        let mut registry = VirtualRegistry::new(small_capacity());
        let mesh = small_quad();

        let handle = registry.register(&mesh, 1.0, None).unwrap();
        assert_eq!(registry.mesh_count(), 1);
        assert_eq!(registry.meta_slots_used(), 2);

        let meta = registry.meta(handle).unwrap();
        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0].address, 0);
        assert_eq!(meta[0].resolution, 1);

        let adjacency = registry.adjacency(handle).unwrap();
        assert_eq!(adjacency.len(), 2);

        // Each resolution-1 patch holds 3 colors.
        assert_eq!(registry.patches(handle).unwrap().len(), 6);
    }

    #[test]
    fn test_meta_capacity_exhaustion_is_clean() {
        // 8 meta slots, 2 per mesh: four registrations fit, the fifth fails.
        let mut registry = VirtualRegistry::new(small_capacity());
        let mesh = small_quad();

        for _ in 0..4 {
            registry.register(&mesh, 1.0, None).unwrap();
        }
        assert_eq!(registry.meta_slots_used(), 8);

        let result = registry.register(&mesh, 1.0, None);
        assert!(matches!(
            result,
            Err(MeshColorError::ArenaExhausted { arena: "meta", requested: 2, capacity: 8 })
        ));

        // Failure must not disturb arena state.
        assert_eq!(registry.mesh_count(), 4);
        assert_eq!(registry.meta_slots_used(), 8);
        assert_eq!(registry.adjacency_slots_used(), 8);
    }

    #[test]
    fn test_adjacency_exhaustion_rolls_back_meta() {
        let capacity = small_capacity().with_adjacency_slots(3);
        let mut registry = VirtualRegistry::new(capacity);
        let mesh = small_quad();

        registry.register(&mesh, 1.0, None).unwrap();
        let result = registry.register(&mesh, 1.0, None);
        assert!(matches!(
            result,
            Err(MeshColorError::ArenaExhausted { arena: "adjacency", .. })
        ));

        // The meta range reserved before the adjacency failure was returned.
        assert_eq!(registry.meta_slots_used(), 2);
        assert_eq!(registry.mesh_count(), 1);
    }

    #[test]
    fn test_mesh_count_bound() {
        let mut registry = VirtualRegistry::new(small_capacity().with_max_meshes(1));
        let mesh = small_quad();

        registry.register(&mesh, 1.0, None).unwrap();
        let result = registry.register(&mesh, 1.0, None);
        assert!(matches!(
            result,
            Err(MeshColorError::MeshCapacityExceeded { capacity: 1 })
        ));
    }

    #[test]
    fn test_unregister_releases_ranges() {
        let mut registry = VirtualRegistry::new(small_capacity());
        let mesh = small_quad();

        let a = registry.register(&mesh, 1.0, None).unwrap();
        let b = registry.register(&mesh, 1.0, None).unwrap();
        let c = registry.register(&mesh, 1.0, None).unwrap();
        assert_eq!(registry.meta_range(a).unwrap(), (0, 2));
        assert_eq!(registry.meta_range(b).unwrap(), (2, 2));
        assert_eq!(registry.meta_range(c).unwrap(), (4, 2));

        // Free the middle mesh; first-fit places the next one in its gap.
        registry.unregister(b).unwrap();
        assert_eq!(registry.meta_slots_used(), 4);

        let d = registry.register(&mesh, 1.0, None).unwrap();
        assert_eq!(registry.meta_range(d).unwrap(), (2, 2));
        assert_eq!(registry.mesh_count(), 3);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut registry = VirtualRegistry::new(small_capacity());
        let mesh = small_quad();

        let handle = registry.register(&mesh, 1.0, None).unwrap();
        registry.unregister(handle).unwrap();

        assert!(matches!(registry.meta(handle), Err(MeshColorError::UnknownMesh)));
        assert!(matches!(registry.unregister(handle), Err(MeshColorError::UnknownMesh)));

        // Slot reuse must not revive the old handle.
        let fresh = registry.register(&mesh, 1.0, None).unwrap();
        assert!(matches!(registry.meta(handle), Err(MeshColorError::UnknownMesh)));
        assert!(registry.meta(fresh).is_ok());
    }

    #[test]
    fn test_register_with_image_samples_patches() {
        let mut registry = VirtualRegistry::new(small_capacity());
        let mesh = small_quad();
        let image = RgbaImage::from_pixel(2, 2, Rgba([9, 8, 7, 255]));

        let handle = registry.register(&mesh, 1.0, Some(&image)).unwrap();
        let patches = registry.patches(handle).unwrap();
        assert!(patches.iter().all(|c| *c == Rgba8::new(9, 8, 7, 255)));
    }

    #[test]
    fn test_density_clamped_to_ceiling() {
        // A unit-scale quad at the 256 ceiling: both requests resolve to the
        // same patch layout.
        let mesh = TriangleMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();

        let capacity = RegistryCapacity::default()
            .with_max_meshes(4)
            .with_meta_slots(4)
            .with_adjacency_slots(4);
        let mut registry = VirtualRegistry::new(capacity);

        let clamped = registry.register(&mesh, 1e6, None).unwrap();
        let at_ceiling = registry.register(&mesh, 256.0, None).unwrap();
        assert_eq!(
            registry.meta(clamped).unwrap(),
            registry.meta(at_ceiling).unwrap()
        );
    }

    #[test]
    fn test_invalid_density_rejected_before_clamping() {
        let mut registry = VirtualRegistry::new(small_capacity());
        let mesh = small_quad();

        assert!(matches!(
            registry.register(&mesh, f32::NAN, None),
            Err(MeshColorError::InvalidDensity { .. })
        ));
        assert!(matches!(
            registry.register(&mesh, -2.0, None),
            Err(MeshColorError::InvalidDensity { .. })
        ));
        assert_eq!(registry.mesh_count(), 0);
    }

    #[test]
    fn test_arena_bytes_cover_whole_capacity() {
        let registry = VirtualRegistry::new(small_capacity());
        assert_eq!(registry.meta_arena_bytes().len(), 8 * 8);
        assert_eq!(registry.adjacency_arena_bytes().len(), 8 * 24);
    }
}

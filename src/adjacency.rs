//! Triangle adjacency resolution.
//!
//! This module infers, from triangle index data alone, which triangle sits
//! across each of a triangle's three edges — the connectivity a renderer
//! needs to filter seamlessly across patch boundaries. The result is one
//! [`AdjacencyInfo`] record per triangle: for each local edge, the
//! neighboring triangle index and *its* local edge index, or [`BOUNDARY`] in
//! both fields when the edge has no second triangle.
//!
//! # Local edges
//!
//! With a triangle's corners in declared order A, B, C, its local edges are
//! numbered by one fixed convention used everywhere in this crate:
//!
//! | local edge | corners |
//! |------------|---------|
//! | 0          | A, C    |
//! | 1          | A, B    |
//! | 2          | B, C    |
//!
//! Both resolution passes use this same mapping; neighbor and local-edge
//! results are only meaningful under a single consistent convention.
//!
//! # Algorithm
//!
//! Two passes over the triangle list. The first builds a map from each
//! undirected edge ([`EdgeKey`], a canonicalized vertex pair with value
//! equality) to the at most two `(triangle, local edge)` occurrences of that
//! edge. The second pass looks every edge up again: one occurrence means
//! boundary, two means the other occurrence is the neighbor. The map pass
//! completes fully before pairing begins, since an edge's second occurrence
//! may come from a later triangle.
//!
//! Non-manifold input (three or more triangles sharing an edge) keeps the
//! first two occurrences and silently ignores the rest; callers that require
//! manifold meshes should validate beforehand.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

/// Sentinel marking a boundary edge: no neighboring triangle.
pub const BOUNDARY: u32 = u32::MAX;

/// Per-triangle adjacency, in the exact layout GPU consumers bind.
///
/// Slot `e` of both arrays describes the triangle sharing local edge `e`, or
/// holds [`BOUNDARY`] in both when that edge is on the mesh boundary.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct AdjacencyInfo {
    /// Neighboring triangle index per local edge.
    pub neighbor_triangle: [u32; 3],
    /// The neighbor's own local edge index per local edge.
    pub neighbor_local_edge: [u32; 3],
}

impl AdjacencyInfo {
    /// Adjacency for a fully isolated triangle: all three edges boundary.
    pub const ISOLATED: Self = Self {
        neighbor_triangle: [BOUNDARY; 3],
        neighbor_local_edge: [BOUNDARY; 3],
    };

    /// Check whether local edge `e` is a boundary edge.
    #[inline]
    pub fn is_boundary(&self, e: usize) -> bool {
        self.neighbor_triangle[e] == BOUNDARY
    }
}

/// An undirected mesh edge, identified by its two vertex indices.
///
/// The pair is canonicalized (smaller index first) so the same physical edge
/// hashes and compares equal no matter which triangle or winding reports it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    lo: u32,
    hi: u32,
}

impl EdgeKey {
    /// Create the key for the undirected edge between two vertices.
    #[inline]
    pub fn new(v0: u32, v1: u32) -> Self {
        if v0 <= v1 {
            Self { lo: v0, hi: v1 }
        } else {
            Self { lo: v1, hi: v0 }
        }
    }

    /// The smaller vertex index.
    #[inline]
    pub fn lo(&self) -> u32 {
        self.lo
    }

    /// The larger vertex index.
    #[inline]
    pub fn hi(&self) -> u32 {
        self.hi
    }
}

/// One appearance of an edge: which triangle, and which of its local edges.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Occurrence {
    triangle: u32,
    local_edge: u32,
}

/// The at most two triangles seen sharing an edge.
///
/// A well-formed manifold mesh never produces more than two; additional
/// occurrences indicate non-manifold geometry and are dropped.
#[derive(Copy, Clone, Debug)]
struct EdgeSlots {
    first: Occurrence,
    second: Option<Occurrence>,
}

impl EdgeSlots {
    fn push(&mut self, occ: Occurrence) {
        if self.second.is_none() && self.first != occ {
            self.second = Some(occ);
        }
        // Third and later occurrences: non-manifold, keep the first two.
    }

    /// The stored occurrence that is not `this`, if any.
    fn other_than(&self, this: Occurrence) -> Option<Occurrence> {
        if self.first != this {
            Some(self.first)
        } else {
            self.second
        }
    }
}

/// Corner pair of a triangle's local edge, under the fixed convention
/// edge 0 = (A, C), edge 1 = (A, B), edge 2 = (B, C).
#[inline]
fn local_edge_vertices(tri: [u32; 3], local_edge: usize) -> (u32, u32) {
    let [a, b, c] = tri;
    match local_edge {
        0 => (a, c),
        1 => (a, b),
        _ => (b, c),
    }
}

/// Resolve triangle adjacency from an index list.
///
/// Returns one [`AdjacencyInfo`] per triangle, in triangle order. For any two
/// triangles sharing an edge the result is symmetric: if resolving T1's edge
/// yields `(T2, e2)`, then resolving T2's edge `e2` yields T1 and the
/// original edge back.
///
/// # Example
///
/// ```
/// use patina::adjacency::{resolve_adjacency, BOUNDARY};
///
/// // Two triangles sharing the edge (0, 2).
/// let adjacency = resolve_adjacency(&[[0, 1, 2], [0, 2, 3]]);
///
/// // Triangle 0's local edge 0 is (0, 2): its neighbor is triangle 1.
/// assert_eq!(adjacency[0].neighbor_triangle[0], 1);
/// // Triangle 0's local edge 1 is (0, 1): a boundary.
/// assert_eq!(adjacency[0].neighbor_triangle[1], BOUNDARY);
/// ```
pub fn resolve_adjacency(triangles: &[[u32; 3]]) -> Vec<AdjacencyInfo> {
    // Pass 1: collect the occurrences of every undirected edge. Must finish
    // before pairing; an edge's second triangle may appear later in the list.
    let mut edges: HashMap<EdgeKey, EdgeSlots> = HashMap::with_capacity(triangles.len() * 3 / 2);

    for (ti, &tri) in triangles.iter().enumerate() {
        for local_edge in 0..3 {
            let (v0, v1) = local_edge_vertices(tri, local_edge);
            let occ = Occurrence {
                triangle: ti as u32,
                local_edge: local_edge as u32,
            };
            edges
                .entry(EdgeKey::new(v0, v1))
                .and_modify(|slots| slots.push(occ))
                .or_insert(EdgeSlots {
                    first: occ,
                    second: None,
                });
        }
    }

    // Pass 2: for each edge, the neighbor is whichever stored occurrence is
    // not this (triangle, local edge) pair itself.
    triangles
        .iter()
        .enumerate()
        .map(|(ti, &tri)| {
            let mut info = AdjacencyInfo::ISOLATED;

            for local_edge in 0..3 {
                let (v0, v1) = local_edge_vertices(tri, local_edge);
                let this = Occurrence {
                    triangle: ti as u32,
                    local_edge: local_edge as u32,
                };

                let slots = &edges[&EdgeKey::new(v0, v1)];
                if let Some(neighbor) = slots.other_than(this) {
                    info.neighbor_triangle[local_edge] = neighbor.triangle;
                    info.neighbor_local_edge[local_edge] = neighbor.local_edge;
                }
            }

            info
        })
        .collect()
}

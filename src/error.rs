//! Error types for patina.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Result type alias using [`MeshColorError`].
pub type Result<T> = std::result::Result<T, MeshColorError>;

/// Errors that can occur while building or registering mesh color data.
#[derive(Error, Debug)]
pub enum MeshColorError {
    /// A triangle references a vertex index outside the position array.
    #[error("triangle {triangle} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The triangle index.
        triangle: usize,
        /// The invalid vertex index.
        vertex: u32,
    },

    /// The per-vertex UV array does not match the position array.
    #[error("UV count {uvs} does not match vertex count {vertices}")]
    UvCountMismatch {
        /// Number of UV coordinates supplied.
        uvs: usize,
        /// Number of vertex positions.
        vertices: usize,
    },

    /// Sampling was requested on a mesh without UV coordinates.
    #[error("mesh has no UV coordinates to sample with")]
    MissingUvs,

    /// The color density parameter is not a positive number.
    #[error("colors per unit must be positive, got {value}")]
    InvalidDensity {
        /// The rejected density value.
        value: f32,
    },

    /// The registry already holds its maximum number of meshes.
    #[error("registry is full ({capacity} meshes)")]
    MeshCapacityExceeded {
        /// The configured mesh capacity.
        capacity: usize,
    },

    /// A shared arena cannot fit the requested range.
    #[error("{arena} arena exhausted: requested {requested} slots, capacity {capacity}")]
    ArenaExhausted {
        /// Which arena ran out ("meta" or "adjacency").
        arena: &'static str,
        /// Number of slots the registration needed.
        requested: usize,
        /// Total capacity of the arena.
        capacity: usize,
    },

    /// A mesh handle does not refer to a currently registered mesh.
    #[error("mesh handle is stale or was never registered")]
    UnknownMesh,
}

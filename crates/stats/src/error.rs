//! Statistics error types.

use thiserror::Error;

/// Errors from adjacency construction and correction procedures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// A face references a vertex outside the mesh.
    #[error("Face {face} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    InvalidFace {
        face: usize,
        vertex: u32,
        vertex_count: usize,
    },

    /// The adjacency graph was built for a different mesh.
    #[error("Adjacency covers {expected} vertices but {got} values were given")]
    AdjacencyMismatch { expected: usize, got: usize },

    /// A correction parameter is out of its valid domain.
    #[error("Invalid {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Two parallel arrays have different lengths.
    #[error("Length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

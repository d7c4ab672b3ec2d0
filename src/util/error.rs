//! Error types for meshpick.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a mesh is rejected from BVH construction.
///
/// A rejected mesh is excluded from the pick set; it never affects the
/// trees of other meshes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedGeometry {
    /// Index buffer length does not describe whole triangles
    #[error("Index count {len} is not a multiple of 3")]
    IndexCountNotMultipleOfThree { len: usize },

    /// An index points past the end of the vertex buffer
    #[error("Index {index} at position {position} out of range (vertex count: {vertex_count})")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },

    /// Index buffer too large to address with 32-bit node ranges
    #[error("Index count {len} exceeds the 32-bit range addressable by BVH nodes")]
    TooManyIndices { len: usize },

    /// A leaf must be allowed to hold at least one triangle
    #[error("Leaf threshold must be at least 1")]
    ZeroLeafThreshold,
}

/// Main error type for meshpick operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Mesh rejected at build time
    #[error("Malformed geometry: {0}")]
    MalformedGeometry(#[from] MalformedGeometry),

    /// Instance matrix cannot be inverted
    #[error("Non-invertible instance transform (determinant: {determinant})")]
    NonInvertibleTransform { determinant: f32 },

    /// Settings value outside its valid range
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type alias for meshpick operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for mesh construction, PLY I/O, and scene editing.
//!
//! Hit tests never fail: a ray that misses everything yields `None`, not an
//! error. The enums here cover the hard failures only.

use thiserror::Error;

/// Errors raised while building a [`TriangleMesh`](crate::TriangleMesh).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The index buffer does not describe whole triangles.
    #[error("index count {0} is not a multiple of 3")]
    IndexCount(usize),

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },

    /// Per-vertex colors do not line up with the vertex buffer.
    #[error("{colors} colors supplied for {vertices} vertices")]
    ColorCount { colors: usize, vertices: usize },
}

/// Errors raised while reading or writing PLY files.
#[derive(Error, Debug)]
pub enum PlyError {
    /// The file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is PLY, but not a flavour this codec understands.
    #[error("unsupported PLY format: {0}")]
    UnsupportedFormat(String),

    /// The header is missing a required line or declares things out of order.
    #[error("malformed header at line {line}: {reason}")]
    MalformedHeader { line: usize, reason: String },

    /// The body ended before every declared element was read.
    #[error("truncated file: expected {expected} {element} lines, found {found}")]
    Truncated {
        element: &'static str,
        expected: usize,
        found: usize,
    },

    /// A token in the body could not be parsed as a number.
    #[error("invalid number {token:?} at line {line}")]
    InvalidNumber { line: usize, token: String },

    /// A vertex line does not match the declared properties.
    #[error("invalid vertex at line {line}: {reason}")]
    InvalidVertex { line: usize, reason: String },

    /// A face line is cut short or otherwise unusable.
    #[error("invalid face at line {line}: {reason}")]
    InvalidFace { line: usize, reason: String },

    /// The parsed data does not form a valid mesh.
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

/// Errors raised by [`Scene`](crate::Scene) operations.
#[derive(Error, Debug)]
pub enum SceneError {
    /// The node handle is stale or never belonged to this scene.
    #[error("no such node: {0:?}")]
    NoSuchNode(hecs::Entity),

    /// Attaching would make a node its own ancestor.
    #[error("attaching {child:?} under {parent:?} would create a cycle")]
    Cycle {
        child: hecs::Entity,
        parent: hecs::Entity,
    },

    /// The node exists but holds something other than a triangle mesh.
    #[error("node {0:?} is not a mesh")]
    NotAMesh(hecs::Entity),

    /// Loading a mesh into the scene failed.
    #[error(transparent)]
    Ply(#[from] PlyError),
}

/// Result type for mesh construction.
pub type MeshResult<T> = std::result::Result<T, MeshError>;

/// Result type for PLY I/O.
pub type PlyResult<T> = std::result::Result<T, PlyError>;

/// Result type for scene operations.
pub type SceneResult<T> = std::result::Result<T, SceneError>;

//! Error types for shapekit.
//!
//! Every operation in the crate reports failures through [`ShapeError`]. No
//! operation mutates a mesh when it returns an error.

use thiserror::Error;

/// Result type alias using [`ShapeError`].
pub type Result<T> = std::result::Result<T, ShapeError>;

/// Errors that can occur during shape key operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// The object exists but carries no vertex geometry.
    #[error("object '{object}' is not a mesh")]
    NotAMesh {
        /// Name of the offending object.
        object: String,
    },

    /// The handle does not refer to any object in the scene.
    #[error("no object with handle {handle}")]
    UnknownObject {
        /// The raw handle value.
        handle: u32,
    },

    /// The mesh has no shape keys besides its basis.
    #[error("mesh has no shape keys")]
    NoFields,

    /// An operation was requested with nothing selected.
    #[error("empty selection")]
    EmptySelection,

    /// A per-vertex array does not match the vertex count.
    #[error("{what} has {actual} entries, expected {expected}")]
    DimensionMismatch {
        /// What was measured.
        what: String,
        /// Expected length (the vertex count).
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// The mesh has no vertices.
    #[error("mesh has no vertices")]
    DegenerateGeometry,

    /// The operation is not allowed in the current session state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A named shape key does not exist.
    #[error("shape key '{name}' not found")]
    FieldNotFound {
        /// The requested key name.
        name: String,
    },

    /// A shape key with this name already exists.
    #[error("shape key '{name}' already exists")]
    DuplicateField {
        /// The conflicting key name.
        name: String,
    },

    /// A face or edge references a vertex that does not exist.
    #[error("element {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face (or edge) index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has fewer than three distinct vertices.
    #[error("face {face} is degenerate")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// Another tool already holds the preview of this mesh.
    #[error("mesh {mesh} is already previewed by the {owner} tool")]
    PreviewBusy {
        /// The raw mesh handle.
        mesh: u32,
        /// Name of the tool holding the preview.
        owner: &'static str,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl ShapeError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        ShapeError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a dimension mismatch error.
    pub fn mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        ShapeError::DimensionMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// Check a per-vertex array length against the expected vertex count.
    pub(crate) fn check_len(what: &str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::mismatch(what, expected, actual))
        }
    }
}

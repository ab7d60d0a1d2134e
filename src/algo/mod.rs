//! Displacement field algorithms.
//!
//! The algorithms work on plain position arrays and a [`MeshGraph`](crate::mesh::MeshGraph);
//! they never touch a mesh directly and return new arrays instead of writing
//! in place, so a caller can commit a whole pass at once or drop it.
//!
//! - **Smoothing**: damped graph-Laplacian smoothing of a field's offsets
//! - **Transfer**: inverse-distance resampling onto an unrelated vertex set
//! - **Degeneracy**: tolerance comparison of a field against its reference
//! - **Influence**: clearing a field's displacement on selected vertices
//! - **Weights**: radius-based smoothing of vertex group weights

pub mod degenerate;
pub mod influence;
mod progress;
pub mod smooth;
pub mod transfer;
pub mod weights;

pub use progress::Progress;

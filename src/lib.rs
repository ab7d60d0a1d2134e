//! # Shapekit
//!
//! Shape key (displacement field) processing for polygon meshes.
//!
//! A shape key stores an absolute position for every vertex of a mesh; its
//! displacement is the difference to a reference key, usually the `Basis`.
//! Shapekit provides the operations that clean up and move such keys, and a
//! controller that previews them live with exact undo.
//!
//! ## Features
//!
//! - **Smoothing**: damped neighbor averaging of a key's offsets over the
//!   mesh's live edge topology
//! - **Transfer**: inverse-distance resampling of keys onto a mesh with
//!   unrelated topology, optionally accelerated with a k-d tree
//! - **Degeneracy detection**: finding keys that do not move anything
//! - **Live preview**: snapshot, recompute and restore under re-entrant
//!   change notifications
//!
//! ## Quick Start
//!
//! ```
//! use shapekit::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh = KeyedMesh::new(vertices.clone(), vec![vec![0, 1, 2, 3]]).unwrap();
//!
//! // A key that lifts one corner, and one that does nothing
//! let mut lifted = vertices.clone();
//! lifted[2].z = 0.5;
//! mesh.add_shape_key("lift", lifted).unwrap();
//! mesh.add_shape_key("noop", vertices).unwrap();
//!
//! let options = SmoothOptions::default().with_iterations(2);
//! smooth_shape_key(&mut mesh, "lift", &options).unwrap();
//!
//! let removed = remove_degenerate(&mut mesh, &DetectOptions::default()).unwrap();
//! assert_eq!(removed, vec!["noop".to_string()]);
//! ```
//!
//! ## Transferring Keys
//!
//! ```
//! use shapekit::prelude::*;
//! use nalgebra::Point3;
//!
//! let source_vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut source = KeyedMesh::from_triangles(source_vertices.clone(), &[[0, 1, 2]]).unwrap();
//! let raised: Vec<_> = source_vertices.iter().map(|p| p + nalgebra::Vector3::z()).collect();
//! source.add_shape_key("raise", raised).unwrap();
//!
//! // Same points, different topology: a polyline
//! let mut target = KeyedMesh::from_edges(source_vertices, vec![[0, 1], [1, 2]]).unwrap();
//!
//! let report = transfer_shape_keys(
//!     &source,
//!     &mut target,
//!     &FieldSelection::All,
//!     &TransferOptions::default().with_search(SearchStrategy::KdTree),
//! )
//! .unwrap();
//! assert_eq!(report.created, vec!["raise".to_string()]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod mesh;
pub mod ops;
pub mod scene;
pub mod session;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use shapekit::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::degenerate::{is_degenerate, DetectOptions};
    pub use crate::algo::smooth::{smooth_field, SmoothOptions};
    pub use crate::algo::transfer::{transfer_field, SearchStrategy, TransferOptions};
    pub use crate::algo::weights::WeightSmoothOptions;
    pub use crate::algo::Progress;
    pub use crate::error::{Result, ShapeError};
    pub use crate::mesh::{
        DeformableMesh, KeyedMesh, MeshGraph, ShapeKey, ShapeKeySet, VertexGroup, BASIS_KEY_NAME,
    };
    pub use crate::ops::{
        detect_degenerate, remove_degenerate, remove_influence, smooth_shape_key,
        smooth_shape_keys, smooth_vertex_groups, transfer_shape_keys, FieldSelection,
    };
    pub use crate::scene::{ObjectHandle, Scene};
    pub use crate::session::{
        ChangeEvent, NotifyOutcome, ParameterChange, PreviewConfig, PreviewOwners, PreviewTool,
        SessionController, SessionState,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_cube_round_trip() {
        let vertices: Vec<Point3<f64>> = (0..8)
            .map(|i| Point3::new((i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64))
            .collect();
        let faces = vec![
            vec![0, 1, 3, 2], // bottom
            vec![4, 6, 7, 5], // top
            vec![0, 4, 5, 1], // front
            vec![2, 3, 7, 6], // back
            vec![0, 2, 6, 4], // left
            vec![1, 5, 7, 3], // right
        ];
        let mut mesh = KeyedMesh::new(vertices.clone(), faces).unwrap();
        let inflated = vertices
            .iter()
            .map(|p| p + (p - Point3::new(0.5, 0.5, 0.5)) * 0.2)
            .collect();
        mesh.add_shape_key("inflate", inflated).unwrap();

        let graph = MeshGraph::from_mesh(&mesh).unwrap();
        assert_eq!(graph.num_edges(), 12);
        for v in 0..8 {
            assert_eq!(graph.degree(v), 3);
        }

        // Every corner moves by the same amount, so smoothing keeps the
        // offsets' length equal across vertices.
        smooth_shape_key(&mut mesh, "inflate", &SmoothOptions::default()).unwrap();
        let key = mesh.shape_keys().unwrap().get("inflate").unwrap();
        let lengths: Vec<f64> = key
            .offsets(&vertices)
            .unwrap()
            .iter()
            .map(|o| o.norm())
            .collect();
        for l in &lengths {
            assert!((l - lengths[0]).abs() < 1e-12);
        }
        assert!(detect_degenerate(&mesh, &DetectOptions::default()).unwrap().is_empty());
    }
}

//! Mesh data structures.
//!
//! This module provides the mesh-side types the algorithms operate on.
//!
//! # Overview
//!
//! - [`DeformableMesh`] - the host mesh abstraction: positions, live edge
//!   topology, and shape key storage
//! - [`KeyedMesh`] - an in-memory [`DeformableMesh`] with polygon faces and
//!   vertex groups
//! - [`ShapeKeySet`] / [`ShapeKey`] - the named displacement fields of a mesh,
//!   defined relative to the [`BASIS_KEY_NAME`] key
//! - [`MeshGraph`] - vertex adjacency derived from the live topology
//!
//! # Construction
//!
//! ```
//! use shapekit::mesh::{DeformableMesh, KeyedMesh, MeshGraph};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mesh = KeyedMesh::from_triangles(vertices, &[[0, 1, 2]]).unwrap();
//!
//! let graph = MeshGraph::from_mesh(&mesh).unwrap();
//! assert_eq!(graph.degree(0), 2);
//! ```

mod graph;
mod host;
mod keyed;
mod shape_key;

pub use graph::MeshGraph;
pub use host::DeformableMesh;
pub use keyed::{KeyedMesh, VertexGroup};
pub use shape_key::{ShapeKey, ShapeKeySet, BASIS_KEY_NAME};

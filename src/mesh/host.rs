//! The mesh abstraction consumed from the host application.

use nalgebra::Point3;

use crate::error::{Result, ShapeError};

use super::shape_key::ShapeKeySet;

/// A mesh whose vertices can carry shape keys.
///
/// Hosts with modifier stacks should report evaluated topology from
/// [`evaluated_edges`](DeformableMesh::evaluated_edges): neighbor lookups
/// must follow the mesh as it is currently displayed.
pub trait DeformableMesh {
    /// Raw vertex positions.
    fn vertex_positions(&self) -> &[Point3<f64>];

    /// Raw vertex positions for modification.
    fn vertex_positions_mut(&mut self) -> &mut [Point3<f64>];

    /// Undirected edges of the live evaluated geometry.
    fn evaluated_edges(&self) -> Vec<[usize; 2]>;

    /// The shape key collection, if the mesh has one.
    fn shape_keys(&self) -> Option<&ShapeKeySet>;

    /// The shape key collection for modification.
    fn shape_keys_mut(&mut self) -> Option<&mut ShapeKeySet>;

    /// Replace (or drop, with `None`) the whole shape key collection.
    fn set_shape_keys(&mut self, keys: Option<ShapeKeySet>);

    /// Number of vertices.
    fn num_vertices(&self) -> usize {
        self.vertex_positions().len()
    }

    /// The shape key collection, creating one with a basis copied from the
    /// vertex positions when missing.
    fn ensure_shape_keys(&mut self) -> Result<&mut ShapeKeySet> {
        if self.shape_keys().is_none() {
            let set = ShapeKeySet::new(self.vertex_positions());
            self.set_shape_keys(Some(set));
        }
        self.shape_keys_mut()
            .ok_or_else(|| ShapeError::InvalidState("host refused a new shape key set".into()))
    }

    /// The shape key collection, validated against the vertex count.
    ///
    /// Fails with [`ShapeError::NoFields`] when the mesh has no keys.
    fn checked_shape_keys(&self) -> Result<&ShapeKeySet> {
        let set = self.shape_keys().ok_or(ShapeError::NoFields)?;
        set.validate(self.num_vertices())?;
        Ok(set)
    }
}

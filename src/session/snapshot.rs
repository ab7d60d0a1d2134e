//! Point-in-time copies of a mesh's deformable state.

use nalgebra::Point3;

use crate::error::{Result, ShapeError};
use crate::mesh::{DeformableMesh, ShapeKeySet};

/// Raw vertex positions plus the complete shape key collection of a mesh.
///
/// Restoring writes back exactly the captured values, so a capture/restore
/// pair is bit-identical.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    positions: Vec<Point3<f64>>,
    keys: Option<ShapeKeySet>,
}

impl Snapshot {
    /// Capture the current state of `mesh`.
    pub fn capture<M: DeformableMesh + ?Sized>(mesh: &M) -> Self {
        Self {
            positions: mesh.vertex_positions().to_vec(),
            keys: mesh.shape_keys().cloned(),
        }
    }

    /// Number of captured vertices.
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// The captured shape keys.
    pub fn shape_keys(&self) -> Option<&ShapeKeySet> {
        self.keys.as_ref()
    }

    /// Names of all captured keys, basis included.
    pub fn key_names(&self) -> Vec<String> {
        self.keys
            .iter()
            .flat_map(|set| set.keys().iter().map(|k| k.name.clone()))
            .collect()
    }

    /// Write the captured state back into `mesh`.
    ///
    /// Keys added since the capture are dropped. Fails without writing if the
    /// vertex count changed.
    pub fn restore<M: DeformableMesh + ?Sized>(&self, mesh: &mut M) -> Result<()> {
        ShapeError::check_len("restored mesh", self.positions.len(), mesh.num_vertices())?;
        mesh.vertex_positions_mut().copy_from_slice(&self.positions);
        mesh.set_shape_keys(self.keys.clone());
        Ok(())
    }
}

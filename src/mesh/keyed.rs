//! In-memory mesh with shape keys.
//!
//! [`KeyedMesh`] is the crate's own [`DeformableMesh`] implementation: vertex
//! positions, polygon faces, loose edges, an optional [`ShapeKeySet`], and
//! vertex groups. Edge topology is derived from the faces on every query, so
//! edits to the faces are always reflected by neighbor lookups.

use std::collections::BTreeSet;

use nalgebra::Point3;

use crate::error::{Result, ShapeError};

use super::host::DeformableMesh;
use super::shape_key::ShapeKeySet;

/// A named set of per-vertex weights. `None` means the vertex is not a
/// member of the group.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexGroup {
    /// Group name.
    pub name: String,
    /// One entry per vertex.
    pub weights: Vec<Option<f64>>,
}

impl VertexGroup {
    /// Create a group with no members.
    pub fn new(name: impl Into<String>, num_vertices: usize) -> Self {
        Self {
            name: name.into(),
            weights: vec![None; num_vertices],
        }
    }
}

/// A polygon mesh carrying shape keys and vertex groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyedMesh {
    positions: Vec<Point3<f64>>,
    faces: Vec<Vec<usize>>,
    loose_edges: Vec<[usize; 2]>,
    shape_keys: Option<ShapeKeySet>,
    vertex_groups: Vec<VertexGroup>,
}

impl KeyedMesh {
    /// Build a mesh from vertex positions and polygon faces.
    ///
    /// Every face needs at least three distinct, valid vertex indices.
    ///
    /// # Example
    ///
    /// ```
    /// use shapekit::mesh::{DeformableMesh, KeyedMesh};
    /// use nalgebra::Point3;
    ///
    /// let vertices = vec![
    ///     Point3::new(0.0, 0.0, 0.0),
    ///     Point3::new(1.0, 0.0, 0.0),
    ///     Point3::new(1.0, 1.0, 0.0),
    ///     Point3::new(0.0, 1.0, 0.0),
    /// ];
    /// let mesh = KeyedMesh::new(vertices, vec![vec![0, 1, 2, 3]]).unwrap();
    /// assert_eq!(mesh.num_vertices(), 4);
    /// assert_eq!(mesh.evaluated_edges().len(), 4);
    /// ```
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<Vec<usize>>) -> Result<Self> {
        validate_faces(positions.len(), &faces)?;
        Ok(Self {
            positions,
            faces,
            ..Self::default()
        })
    }

    /// Build a triangle mesh.
    pub fn from_triangles(positions: Vec<Point3<f64>>, triangles: &[[usize; 3]]) -> Result<Self> {
        Self::new(positions, triangles.iter().map(|t| t.to_vec()).collect())
    }

    /// Build a mesh with only loose edges (no faces), e.g. a wire graph.
    pub fn from_edges(positions: Vec<Point3<f64>>, edges: Vec<[usize; 2]>) -> Result<Self> {
        let mut mesh = Self::new(positions, Vec::new())?;
        mesh.set_loose_edges(edges)?;
        Ok(mesh)
    }

    /// Polygon faces.
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// Replace the faces, keeping vertices and shape keys.
    pub fn set_faces(&mut self, faces: Vec<Vec<usize>>) -> Result<()> {
        validate_faces(self.positions.len(), &faces)?;
        self.faces = faces;
        Ok(())
    }

    /// Edges that are not part of any face.
    pub fn loose_edges(&self) -> &[[usize; 2]] {
        &self.loose_edges
    }

    /// Replace the loose edges.
    pub fn set_loose_edges(&mut self, edges: Vec<[usize; 2]>) -> Result<()> {
        for (ei, edge) in edges.iter().enumerate() {
            for &v in edge {
                if v >= self.positions.len() {
                    return Err(ShapeError::InvalidVertexIndex { face: ei, vertex: v });
                }
            }
        }
        self.loose_edges = edges;
        Ok(())
    }

    /// Add a shape key with the given absolute positions, creating the basis
    /// from the vertex positions first if needed.
    pub fn add_shape_key(&mut self, name: &str, positions: Vec<Point3<f64>>) -> Result<()> {
        ShapeError::check_len(&format!("shape key '{name}'"), self.positions.len(), positions.len())?;
        let key = self.ensure_shape_keys()?.add(name)?;
        key.positions = positions;
        Ok(())
    }

    /// Vertex groups.
    pub fn vertex_groups(&self) -> &[VertexGroup] {
        &self.vertex_groups
    }

    /// Vertex groups for modification.
    pub fn vertex_groups_mut(&mut self) -> &mut [VertexGroup] {
        &mut self.vertex_groups
    }

    /// Add a vertex group.
    pub fn add_vertex_group(&mut self, group: VertexGroup) -> Result<()> {
        ShapeError::check_len(
            &format!("vertex group '{}'", group.name),
            self.positions.len(),
            group.weights.len(),
        )?;
        if self.vertex_groups.iter().any(|g| g.name == group.name) {
            return Err(ShapeError::DuplicateField { name: group.name });
        }
        self.vertex_groups.push(group);
        Ok(())
    }
}

impl DeformableMesh for KeyedMesh {
    fn vertex_positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    fn vertex_positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }

    fn evaluated_edges(&self) -> Vec<[usize; 2]> {
        let mut edges = BTreeSet::new();
        for face in &self.faces {
            for i in 0..face.len() {
                let a = face[i];
                let b = face[(i + 1) % face.len()];
                edges.insert([a.min(b), a.max(b)]);
            }
        }
        for &[a, b] in &self.loose_edges {
            if a != b {
                edges.insert([a.min(b), a.max(b)]);
            }
        }
        edges.into_iter().collect()
    }

    fn shape_keys(&self) -> Option<&ShapeKeySet> {
        self.shape_keys.as_ref()
    }

    fn shape_keys_mut(&mut self) -> Option<&mut ShapeKeySet> {
        self.shape_keys.as_mut()
    }

    fn set_shape_keys(&mut self, keys: Option<ShapeKeySet>) {
        self.shape_keys = keys;
    }
}

fn validate_faces(num_vertices: usize, faces: &[Vec<usize>]) -> Result<()> {
    for (fi, face) in faces.iter().enumerate() {
        for &vi in face {
            if vi >= num_vertices {
                return Err(ShapeError::InvalidVertexIndex { face: fi, vertex: vi });
            }
        }
        let distinct: BTreeSet<usize> = face.iter().copied().collect();
        if face.len() < 3 || distinct.len() != face.len() {
            return Err(ShapeError::DegenerateFace { face: fi });
        }
    }
    Ok(())
}

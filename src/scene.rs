//! Scene objects addressed by handle.
//!
//! A [`Scene`] stands in for the host's object registry: operations name
//! meshes by [`ObjectHandle`], and an object may turn out not to be a mesh.

use std::fmt;

use crate::error::{Result, ShapeError};
use crate::mesh::{DeformableMesh, KeyedMesh};

/// Stable identifier of a scene object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(u32);

impl ObjectHandle {
    /// Get the raw handle value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an object holds.
#[derive(Debug, Clone)]
pub enum ObjectData<M> {
    /// A mesh with vertex geometry.
    Mesh(M),
    /// An object without geometry (empty, armature, camera, ...).
    Empty,
}

/// A named scene object.
#[derive(Debug, Clone)]
pub struct SceneObject<M> {
    /// Display name.
    pub name: String,
    /// The object's data.
    pub data: ObjectData<M>,
}

/// The set of objects the operations can address.
#[derive(Debug, Clone)]
pub struct Scene<M: DeformableMesh = KeyedMesh> {
    objects: Vec<SceneObject<M>>,
}

impl<M: DeformableMesh> Default for Scene<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: DeformableMesh> Scene<M> {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self { objects: Vec::new() }
    }

    /// Add a mesh object.
    pub fn add_mesh(&mut self, name: impl Into<String>, mesh: M) -> ObjectHandle {
        self.push(name.into(), ObjectData::Mesh(mesh))
    }

    /// Add an object without geometry.
    pub fn add_empty(&mut self, name: impl Into<String>) -> ObjectHandle {
        self.push(name.into(), ObjectData::Empty)
    }

    fn push(&mut self, name: String, data: ObjectData<M>) -> ObjectHandle {
        let handle = ObjectHandle(self.objects.len() as u32);
        self.objects.push(SceneObject { name, data });
        handle
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate over all handles.
    pub fn handles(&self) -> impl Iterator<Item = ObjectHandle> + '_ {
        (0..self.objects.len()).map(|i| ObjectHandle(i as u32))
    }

    /// Look up an object.
    pub fn object(&self, handle: ObjectHandle) -> Result<&SceneObject<M>> {
        self.objects
            .get(handle.0 as usize)
            .ok_or(ShapeError::UnknownObject { handle: handle.0 })
    }

    /// Look up an object's mesh.
    pub fn mesh(&self, handle: ObjectHandle) -> Result<&M> {
        let object = self.object(handle)?;
        match &object.data {
            ObjectData::Mesh(mesh) => Ok(mesh),
            ObjectData::Empty => Err(ShapeError::NotAMesh {
                object: object.name.clone(),
            }),
        }
    }

    /// Look up an object's mesh for modification.
    pub fn mesh_mut(&mut self, handle: ObjectHandle) -> Result<&mut M> {
        let object = self
            .objects
            .get_mut(handle.0 as usize)
            .ok_or(ShapeError::UnknownObject { handle: handle.0 })?;
        match &mut object.data {
            ObjectData::Mesh(mesh) => Ok(mesh),
            ObjectData::Empty => Err(ShapeError::NotAMesh {
                object: object.name.clone(),
            }),
        }
    }
}

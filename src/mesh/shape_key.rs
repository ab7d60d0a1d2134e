//! Shape keys (named displacement fields).
//!
//! A shape key stores absolute vertex positions. Its displacement at vertex
//! `v` is `positions[v] - reference[v]`, where the reference is the key named
//! by `relative_key` (the basis unless stated otherwise).
//!
//! The key named [`BASIS_KEY_NAME`] defines the reference positions and is
//! excluded from every field listing.

use nalgebra::{Point3, Vector3};

use crate::error::{Result, ShapeError};

/// Name of the reference key every mesh's displacement fields are relative to.
pub const BASIS_KEY_NAME: &str = "Basis";

/// A named per-vertex displacement field.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeKey {
    /// Unique name within the owning [`ShapeKeySet`].
    pub name: String,

    /// Absolute position of every vertex when the key is fully applied.
    pub positions: Vec<Point3<f64>>,

    /// Blend factor currently applied by the host (0.0 = inactive).
    pub value: f64,

    /// Name of the key this one is relative to.
    pub relative_key: String,
}

impl ShapeKey {
    /// Create a key relative to the basis.
    pub fn new(name: impl Into<String>, positions: Vec<Point3<f64>>) -> Self {
        Self {
            name: name.into(),
            positions,
            value: 0.0,
            relative_key: BASIS_KEY_NAME.to_string(),
        }
    }

    /// Check if this key is the basis.
    #[inline]
    pub fn is_basis(&self) -> bool {
        self.name == BASIS_KEY_NAME
    }

    /// Number of vertices covered by this key.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the key covers no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Per-vertex offsets relative to `reference`.
    pub fn offsets(&self, reference: &[Point3<f64>]) -> Result<Vec<Vector3<f64>>> {
        ShapeError::check_len(&format!("shape key '{}'", self.name), reference.len(), self.len())?;
        Ok(self
            .positions
            .iter()
            .zip(reference)
            .map(|(p, r)| p - r)
            .collect())
    }
}

/// The ordered collection of shape keys owned by one mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeKeySet {
    keys: Vec<ShapeKey>,

    /// Whether keys are blended relative to their reference keys.
    pub use_relative: bool,
}

impl ShapeKeySet {
    /// Create a key set whose basis is a copy of `positions`.
    pub fn new(positions: &[Point3<f64>]) -> Self {
        Self {
            keys: vec![ShapeKey::new(BASIS_KEY_NAME, positions.to_vec())],
            use_relative: true,
        }
    }

    /// Rebuild a key set from previously captured keys.
    ///
    /// The keys are taken as-is, in order.
    pub fn from_keys(keys: Vec<ShapeKey>, use_relative: bool) -> Self {
        Self { keys, use_relative }
    }

    /// All keys, basis included, in order.
    #[inline]
    pub fn keys(&self) -> &[ShapeKey] {
        &self.keys
    }

    /// Total number of keys, basis included.
    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the set has no keys at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The basis key, if present.
    pub fn basis(&self) -> Option<&ShapeKey> {
        self.get(BASIS_KEY_NAME)
    }

    /// Look up a key by name.
    pub fn get(&self, name: &str) -> Option<&ShapeKey> {
        self.keys.iter().find(|k| k.name == name)
    }

    /// Look up a key by name for modification.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ShapeKey> {
        self.keys.iter_mut().find(|k| k.name == name)
    }

    /// Check whether a key with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over the displacement fields (every key except the basis).
    pub fn fields(&self) -> impl Iterator<Item = &ShapeKey> + '_ {
        self.keys.iter().filter(|k| !k.is_basis())
    }

    /// Names of the displacement fields, in key order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields().map(|k| k.name.clone()).collect()
    }

    /// Number of displacement fields.
    pub fn num_fields(&self) -> usize {
        self.fields().count()
    }

    /// Add a new key with zero displacement (a copy of the basis).
    pub fn add(&mut self, name: &str) -> Result<&mut ShapeKey> {
        if self.contains(name) {
            return Err(ShapeError::DuplicateField { name: name.to_string() });
        }
        let positions = self
            .basis()
            .map(|b| b.positions.clone())
            .ok_or_else(|| ShapeError::FieldNotFound { name: BASIS_KEY_NAME.to_string() })?;
        self.keys.push(ShapeKey::new(name, positions));
        let last = self.keys.len() - 1;
        Ok(&mut self.keys[last])
    }

    /// Get an existing key or add it with zero displacement.
    pub fn get_or_add(&mut self, name: &str) -> Result<&mut ShapeKey> {
        match self.keys.iter().position(|k| k.name == name) {
            Some(i) => Ok(&mut self.keys[i]),
            None => self.add(name),
        }
    }

    /// Remove a key and return it. The basis cannot be removed.
    pub fn remove(&mut self, name: &str) -> Result<ShapeKey> {
        if name == BASIS_KEY_NAME {
            return Err(ShapeError::InvalidState("the basis key cannot be removed".into()));
        }
        let index = self
            .keys
            .iter()
            .position(|k| k.name == name)
            .ok_or_else(|| ShapeError::FieldNotFound { name: name.to_string() })?;
        Ok(self.keys.remove(index))
    }

    /// Check that every key covers exactly `num_vertices` vertices.
    pub fn validate(&self, num_vertices: usize) -> Result<()> {
        for key in &self.keys {
            ShapeError::check_len(&format!("shape key '{}'", key.name), num_vertices, key.len())?;
        }
        Ok(())
    }
}

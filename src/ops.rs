//! Shape key operations on whole meshes.
//!
//! These functions validate a mesh, run the algorithms from [`crate::algo`]
//! on the selected keys, and write the results back. Every operation is
//! all-or-nothing: all results are computed before the first write, and an
//! error leaves the mesh untouched.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::algo::degenerate::{flatten, is_degenerate_flat, DetectOptions};
use crate::algo::influence::clear_displacement;
use crate::algo::smooth::{smooth_field_with_progress, SmoothOptions};
use crate::algo::transfer::{TransferOptions, TransferWeights};
use crate::algo::weights::{smooth_weights, WeightSmoothOptions};
use crate::algo::Progress;
use crate::error::{Result, ShapeError};
use crate::mesh::{DeformableMesh, KeyedMesh, MeshGraph, ShapeKeySet, BASIS_KEY_NAME};

/// Which displacement fields an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// Every key except the basis.
    #[default]
    All,
    /// The named keys only.
    Named(BTreeSet<String>),
}

impl FieldSelection {
    /// Select the given key names.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldSelection::Named(names.into_iter().map(Into::into).collect())
    }

    /// Add or remove one name, turning `All` into an explicit selection.
    pub fn set_selected(&mut self, name: &str, selected: bool) {
        if let FieldSelection::All = self {
            *self = FieldSelection::Named(BTreeSet::new());
        }
        if let FieldSelection::Named(names) = self {
            if selected {
                names.insert(name.to_string());
            } else {
                names.remove(name);
            }
        }
    }

    /// Resolve to key names, in key order.
    ///
    /// # Errors
    ///
    /// - [`ShapeError::NoFields`] if `All` is requested on a set without fields
    /// - [`ShapeError::EmptySelection`] for an empty explicit selection
    /// - [`ShapeError::FieldNotFound`] for unknown names or the basis
    pub fn resolve(&self, keys: &ShapeKeySet) -> Result<Vec<String>> {
        match self {
            FieldSelection::All => {
                let names = keys.field_names();
                if names.is_empty() {
                    return Err(ShapeError::NoFields);
                }
                Ok(names)
            }
            FieldSelection::Named(names) => {
                if names.is_empty() {
                    return Err(ShapeError::EmptySelection);
                }
                for name in names {
                    if name == BASIS_KEY_NAME || !keys.contains(name) {
                        return Err(ShapeError::FieldNotFound { name: name.clone() });
                    }
                }
                Ok(keys
                    .fields()
                    .filter(|k| names.contains(&k.name))
                    .map(|k| k.name.clone())
                    .collect())
            }
        }
    }
}

/// Summary of a smoothing run.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothReport {
    /// Keys that were smoothed, in key order.
    pub fields: Vec<String>,
    /// Iterations applied to each key.
    pub iterations: usize,
}

/// Summary of a transfer run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferReport {
    /// Keys written on the target, in source key order.
    pub fields: Vec<String>,
    /// Keys that did not exist on the target before.
    pub created: Vec<String>,
    /// Target vertices no source vertex contributed to.
    pub unreached_vertices: usize,
}

fn require_vertices<M: DeformableMesh + ?Sized>(mesh: &M) -> Result<()> {
    if mesh.num_vertices() == 0 {
        return Err(ShapeError::DegenerateGeometry);
    }
    Ok(())
}

fn basis_of(keys: &ShapeKeySet) -> Result<&[nalgebra::Point3<f64>]> {
    keys.basis()
        .map(|b| b.positions.as_slice())
        .ok_or_else(|| ShapeError::FieldNotFound { name: BASIS_KEY_NAME.to_string() })
}

/// Smooth one shape key.
pub fn smooth_shape_key<M: DeformableMesh + ?Sized>(
    mesh: &mut M,
    name: &str,
    options: &SmoothOptions,
) -> Result<SmoothReport> {
    smooth_shape_keys(mesh, &FieldSelection::named([name]), options)
}

/// Smooth the selected shape keys over the mesh's live topology.
///
/// # Example
///
/// ```
/// use shapekit::prelude::*;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mut mesh = KeyedMesh::new(vertices.clone(), vec![vec![0, 1, 2, 3]]).unwrap();
/// let mut spike = vertices.clone();
/// spike[0].z = 1.0;
/// mesh.add_shape_key("spike", spike).unwrap();
///
/// let options = SmoothOptions::default().with_strength(1.0);
/// let report = smooth_shape_keys(&mut mesh, &FieldSelection::All, &options).unwrap();
/// assert_eq!(report.fields, vec!["spike".to_string()]);
///
/// let key = mesh.shape_keys().unwrap().get("spike").unwrap();
/// assert!((key.positions[0].z - 1.0 / 3.0).abs() < 1e-12);
/// ```
pub fn smooth_shape_keys<M: DeformableMesh + ?Sized>(
    mesh: &mut M,
    selection: &FieldSelection,
    options: &SmoothOptions,
) -> Result<SmoothReport> {
    smooth_shape_keys_with_progress(mesh, selection, options, &Progress::none())
}

/// Smooth the selected shape keys, reporting per-iteration progress.
pub fn smooth_shape_keys_with_progress<M: DeformableMesh + ?Sized>(
    mesh: &mut M,
    selection: &FieldSelection,
    options: &SmoothOptions,
    progress: &Progress,
) -> Result<SmoothReport> {
    require_vertices(&*mesh)?;
    options.validate()?;

    let keys = mesh.checked_shape_keys()?;
    let names = selection.resolve(keys)?;
    let basis = basis_of(keys)?;
    let graph = MeshGraph::from_mesh(&*mesh)?;

    info!(
        fields = names.len(),
        vertices = graph.num_vertices(),
        iterations = options.iterations,
        strength = options.strength,
        "smoothing shape keys"
    );

    let mut results = Vec::with_capacity(names.len());
    for name in &names {
        let field = keys
            .get(name)
            .ok_or_else(|| ShapeError::FieldNotFound { name: name.clone() })?;
        debug!(field = %name, "smoothing shape key");
        results.push(smooth_field_with_progress(
            &field.positions,
            basis,
            &graph,
            options,
            progress,
        )?);
    }

    commit_positions(mesh, &names, results)?;

    Ok(SmoothReport {
        fields: names,
        iterations: options.iterations,
    })
}

/// Transfer the selected shape keys from `source` onto `target`.
///
/// The target gets a basis copied from its vertex positions if it has no
/// keys yet. Existing target keys of the same name are overwritten, and every
/// transferred key starts inactive (`value = 0.0`).
///
/// # Errors
///
/// - [`ShapeError::DegenerateGeometry`] if either mesh has no vertices
/// - [`ShapeError::NoFields`] if the source has no keys besides its basis
/// - [`ShapeError::FieldNotFound`] for the basis, if the target has keys but
///   no basis to create the missing ones from
/// - selection errors from [`FieldSelection::resolve`]
pub fn transfer_shape_keys<S, T>(
    source: &S,
    target: &mut T,
    selection: &FieldSelection,
    options: &TransferOptions,
) -> Result<TransferReport>
where
    S: DeformableMesh + ?Sized,
    T: DeformableMesh + ?Sized,
{
    transfer_shape_keys_with_progress(source, target, selection, options, &Progress::none())
}

/// Transfer the selected shape keys, reporting progress while computing
/// weights.
pub fn transfer_shape_keys_with_progress<S, T>(
    source: &S,
    target: &mut T,
    selection: &FieldSelection,
    options: &TransferOptions,
    progress: &Progress,
) -> Result<TransferReport>
where
    S: DeformableMesh + ?Sized,
    T: DeformableMesh + ?Sized,
{
    require_vertices(source)?;
    require_vertices(&*target)?;
    options.validate()?;

    let source_keys = source.checked_shape_keys()?;
    if source_keys.num_fields() == 0 {
        return Err(ShapeError::NoFields);
    }
    let names = selection.resolve(source_keys)?;
    let source_basis = basis_of(source_keys)?;
    if let Some(target_keys) = target.shape_keys() {
        target_keys.validate(target.num_vertices())?;
        // New keys are copied from the basis, so a set without one can only
        // take keys it already has.
        if target_keys.basis().is_none() {
            if let Some(missing) = names.iter().find(|n| !target_keys.contains(n)) {
                debug!(field = %missing, "target has no basis to create keys from");
                return Err(ShapeError::FieldNotFound { name: BASIS_KEY_NAME.to_string() });
            }
        }
    }

    info!(
        fields = names.len(),
        sources = source.num_vertices(),
        targets = target.num_vertices(),
        "transferring shape keys"
    );

    let weights = TransferWeights::compute_with_progress(
        source.vertex_positions(),
        target.vertex_positions(),
        options,
        progress,
    )?;

    let mut results = Vec::with_capacity(names.len());
    for name in &names {
        let field = source_keys
            .get(name)
            .ok_or_else(|| ShapeError::FieldNotFound { name: name.clone() })?;
        results.push(weights.apply(&field.positions, source_basis, target.vertex_positions())?);
    }

    let target_keys = target.ensure_shape_keys()?;
    let mut created = Vec::new();
    for (name, positions) in names.iter().zip(results) {
        if !target_keys.contains(name) {
            created.push(name.clone());
        }
        let key = target_keys.get_or_add(name)?;
        key.positions = positions;
        key.value = 0.0;
    }

    let unreached_vertices = weights.num_unreached();
    debug!(
        created = created.len(),
        unreached = unreached_vertices,
        "transfer committed"
    );

    Ok(TransferReport {
        fields: names,
        created,
        unreached_vertices,
    })
}

/// Names of the shape keys that are numerically identical to their
/// reference keys.
///
/// Meshes without vertices or keys, or whose keys are not relative, yield
/// nothing. Reference keys are flattened once and shared by every key that
/// uses them.
pub fn detect_degenerate<M: DeformableMesh + ?Sized>(
    mesh: &M,
    options: &DetectOptions,
) -> Result<Vec<String>> {
    options.validate()?;
    if mesh.num_vertices() == 0 {
        return Ok(Vec::new());
    }

    let Some(keys) = mesh.shape_keys() else {
        return Ok(Vec::new());
    };
    keys.validate(mesh.num_vertices())?;
    if !keys.use_relative {
        return Ok(Vec::new());
    }

    let mut references: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut degenerate = Vec::new();
    for key in keys.fields() {
        let reference_name = key.relative_key.as_str();
        if !references.contains_key(reference_name) {
            let reference = keys.get(reference_name).ok_or_else(|| ShapeError::FieldNotFound {
                name: reference_name.to_string(),
            })?;
            references.insert(reference_name, flatten(&reference.positions));
        }
        let reference = &references[reference_name];
        if is_degenerate_flat(&flatten(&key.positions), reference, options.tolerance)? {
            degenerate.push(key.name.clone());
        }
    }

    info!(
        fields = keys.num_fields(),
        degenerate = degenerate.len(),
        tolerance = options.tolerance,
        "scanned for degenerate shape keys"
    );
    Ok(degenerate)
}

/// Remove every key [`detect_degenerate`] reports and return their names.
pub fn remove_degenerate<M: DeformableMesh + ?Sized>(
    mesh: &mut M,
    options: &DetectOptions,
) -> Result<Vec<String>> {
    let names = detect_degenerate(&*mesh, options)?;
    if let Some(keys) = mesh.shape_keys_mut() {
        for name in &names {
            keys.remove(name)?;
        }
    }
    Ok(names)
}

/// Reset a key's selected vertices to its reference key, removing the key's
/// influence there.
///
/// The reference is the key's `relative_key`, not the mesh's current vertex
/// positions. The two differ when the mesh has been edited without updating
/// the basis, or when the key is relative to another key.
pub fn remove_influence<M: DeformableMesh + ?Sized>(
    mesh: &mut M,
    name: &str,
    vertices: &[usize],
) -> Result<()> {
    require_vertices(&*mesh)?;
    let keys = mesh.checked_shape_keys()?;
    if name == BASIS_KEY_NAME {
        return Err(ShapeError::FieldNotFound { name: name.to_string() });
    }
    let key = keys
        .get(name)
        .ok_or_else(|| ShapeError::FieldNotFound { name: name.to_string() })?;
    let reference = keys.get(&key.relative_key).ok_or_else(|| ShapeError::FieldNotFound {
        name: key.relative_key.clone(),
    })?;

    let cleared = clear_displacement(&key.positions, &reference.positions, vertices)?;
    debug!(field = %name, vertices = vertices.len(), "removed shape key influence");
    commit_positions(mesh, &[name.to_string()], vec![cleared])
}

/// Smooth the weights of every vertex group by spatial proximity.
///
/// Groups that meet within `radius` blend into each other, so a weighted
/// vertex can join a neighboring group. Returns the number of groups
/// processed.
pub fn smooth_vertex_groups(mesh: &mut KeyedMesh, options: &WeightSmoothOptions) -> Result<usize> {
    require_vertices(&*mesh)?;
    let groups: Vec<Vec<Option<f64>>> = mesh
        .vertex_groups()
        .iter()
        .map(|g| g.weights.clone())
        .collect();
    let results = smooth_weights(mesh.vertex_positions(), &groups, options)?;

    let count = results.len();
    for (group, weights) in mesh.vertex_groups_mut().iter_mut().zip(results) {
        group.weights = weights;
    }
    info!(groups = count, radius = options.radius, "smoothed vertex group weights");
    Ok(count)
}

fn commit_positions<M: DeformableMesh + ?Sized>(
    mesh: &mut M,
    names: &[String],
    results: Vec<Vec<nalgebra::Point3<f64>>>,
) -> Result<()> {
    let keys = mesh.shape_keys_mut().ok_or(ShapeError::NoFields)?;
    for (name, positions) in names.iter().zip(results) {
        let key = keys
            .get_mut(name)
            .ok_or_else(|| ShapeError::FieldNotFound { name: name.clone() })?;
        key.positions = positions;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{ShapeKey, VertexGroup};
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn square_mesh() -> KeyedMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        KeyedMesh::new(vertices, vec![vec![0, 1, 2, 3]]).unwrap()
    }

    fn with_key(mut mesh: KeyedMesh, name: &str, offsets: [Vector3<f64>; 4]) -> KeyedMesh {
        let positions = mesh
            .vertex_positions()
            .iter()
            .zip(offsets)
            .map(|(p, o)| p + o)
            .collect();
        mesh.add_shape_key(name, positions).unwrap();
        mesh
    }

    fn spike() -> [Vector3<f64>; 4] {
        [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::zeros(),
            Vector3::zeros(),
            Vector3::zeros(),
        ]
    }

    #[test]
    fn test_selection_resolve() {
        let mesh = with_key(with_key(square_mesh(), "a", spike()), "b", spike());
        let keys = mesh.shape_keys().unwrap();

        assert_eq!(FieldSelection::All.resolve(keys).unwrap(), vec!["a", "b"]);
        assert_eq!(FieldSelection::named(["b"]).resolve(keys).unwrap(), vec!["b"]);
        assert_eq!(
            FieldSelection::Named(BTreeSet::new()).resolve(keys),
            Err(ShapeError::EmptySelection)
        );
        assert!(matches!(
            FieldSelection::named([BASIS_KEY_NAME]).resolve(keys),
            Err(ShapeError::FieldNotFound { .. })
        ));

        let empty = ShapeKeySet::new(mesh.vertex_positions());
        assert_eq!(FieldSelection::All.resolve(&empty), Err(ShapeError::NoFields));
    }

    #[test]
    fn test_set_selected() {
        let mut selection = FieldSelection::All;
        selection.set_selected("a", true);
        selection.set_selected("b", true);
        selection.set_selected("a", false);
        assert_eq!(selection, FieldSelection::named(["b"]));
    }

    #[test]
    fn test_smooth_only_selected() {
        let mut mesh = with_key(with_key(square_mesh(), "a", spike()), "b", spike());
        let before_b = mesh.shape_keys().unwrap().get("b").unwrap().clone();

        let options = SmoothOptions::default().with_strength(1.0);
        smooth_shape_key(&mut mesh, "a", &options).unwrap();

        let keys = mesh.shape_keys().unwrap();
        assert_relative_eq!(keys.get("a").unwrap().positions[0].x, 1.0 / 3.0, epsilon = 1e-12);
        assert_eq!(keys.get("b").unwrap(), &before_b);
        assert_eq!(keys.basis().unwrap().positions, square_mesh().vertex_positions());
    }

    #[test]
    fn test_smooth_errors_do_not_mutate() {
        let mut mesh = with_key(square_mesh(), "a", spike());
        let before = mesh.clone();

        let bad = SmoothOptions::default().with_iterations(0);
        assert!(smooth_shape_keys(&mut mesh, &FieldSelection::All, &bad).is_err());
        assert!(smooth_shape_key(&mut mesh, "missing", &SmoothOptions::default()).is_err());
        assert_eq!(mesh, before);

        let mut bare = square_mesh();
        assert_eq!(
            smooth_shape_keys(&mut bare, &FieldSelection::All, &SmoothOptions::default()),
            Err(ShapeError::NoFields)
        );

        let mut empty = KeyedMesh::default();
        assert_eq!(
            smooth_shape_keys(&mut empty, &FieldSelection::All, &SmoothOptions::default()),
            Err(ShapeError::DegenerateGeometry)
        );
    }

    #[test]
    fn test_smooth_rejects_corrupt_keys() {
        let mut mesh = with_key(square_mesh(), "a", spike());
        mesh.shape_keys_mut().unwrap().get_mut("a").unwrap().positions.pop();
        assert!(matches!(
            smooth_shape_keys(&mut mesh, &FieldSelection::All, &SmoothOptions::default()),
            Err(ShapeError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_transfer_creates_inactive_keys() {
        let mut source = with_key(square_mesh(), "lift", [Vector3::new(0.0, 0.0, 0.5); 4]);
        source.shape_keys_mut().unwrap().get_mut("lift").unwrap().value = 1.0;

        let target_vertices = vec![Point3::new(0.5, 0.5, 0.0), Point3::new(2.0, 2.0, 0.0)];
        let mut target = KeyedMesh::from_edges(target_vertices, vec![[0, 1]]).unwrap();

        let report = transfer_shape_keys(
            &source,
            &mut target,
            &FieldSelection::All,
            &TransferOptions::default(),
        )
        .unwrap();
        assert_eq!(report.fields, vec!["lift"]);
        assert_eq!(report.created, vec!["lift"]);
        assert_eq!(report.unreached_vertices, 0);

        let keys = target.shape_keys().unwrap();
        assert_eq!(keys.basis().unwrap().positions, target.vertex_positions());
        let lift = keys.get("lift").unwrap();
        assert_eq!(lift.value, 0.0);
        for (p, t) in lift.positions.iter().zip(target.vertex_positions()) {
            assert_relative_eq!(p.z - t.z, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_transfer_overwrites_existing() {
        let source = with_key(square_mesh(), "lift", [Vector3::new(0.0, 0.0, 0.5); 4]);
        let mut target = with_key(square_mesh(), "lift", [Vector3::new(9.0, 9.0, 9.0); 4]);
        target.shape_keys_mut().unwrap().get_mut("lift").unwrap().value = 0.8;

        let report = transfer_shape_keys(
            &source,
            &mut target,
            &FieldSelection::named(["lift"]),
            &TransferOptions::default(),
        )
        .unwrap();
        assert!(report.created.is_empty());

        let lift = target.shape_keys().unwrap().get("lift").unwrap();
        assert_eq!(lift.value, 0.0);
        assert_relative_eq!(lift.positions[2].z, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_transfer_errors() {
        let bare_source = square_mesh();
        let mut target = square_mesh();
        assert_eq!(
            transfer_shape_keys(&bare_source, &mut target, &FieldSelection::All, &TransferOptions::default()),
            Err(ShapeError::NoFields)
        );

        let mut basis_only = square_mesh();
        basis_only.ensure_shape_keys().unwrap();
        assert_eq!(
            transfer_shape_keys(&basis_only, &mut target, &FieldSelection::All, &TransferOptions::default()),
            Err(ShapeError::NoFields)
        );

        let source = with_key(square_mesh(), "a", spike());
        let mut empty = KeyedMesh::default();
        assert_eq!(
            transfer_shape_keys(&source, &mut empty, &FieldSelection::All, &TransferOptions::default()),
            Err(ShapeError::DegenerateGeometry)
        );
        assert!(target.shape_keys().is_none());
    }

    #[test]
    fn test_transfer_without_target_basis_is_untouched() {
        let source = with_key(with_key(square_mesh(), "a", spike()), "b", spike());

        let mut target = square_mesh();
        let keyed: Vec<ShapeKey> = vec![ShapeKey::new("a", target.vertex_positions().to_vec())];
        target.set_shape_keys(Some(ShapeKeySet::from_keys(keyed, true)));
        let before = target.clone();

        assert_eq!(
            transfer_shape_keys(&source, &mut target, &FieldSelection::All, &TransferOptions::default()),
            Err(ShapeError::FieldNotFound { name: BASIS_KEY_NAME.to_string() })
        );
        assert_eq!(target, before);

        // Keys the target already has can still be overwritten.
        let report = transfer_shape_keys(
            &source,
            &mut target,
            &FieldSelection::named(["a"]),
            &TransferOptions::default(),
        )
        .unwrap();
        assert!(report.created.is_empty());
        assert_relative_eq!(target.shape_keys().unwrap().get("a").unwrap().positions[0].x, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_detect_and_remove_degenerate() {
        let mut mesh = square_mesh();
        mesh = with_key(mesh, "noop", [Vector3::new(0.0005, 0.0, -0.0002); 4]);
        mesh = with_key(mesh, "real", spike());
        // Relative to "real": identical positions, so degenerate.
        mesh = with_key(mesh, "corrective", spike());
        mesh.shape_keys_mut().unwrap().get_mut("corrective").unwrap().relative_key = "real".into();

        let found = detect_degenerate(&mesh, &DetectOptions::default()).unwrap();
        assert_eq!(found, vec!["noop", "corrective"]);

        let removed = remove_degenerate(&mut mesh, &DetectOptions::default()).unwrap();
        assert_eq!(removed, found);
        assert_eq!(mesh.shape_keys().unwrap().field_names(), vec!["real"]);
    }

    #[test]
    fn test_detect_skips_absolute_keys() {
        let mut mesh = with_key(square_mesh(), "noop", [Vector3::zeros(); 4]);
        mesh.shape_keys_mut().unwrap().use_relative = false;
        assert!(detect_degenerate(&mesh, &DetectOptions::default()).unwrap().is_empty());
        assert!(detect_degenerate(&square_mesh(), &DetectOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_detect_on_empty_mesh_is_noop() {
        let mut empty = KeyedMesh::default();
        empty.ensure_shape_keys().unwrap().add("noop").unwrap();

        assert!(detect_degenerate(&empty, &DetectOptions::default()).unwrap().is_empty());
        assert!(remove_degenerate(&mut empty, &DetectOptions::default()).unwrap().is_empty());
        assert!(empty.shape_keys().unwrap().contains("noop"));
    }

    #[test]
    fn test_remove_influence() {
        let mut mesh = with_key(square_mesh(), "a", [Vector3::new(0.0, 0.0, 1.0); 4]);
        remove_influence(&mut mesh, "a", &[1, 3]).unwrap();

        let keys = mesh.shape_keys().unwrap();
        let a = keys.get("a").unwrap();
        let basis = keys.basis().unwrap();
        assert_eq!(a.positions[1], basis.positions[1]);
        assert_eq!(a.positions[3], basis.positions[3]);
        assert_relative_eq!(a.positions[0].z, 1.0);

        assert_eq!(remove_influence(&mut mesh, "a", &[]), Err(ShapeError::EmptySelection));
        assert!(remove_influence(&mut mesh, BASIS_KEY_NAME, &[0]).is_err());
    }

    #[test]
    fn test_smooth_vertex_groups() {
        let mut mesh = square_mesh();
        let mut group = VertexGroup::new("arm", 4);
        group.weights = vec![Some(1.0), Some(0.0), None, None];
        mesh.add_vertex_group(group).unwrap();

        let options = WeightSmoothOptions::default().with_radius(1.5).with_influence(1.0);
        assert_eq!(smooth_vertex_groups(&mut mesh, &options).unwrap(), 1);

        let weights = &mesh.vertex_groups()[0].weights;
        assert_relative_eq!(weights[0].unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(weights[1].unwrap(), 0.5, epsilon = 1e-12);
        assert_eq!(weights[2], None);
    }

    #[test]
    fn test_smooth_vertex_groups_on_flat_strip() {
        // 32 vertices on the plane x = 0 and one off it.
        let mut vertices: Vec<Point3<f64>> = (0..32)
            .map(|i| Point3::new(0.0, i as f64 * 0.05, i as f64 * 1e-3))
            .collect();
        vertices.push(Point3::new(1.0, 0.0, 0.0));
        let n = vertices.len();
        let mut mesh = KeyedMesh::from_edges(vertices, Vec::new()).unwrap();

        let mut left = VertexGroup::new("left", n);
        let mut right = VertexGroup::new("right", n);
        for v in 0..16 {
            left.weights[v] = Some(1.0);
            right.weights[v + 16] = Some(1.0);
        }
        mesh.add_vertex_group(left).unwrap();
        mesh.add_vertex_group(right).unwrap();

        let options = WeightSmoothOptions::default().with_radius(0.06);
        assert_eq!(smooth_vertex_groups(&mut mesh, &options).unwrap(), 2);

        let groups = mesh.vertex_groups();
        assert!(groups[1].weights[15].is_some());
        assert!(groups[0].weights[16].is_some());
        assert_eq!(groups[0].weights[32], None);
        assert_eq!(groups[1].weights[0], None);
    }
}

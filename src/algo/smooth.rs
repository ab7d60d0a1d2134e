//! Displacement field smoothing.
//!
//! Damped graph-Laplacian smoothing of a shape key's offsets. Each iteration
//! blends every vertex's offset towards the average of itself and its
//! neighbors:
//!
//! ```text
//! avg(v)        = (offset(v) + sum(offset(n) for n in N(v))) / (1 + |N(v)|)
//! new_offset(v) = offset(v) + strength * (avg(v) - offset(v))
//! ```
//!
//! All new offsets of an iteration are computed from the offsets at the start
//! of that iteration, so the result does not depend on visiting order (and
//! parallel and sequential execution agree bit for bit). The basis is never
//! modified.
//!
//! # Example
//!
//! ```
//! use shapekit::algo::smooth::{smooth_field, SmoothOptions};
//! use shapekit::mesh::MeshGraph;
//! use nalgebra::Point3;
//!
//! let basis = vec![Point3::origin(); 4];
//! let mut field = basis.clone();
//! field[0].x = 1.0;
//!
//! let graph = MeshGraph::from_edges(4, [[0, 1], [1, 2], [2, 3], [3, 0]]).unwrap();
//! let options = SmoothOptions::default().with_strength(1.0);
//! let smoothed = smooth_field(&field, &basis, &graph, &options).unwrap();
//!
//! assert!((smoothed[0].x - 1.0 / 3.0).abs() < 1e-12);
//! assert_eq!(smoothed[2].x, 0.0);
//! ```

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, ShapeError};
use crate::mesh::MeshGraph;

use super::Progress;

/// Options for shape key smoothing.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothOptions {
    /// Number of smoothing iterations (at least 1).
    pub iterations: usize,

    /// Blend factor towards the neighborhood average (0.0 to 1.0).
    /// 0.0 leaves the field unchanged, 1.0 moves fully to the average.
    pub strength: f64,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            strength: 0.5,
            parallel: true,
        }
    }
}

impl SmoothOptions {
    /// Create options with the specified number of iterations.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Create options with the specified strength, clamped to `[0, 1]`.
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength.clamp(0.0, 1.0);
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Check that the options describe a valid smoothing pass.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(ShapeError::invalid_param(
                "iterations",
                self.iterations,
                "must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(ShapeError::invalid_param(
                "strength",
                self.strength,
                "must be in [0, 1]",
            ));
        }
        Ok(())
    }
}

/// Smooth a displacement field over a vertex graph.
///
/// `field` holds the key's absolute positions and `basis` the reference
/// positions; both must have one entry per graph vertex. Returns the new
/// absolute positions, leaving the inputs untouched.
///
/// # Errors
///
/// - [`ShapeError::InvalidParameter`] for zero iterations or a strength
///   outside `[0, 1]`
/// - [`ShapeError::DimensionMismatch`] if the lengths disagree
pub fn smooth_field(
    field: &[Point3<f64>],
    basis: &[Point3<f64>],
    graph: &MeshGraph,
    options: &SmoothOptions,
) -> Result<Vec<Point3<f64>>> {
    smooth_field_with_progress(field, basis, graph, options, &Progress::none())
}

/// Smooth a displacement field, reporting progress after every iteration.
pub fn smooth_field_with_progress(
    field: &[Point3<f64>],
    basis: &[Point3<f64>],
    graph: &MeshGraph,
    options: &SmoothOptions,
    progress: &Progress,
) -> Result<Vec<Point3<f64>>> {
    options.validate()?;
    let num_vertices = graph.num_vertices();
    ShapeError::check_len("field", num_vertices, field.len())?;
    ShapeError::check_len("basis", num_vertices, basis.len())?;

    let mut positions = field.to_vec();
    if num_vertices == 0 || options.strength == 0.0 {
        return Ok(positions);
    }

    debug!(
        vertices = num_vertices,
        edges = graph.num_edges(),
        iterations = options.iterations,
        strength = options.strength,
        "smoothing field"
    );

    for iteration in 0..options.iterations {
        let offsets: Vec<Vector3<f64>> = positions
            .iter()
            .zip(basis)
            .map(|(p, b)| p - b)
            .collect();

        let new_offsets: Vec<Vector3<f64>> = if options.parallel {
            (0..num_vertices)
                .into_par_iter()
                .map(|v| compute_smoothed_offset(&offsets, graph, v, options.strength))
                .collect()
        } else {
            (0..num_vertices)
                .map(|v| compute_smoothed_offset(&offsets, graph, v, options.strength))
                .collect()
        };

        for ((p, b), o) in positions.iter_mut().zip(basis).zip(&new_offsets) {
            *p = b + o;
        }

        progress.report(iteration + 1, options.iterations, "Smoothing field");
    }

    Ok(positions)
}

/// New offset of vertex `v` for one iteration.
#[inline]
fn compute_smoothed_offset(
    offsets: &[Vector3<f64>],
    graph: &MeshGraph,
    v: usize,
    strength: f64,
) -> Vector3<f64> {
    let own = offsets[v];
    let neighbors = graph.neighbors(v);
    if neighbors.is_empty() {
        return own;
    }

    // The vertex itself counts towards the average.
    let sum = neighbors.iter().fold(own, |acc, &n| acc + offsets[n]);
    let average = sum / (neighbors.len() + 1) as f64;

    own + (average - own) * strength
}

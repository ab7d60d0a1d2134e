//! Scattered-data transfer of displacement fields.
//!
//! Resamples a displacement field defined on a source point set onto an
//! unrelated target point set with inverse-distance weighting. For every
//! target point `t`:
//!
//! 1. every source point `s` gets `weight = 1 / max(|t - s|, epsilon)`
//! 2. sources with `weight <= weight_cutoff` are discarded
//! 3. the surviving weights are normalized to sum to 1
//! 4. `target_field[t] = t + sum(weight_s * (source_field[s] - source_basis[s]))`
//!
//! A target point with no surviving source keeps its position (zero
//! displacement).
//!
//! The weights only depend on the two point sets, so they are computed once
//! ([`TransferWeights`]) and reused for every field being transferred.
//!
//! # Example
//!
//! ```
//! use shapekit::algo::transfer::{transfer_field, TransferOptions};
//! use nalgebra::Point3;
//!
//! let source = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
//! let mut field = source.clone();
//! field[0].z = 1.0;
//! field[1].z = 1.0;
//!
//! let target = vec![Point3::new(0.5, 0.0, 0.0)];
//! let result = transfer_field(&field, &source, &source, &target, &TransferOptions::default()).unwrap();
//! assert!((result[0].z - 1.0).abs() < 1e-12);
//! ```

mod search;

pub use search::{build_search, BruteForceSearch, KdTreeSearch, NeighborSearch, SearchStrategy};

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{Result, ShapeError};

use super::Progress;

/// Source points with a weight at or below this value do not contribute.
pub const TRANSFER_WEIGHT_CUTOFF: f64 = 0.1;

/// Lower bound on distances, so coincident points get a finite weight.
pub const DISTANCE_EPSILON: f64 = 1e-6;

/// Number of target points processed between progress reports.
const PROGRESS_CHUNK: usize = 1024;

/// Options for displacement field transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOptions {
    /// Minimum (exclusive) inverse-distance weight for a source point to
    /// contribute. 0.0 disables the locality cutoff.
    pub weight_cutoff: f64,

    /// Distance floor used when computing weights.
    pub epsilon: f64,

    /// How candidate source points are located.
    pub search: SearchStrategy,

    /// Whether to use parallel execution (default: true).
    pub parallel: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            weight_cutoff: TRANSFER_WEIGHT_CUTOFF,
            epsilon: DISTANCE_EPSILON,
            search: SearchStrategy::BruteForce,
            parallel: true,
        }
    }
}

impl TransferOptions {
    /// Create options with the specified weight cutoff.
    pub fn with_weight_cutoff(mut self, weight_cutoff: f64) -> Self {
        self.weight_cutoff = weight_cutoff;
        self
    }

    /// Create options with the specified search strategy.
    pub fn with_search(mut self, search: SearchStrategy) -> Self {
        self.search = search;
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

    /// Distance below which a source point passes the cutoff.
    pub fn cutoff_radius(&self) -> f64 {
        if self.weight_cutoff > 0.0 {
            1.0 / self.weight_cutoff
        } else {
            f64::INFINITY
        }
    }

    /// Check that the options are usable.
    pub fn validate(&self) -> Result<()> {
        if !self.weight_cutoff.is_finite() || self.weight_cutoff < 0.0 {
            return Err(ShapeError::invalid_param(
                "weight_cutoff",
                self.weight_cutoff,
                "must be finite and non-negative",
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ShapeError::invalid_param(
                "epsilon",
                self.epsilon,
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

/// Normalized inverse-distance weights from every target point to its
/// contributing source points.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferWeights {
    num_sources: usize,
    /// Per target point: `(source index, normalized weight)`, ascending by
    /// source index. Empty when no source passes the cutoff.
    weights: Vec<Vec<(usize, f64)>>,
}

impl TransferWeights {
    /// Compute the weights between two point sets.
    pub fn compute(
        source_positions: &[Point3<f64>],
        target_positions: &[Point3<f64>],
        options: &TransferOptions,
    ) -> Result<Self> {
        Self::compute_with_progress(source_positions, target_positions, options, &Progress::none())
    }

    /// Compute the weights, reporting progress per chunk of target points.
    pub fn compute_with_progress(
        source_positions: &[Point3<f64>],
        target_positions: &[Point3<f64>],
        options: &TransferOptions,
        progress: &Progress,
    ) -> Result<Self> {
        options.validate()?;

        let search = build_search(options.search, source_positions);
        let radius = options.cutoff_radius();
        let total = target_positions.len();

        debug!(
            sources = source_positions.len(),
            targets = total,
            cutoff = options.weight_cutoff,
            search = ?options.search,
            "computing transfer weights"
        );

        let mut weights = Vec::with_capacity(total);
        for (chunk_index, chunk) in target_positions.chunks(PROGRESS_CHUNK).enumerate() {
            let compute = |target: &Point3<f64>| {
                compute_target_weights(target, source_positions, search.as_ref(), radius, options)
            };
            let chunk_weights: Vec<Vec<(usize, f64)>> = if options.parallel {
                chunk.par_iter().map(compute).collect()
            } else {
                chunk.iter().map(compute).collect()
            };
            weights.extend(chunk_weights);

            let done = chunk_index * PROGRESS_CHUNK + chunk.len();
            progress.report_items(done, total, "Computing transfer weights");
        }

        Ok(Self {
            num_sources: source_positions.len(),
            weights,
        })
    }

    /// Number of target points.
    pub fn num_targets(&self) -> usize {
        self.weights.len()
    }

    /// Contributing sources of target point `t` with their normalized weights.
    pub fn contributions(&self, t: usize) -> &[(usize, f64)] {
        &self.weights[t]
    }

    /// Number of target points that receive no contribution.
    pub fn num_unreached(&self) -> usize {
        self.weights.iter().filter(|w| w.is_empty()).count()
    }

    /// Blend a source displacement field onto the target points.
    ///
    /// Returns the target field's absolute positions.
    pub fn apply(
        &self,
        source_field: &[Point3<f64>],
        source_basis: &[Point3<f64>],
        target_positions: &[Point3<f64>],
    ) -> Result<Vec<Point3<f64>>> {
        ShapeError::check_len("source field", self.num_sources, source_field.len())?;
        ShapeError::check_len("source basis", self.num_sources, source_basis.len())?;
        ShapeError::check_len("target positions", self.num_targets(), target_positions.len())?;

        Ok(target_positions
            .iter()
            .zip(&self.weights)
            .map(|(target, contributions)| {
                let delta = contributions
                    .iter()
                    .fold(Vector3::zeros(), |acc, &(s, w)| {
                        acc + (source_field[s] - source_basis[s]) * w
                    });
                *target + delta
            })
            .collect())
    }
}

/// Transfer one displacement field between unrelated point sets.
///
/// # Errors
///
/// - [`ShapeError::DimensionMismatch`] if the source arrays disagree in length
/// - [`ShapeError::InvalidParameter`] for unusable options
pub fn transfer_field(
    source_field: &[Point3<f64>],
    source_basis: &[Point3<f64>],
    source_positions: &[Point3<f64>],
    target_positions: &[Point3<f64>],
    options: &TransferOptions,
) -> Result<Vec<Point3<f64>>> {
    ShapeError::check_len("source field", source_positions.len(), source_field.len())?;
    ShapeError::check_len("source basis", source_positions.len(), source_basis.len())?;
    TransferWeights::compute(source_positions, target_positions, options)?.apply(
        source_field,
        source_basis,
        target_positions,
    )
}

/// Weights from one target point to its contributing sources.
fn compute_target_weights(
    target: &Point3<f64>,
    sources: &[Point3<f64>],
    search: &dyn NeighborSearch,
    radius: f64,
    options: &TransferOptions,
) -> Vec<(usize, f64)> {
    let mut kept: Vec<(usize, f64)> = search
        .candidates(target, radius)
        .into_iter()
        .filter_map(|s| {
            let distance = (*target - sources[s]).norm();
            let weight = 1.0 / distance.max(options.epsilon);
            (weight > options.weight_cutoff).then_some((s, weight))
        })
        .collect();

    let total: f64 = kept.iter().map(|&(_, w)| w).sum();
    for (_, w) in &mut kept {
        *w /= total;
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_coincident_points_copy_delta() {
        let source = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)];
        let field = vec![Point3::new(0.0, 0.0, 1.0), Point3::new(3.0, 0.0, -1.0)];
        let target = vec![Point3::new(0.0, 0.0, 0.0)];

        let result = transfer_field(&field, &source, &source, &target, &TransferOptions::default())
            .unwrap();

        // weight 1e6 vs 1/3: the coincident source dominates.
        assert_relative_eq!(result[0].z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_boundary_weight_is_excluded() {
        let source = vec![Point3::new(10.0, 0.0, 0.0)];
        let field = vec![Point3::new(10.0, 0.0, 2.0)];
        let target = vec![Point3::new(0.0, 0.0, 0.0)];

        let weights = TransferWeights::compute(&source, &target, &TransferOptions::default()).unwrap();
        assert!(weights.contributions(0).is_empty());
        assert_eq!(weights.num_unreached(), 1);

        let result = weights.apply(&field, &source, &target).unwrap();
        assert_eq!(result[0], target[0]);
    }

    #[test]
    fn test_just_inside_cutoff_contributes() {
        let source = vec![Point3::new(9.999, 0.0, 0.0)];
        let field = vec![Point3::new(9.999, 0.0, 2.0)];
        let target = vec![Point3::new(0.0, 0.0, 0.0)];

        let result = transfer_field(&field, &source, &source, &target, &TransferOptions::default())
            .unwrap();
        assert_relative_eq!(result[0].z, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_distance_blend() {
        // Distances 1 and 3: weights 1 and 1/3, normalized 0.75 and 0.25.
        let source = vec![Point3::new(1.0, 0.0, 0.0), Point3::new(-3.0, 0.0, 0.0)];
        let field = vec![Point3::new(1.0, 4.0, 0.0), Point3::new(-3.0, 0.0, 0.0)];
        let target = vec![Point3::new(0.0, 0.0, 0.0)];

        let weights = TransferWeights::compute(&source, &target, &TransferOptions::default()).unwrap();
        let contributions = weights.contributions(0);
        assert_eq!(contributions.len(), 2);
        assert_relative_eq!(contributions[0].1, 0.75, epsilon = 1e-12);
        assert_relative_eq!(contributions[1].1, 0.25, epsilon = 1e-12);

        let result = weights.apply(&field, &source, &target).unwrap();
        assert_relative_eq!(result[0].y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_uses_basis_for_delta() {
        let source = vec![Point3::new(0.0, 0.0, 0.0)];
        let basis = vec![Point3::new(0.0, 0.0, -1.0)];
        let field = vec![Point3::new(0.0, 0.0, 0.0)];
        let target = vec![Point3::new(0.0, 1.0, 0.0)];

        let result = transfer_field(&field, &basis, &source, &target, &TransferOptions::default())
            .unwrap();
        assert_relative_eq!(result[0], Point3::new(0.0, 1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_kdtree_matches_brute_force() {
        let source: Vec<Point3<f64>> = (0..300)
            .map(|i| {
                let t = i as f64;
                Point3::new((t * 0.7).sin() * 20.0, (t * 0.3).cos() * 20.0, t * 0.05)
            })
            .collect();
        let field: Vec<Point3<f64>> = source
            .iter()
            .map(|p| p + Vector3::new(0.0, 0.0, (p.x * 0.1).sin()))
            .collect();
        let target: Vec<Point3<f64>> = (0..50)
            .map(|i| {
                let t = i as f64;
                Point3::new(t - 25.0, (t * 0.5).sin() * 10.0, 5.0)
            })
            .collect();

        let brute = TransferOptions::default().with_search(SearchStrategy::BruteForce);
        let kd = TransferOptions::default().with_search(SearchStrategy::KdTree);

        let a = transfer_field(&field, &source, &source, &target, &brute).unwrap();
        let b = transfer_field(&field, &source, &source, &target, &kd).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kdtree_with_full_bucket_on_one_plane() {
        let mut source: Vec<Point3<f64>> = (0..32)
            .map(|i| Point3::new(0.0, i as f64 * 0.5, i as f64 * 0.25))
            .collect();
        source.push(Point3::new(3.0, 1.0, 1.0));
        let field: Vec<Point3<f64>> = source.iter().map(|p| p + Vector3::x()).collect();
        let target = vec![Point3::new(0.1, 2.0, 1.0), Point3::new(2.9, 1.0, 1.0)];

        let brute = TransferOptions::default().with_search(SearchStrategy::BruteForce);
        let kd = TransferOptions::default().with_search(SearchStrategy::KdTree);

        let a = transfer_field(&field, &source, &source, &target, &brute).unwrap();
        let b = transfer_field(&field, &source, &source, &target, &kd).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_cutoff_uses_every_source() {
        let source = vec![Point3::new(100.0, 0.0, 0.0)];
        let field = vec![Point3::new(100.0, 0.0, 1.0)];
        let target = vec![Point3::origin()];

        let options = TransferOptions::default().with_weight_cutoff(0.0);
        let result = transfer_field(&field, &source, &source, &target, &options).unwrap();
        assert_relative_eq!(result[0].z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_options() {
        let options = TransferOptions::default().with_weight_cutoff(-1.0);
        assert!(matches!(
            TransferWeights::compute(&[], &[], &options),
            Err(ShapeError::InvalidParameter { name: "weight_cutoff", .. })
        ));
    }

    #[test]
    fn test_length_checks() {
        let source = vec![Point3::origin(); 2];
        let target = vec![Point3::origin()];
        let result = transfer_field(&source[..1], &source, &source, &target, &TransferOptions::default());
        assert!(matches!(result, Err(ShapeError::DimensionMismatch { .. })));
    }
}

//! Candidate search over the source point set.
//!
//! The transfer weights only depend on which source points can contribute to
//! a target point. A [`NeighborSearch`] narrows the scan down to the source
//! points within the cutoff radius; the exact weight test is still applied by
//! the caller, so every implementation yields identical transfer results.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use tracing::warn;

/// Leaf capacity of the `kiddo` tree.
const KD_BUCKET_SIZE: usize = 32;

/// How candidate source points are found for each target point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Scan every source point.
    #[default]
    BruteForce,
    /// Range query on a k-d tree built over the source points.
    KdTree,
}

/// Finds the source points that may lie within a radius of a query point.
pub trait NeighborSearch: Sync {
    /// Indices of source points within `radius` of `query`, ascending.
    ///
    /// May return extra points; must not omit any point within `radius`.
    fn candidates(&self, query: &Point3<f64>, radius: f64) -> Vec<usize>;
}

/// Returns every source point.
#[derive(Debug, Clone, Copy)]
pub struct BruteForceSearch {
    len: usize,
}

impl BruteForceSearch {
    /// Create a search over `len` source points.
    pub fn new(len: usize) -> Self {
        Self { len }
    }
}

impl NeighborSearch for BruteForceSearch {
    fn candidates(&self, _query: &Point3<f64>, _radius: f64) -> Vec<usize> {
        (0..self.len).collect()
    }
}

/// Range queries on a `kiddo` k-d tree.
pub struct KdTreeSearch {
    tree: KdTree<f64, 3>,
    len: usize,
}

impl KdTreeSearch {
    /// Build a tree over the source points.
    ///
    /// Returns `None` when a full bucket's worth of points share a
    /// coordinate value on one axis (e.g. a large flat grid), which the tree
    /// cannot split.
    pub fn build(points: &[Point3<f64>]) -> Option<Self> {
        if max_axis_multiplicity(points) >= KD_BUCKET_SIZE {
            return None;
        }
        let mut tree: KdTree<f64, 3> = KdTree::new();
        for (i, p) in points.iter().enumerate() {
            tree.add(&[p.x, p.y, p.z], i as u64);
        }
        Some(Self {
            tree,
            len: points.len(),
        })
    }
}

impl NeighborSearch for KdTreeSearch {
    fn candidates(&self, query: &Point3<f64>, radius: f64) -> Vec<usize> {
        if !radius.is_finite() {
            return (0..self.len).collect();
        }
        // Slightly widened so rounding in the squared metric never drops a
        // point the exact test would keep.
        let radius_sq = radius * radius * (1.0 + 1e-9) + f64::EPSILON;
        let mut found: Vec<usize> = self
            .tree
            .within::<SquaredEuclidean>(&[query.x, query.y, query.z], radius_sq)
            .into_iter()
            .map(|n| n.item as usize)
            .collect();
        found.sort_unstable();
        found
    }
}

impl std::fmt::Debug for KdTreeSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KdTreeSearch")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

/// Build the search structure for a strategy.
pub fn build_search(
    strategy: SearchStrategy,
    points: &[Point3<f64>],
) -> Box<dyn NeighborSearch> {
    match strategy {
        SearchStrategy::BruteForce => Box::new(BruteForceSearch::new(points.len())),
        SearchStrategy::KdTree => match KdTreeSearch::build(points) {
            Some(search) => Box::new(search),
            None => {
                warn!(
                    points = points.len(),
                    "too many coincident coordinates for a k-d tree, scanning all source points"
                );
                Box::new(BruteForceSearch::new(points.len()))
            }
        },
    }
}

/// Largest number of points sharing one coordinate value on any axis.
fn max_axis_multiplicity(points: &[Point3<f64>]) -> usize {
    let mut worst = 0;
    for axis in 0..3 {
        let mut values: Vec<f64> = points.iter().map(|p| p[axis]).collect();
        values.sort_unstable_by(|a, b| a.total_cmp(b));
        let mut run = 0;
        for i in 0..values.len() {
            if i > 0 && values[i] == values[i - 1] {
                run += 1;
            } else {
                run = 1;
            }
            worst = worst.max(run);
        }
    }
    worst
}

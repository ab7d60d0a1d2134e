//! Radius-based smoothing of vertex group weights.
//!
//! Every vertex that belongs to at least one group is blended towards the
//! weights found within `radius` of it (itself included), across all groups
//! at once. A group present on a neighbor but not on the vertex is blended in
//! from zero, so weights spread across the seam between two groups. Vertices
//! without any membership are left alone. Each pass reads the weights from
//! the start of the pass.
//!
//! The neighborhood sum of each group is divided by the number of group
//! memberships found in the neighborhood, not by the number of neighbors, so
//! at a seam the blended weights of all groups share one denominator.

use nalgebra::Point3;

use crate::error::{Result, ShapeError};

use super::transfer::{build_search, SearchStrategy};

/// Options for radius-based weight smoothing.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSmoothOptions {
    /// Neighborhood radius in mesh units.
    pub radius: f64,

    /// Blend factor towards the neighborhood mean (0.0 to 1.0).
    pub influence: f64,

    /// Number of passes.
    pub iterations: usize,
}

impl Default for WeightSmoothOptions {
    fn default() -> Self {
        Self {
            radius: 0.1,
            influence: 0.5,
            iterations: 1,
        }
    }
}

impl WeightSmoothOptions {
    /// Create options with the specified radius.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Create options with the specified influence, clamped to `[0, 1]`.
    pub fn with_influence(mut self, influence: f64) -> Self {
        self.influence = influence.clamp(0.0, 1.0);
        self
    }

    /// Create options with the specified number of passes.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    fn validate(&self) -> Result<()> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(ShapeError::invalid_param("radius", self.radius, "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.influence) {
            return Err(ShapeError::invalid_param(
                "influence",
                self.influence,
                "must be in [0, 1]",
            ));
        }
        if self.iterations == 0 {
            return Err(ShapeError::invalid_param(
                "iterations",
                self.iterations,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Smooth the weights of several groups by spatial proximity.
///
/// `groups[g][v]` is `None` when vertex `v` is not in group `g`. The result
/// has the same shape; a vertex may gain membership in a group one of its
/// neighbors belongs to.
pub fn smooth_weights(
    positions: &[Point3<f64>],
    groups: &[Vec<Option<f64>>],
    options: &WeightSmoothOptions,
) -> Result<Vec<Vec<Option<f64>>>> {
    options.validate()?;
    for weights in groups {
        ShapeError::check_len("weights", positions.len(), weights.len())?;
    }

    let mut current = groups.to_vec();
    let weighted: Vec<usize> = (0..positions.len())
        .filter(|&v| groups.iter().any(|g| g[v].is_some()))
        .collect();
    if weighted.is_empty() {
        return Ok(current);
    }

    let search = build_search(SearchStrategy::KdTree, positions);

    // Positions do not move, so neighborhoods are found once.
    let neighborhoods: Vec<Vec<usize>> = weighted
        .iter()
        .map(|&v| {
            search
                .candidates(&positions[v], options.radius)
                .into_iter()
                .filter(|&n| (positions[n] - positions[v]).norm() <= options.radius)
                .collect()
        })
        .collect();

    let mut sums: Vec<Option<f64>> = vec![None; groups.len()];
    for _ in 0..options.iterations {
        let previous = current.clone();
        for (&v, neighborhood) in weighted.iter().zip(&neighborhoods) {
            sums.fill(None);
            let mut memberships = 0usize;
            for &n in neighborhood {
                for (sum, weights) in sums.iter_mut().zip(&previous) {
                    if let Some(w) = weights[n] {
                        *sum = Some(sum.unwrap_or(0.0) + w);
                        memberships += 1;
                    }
                }
            }
            if memberships == 0 {
                continue;
            }

            for (g, sum) in sums.iter().enumerate() {
                if let Some(sum) = sum {
                    let own = previous[g][v].unwrap_or(0.0);
                    let mean = sum / memberships as f64;
                    current[g][v] = Some((1.0 - options.influence) * own + options.influence * mean);
                }
            }
        }
    }

    Ok(current)
}

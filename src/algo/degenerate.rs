//! Detection of no-op displacement fields.
//!
//! A field is degenerate when every coordinate of every vertex is within
//! `tolerance` of its reference: `|field[v][c] - reference[v][c]| <= tolerance`.
//! The comparison runs over flat coordinate arrays (`[x0, y0, z0, x1, ...]`)
//! so references shared by many keys are flattened once.

use nalgebra::Point3;

use crate::error::{Result, ShapeError};

/// Default per-coordinate tolerance.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Options for degenerate field detection.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectOptions {
    /// Largest per-coordinate difference still considered zero.
    pub tolerance: f64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl DetectOptions {
    /// Create options with the specified tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Check that the tolerance is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ShapeError::invalid_param(
                "tolerance",
                self.tolerance,
                "must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// Flatten positions into `[x0, y0, z0, x1, y1, z1, ...]`.
pub fn flatten(positions: &[Point3<f64>]) -> Vec<f64> {
    let mut flat = Vec::with_capacity(positions.len() * 3);
    for p in positions {
        flat.extend_from_slice(&[p.x, p.y, p.z]);
    }
    flat
}

/// Compare two flat coordinate arrays elementwise.
///
/// Returns `true` iff every `|field[i] - reference[i]| <= tolerance`. A NaN
/// coordinate never compares as degenerate.
pub fn is_degenerate_flat(field: &[f64], reference: &[f64], tolerance: f64) -> Result<bool> {
    ShapeError::check_len("flattened field", reference.len(), field.len())?;
    Ok(field
        .iter()
        .zip(reference)
        .all(|(f, r)| (f - r).abs() <= tolerance))
}

/// Check whether a field is numerically indistinguishable from its reference.
///
/// # Example
///
/// ```
/// use shapekit::algo::degenerate::is_degenerate;
/// use nalgebra::Point3;
///
/// let reference = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)];
/// let mut field = reference.clone();
/// field[1].y = 0.0004;
///
/// assert!(is_degenerate(&field, &reference, 0.001).unwrap());
/// assert!(!is_degenerate(&field, &reference, 0.0001).unwrap());
/// ```
pub fn is_degenerate(
    field: &[Point3<f64>],
    reference: &[Point3<f64>],
    tolerance: f64,
) -> Result<bool> {
    ShapeError::check_len("field", reference.len(), field.len())?;
    is_degenerate_flat(&flatten(field), &flatten(reference), tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_comparison() {
        let field = vec![Point3::new(0.1, -2.0, 3.5), Point3::new(1e9, 0.0, -1e-9)];
        assert!(is_degenerate(&field, &field, 0.0).unwrap());
        assert!(is_degenerate(&field, &field, DEFAULT_TOLERANCE).unwrap());
    }

    #[test]
    fn test_single_component_breaks_degeneracy() {
        let reference = vec![Point3::origin(); 3];
        let mut field = reference.clone();
        field[2].z = 0.01;
        assert!(!is_degenerate(&field, &reference, DEFAULT_TOLERANCE).unwrap());

        field[2].z = -0.0005;
        assert!(is_degenerate(&field, &reference, DEFAULT_TOLERANCE).unwrap());
    }

    #[test]
    fn test_nan_is_not_degenerate() {
        let reference = vec![Point3::origin()];
        let field = vec![Point3::new(f64::NAN, 0.0, 0.0)];
        assert!(!is_degenerate(&field, &reference, 1.0).unwrap());
    }

    #[test]
    fn test_flatten_layout() {
        let flat = flatten(&[Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)]);
        assert_eq!(flat, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_length_mismatch() {
        let reference = vec![Point3::origin(); 2];
        assert!(is_degenerate(&reference[..1], &reference, 0.1).is_err());
    }

    #[test]
    fn test_options_validate() {
        assert!(DetectOptions::default().validate().is_ok());
        assert!(DetectOptions::default().with_tolerance(-1.0).validate().is_err());
    }
}

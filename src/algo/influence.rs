//! Clearing a field's displacement on a vertex selection.

use nalgebra::Point3;

use crate::error::{Result, ShapeError};

/// Reset the selected vertices of `field` to their reference positions.
///
/// Returns the new field; unselected vertices are copied unchanged. The
/// selection may contain duplicates but must not be empty.
pub fn clear_displacement(
    field: &[Point3<f64>],
    reference: &[Point3<f64>],
    selection: &[usize],
) -> Result<Vec<Point3<f64>>> {
    ShapeError::check_len("field", reference.len(), field.len())?;
    if selection.is_empty() {
        return Err(ShapeError::EmptySelection);
    }

    let mut result = field.to_vec();
    for (i, &v) in selection.iter().enumerate() {
        if v >= reference.len() {
            return Err(ShapeError::InvalidVertexIndex { face: i, vertex: v });
        }
        result[v] = reference[v];
    }
    Ok(result)
}

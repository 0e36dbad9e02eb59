//! Normal-offset curve generation.

use shared::Point3D;

use super::vector::planar_distance;
use super::GeometryError;

/// Signed displacement of one control point relative to a reference point:
/// `lateral` along the reference normal, `vertical` in height.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointOffset {
    pub lateral: f64,
    pub vertical: f64,
}

/// Map every control point to the nearest serie sample.
///
/// The search runs forward from the previous control point's index so the result
/// is monotone; the first and last control points map to the first and last samples.
pub fn resolve_catmull_indices(
    serie: &[Point3D],
    catmull: &[Point3D],
) -> Result<Vec<usize>, GeometryError> {
    if serie.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            needed: 2,
            got: serie.len(),
        });
    }
    let last = serie.len() - 1;
    let mut indices = Vec::with_capacity(catmull.len());
    let mut start = 0;
    for (i, c) in catmull.iter().enumerate() {
        let index = if i == 0 {
            0
        } else if i == catmull.len() - 1 {
            last
        } else {
            (start..=last)
                .min_by(|a, b| {
                    planar_distance(serie[*a], *c).total_cmp(&planar_distance(serie[*b], *c))
                })
                .unwrap_or(start)
        };
        start = index;
        indices.push(index);
    }
    Ok(indices)
}

/// Move every control point by `distance` along the normal at its resolved index.
pub fn offset_by_normal(
    catmull: &[Point3D],
    normals: &[Point3D],
    indices: &[usize],
    distance: f64,
) -> Result<Vec<Point3D>, GeometryError> {
    offset_by_normal_each(catmull, normals, indices, &vec![distance; catmull.len()])
}

/// Like [`offset_by_normal`] with one distance per control point.
pub fn offset_by_normal_each(
    catmull: &[Point3D],
    normals: &[Point3D],
    indices: &[usize],
    distances: &[f64],
) -> Result<Vec<Point3D>, GeometryError> {
    check_len(catmull.len(), indices.len())?;
    check_len(catmull.len(), distances.len())?;

    catmull
        .iter()
        .zip(indices)
        .zip(distances)
        .map(|((p, &index), &d)| {
            let n = normals.get(index).ok_or(GeometryError::IndexOutOfRange {
                index,
                len: normals.len(),
            })?;
            Ok(Point3D::new(p.x + n.x * d, p.y + n.y * d, p.z + n.z * d))
        })
        .collect()
}

/// Per-point offsets of `line` relative to `reference`, measured along the
/// reference normals at `indices`.
pub fn signed_offsets(
    reference: &[Point3D],
    normals: &[Point3D],
    indices: &[usize],
    line: &[Point3D],
) -> Result<Vec<PointOffset>, GeometryError> {
    check_len(reference.len(), line.len())?;
    check_len(reference.len(), indices.len())?;

    reference
        .iter()
        .zip(line)
        .zip(indices)
        .map(|((r, l), &index)| {
            let n = normals.get(index).ok_or(GeometryError::IndexOutOfRange {
                index,
                len: normals.len(),
            })?;
            Ok(PointOffset {
                lateral: (l.x - r.x) * n.x + (l.y - r.y) * n.y,
                vertical: l.z - r.z,
            })
        })
        .collect()
}

fn check_len(expected: usize, got: usize) -> Result<(), GeometryError> {
    if expected != got {
        return Err(GeometryError::LengthMismatch { expected, got });
    }
    Ok(())
}

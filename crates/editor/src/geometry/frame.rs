//! Per-sample tangents and horizontal normals of a serie polyline.

use glam::{DVec2, DVec3};
use shared::Point3D;

use super::vector::{from_dvec3, to_dvec3};
use super::{GeometryError, EPSILON};

/// Unit normals and tangents, one per serie point.
#[derive(Debug, Clone, PartialEq)]
pub struct SerieFrames {
    pub normals: Vec<Point3D>,
    pub tangents: Vec<Point3D>,
}

/// Finite-difference frames: central differences inside, one-sided at the ends.
///
/// The tangent is the unit 3D direction; the normal is the unit left normal of
/// its planar projection, `(-t.y, t.x, 0)`.
pub fn compute_normals_and_tangents(serie: &[Point3D]) -> Result<SerieFrames, GeometryError> {
    let n = serie.len();
    if n < 2 {
        return Err(GeometryError::TooFewPoints { needed: 2, got: n });
    }

    let mut normals = Vec::with_capacity(n);
    let mut tangents = Vec::with_capacity(n);
    for i in 0..n {
        let (a, b) = if i == 0 {
            (serie[0], serie[1])
        } else if i == n - 1 {
            (serie[n - 2], serie[n - 1])
        } else {
            (serie[i - 1], serie[i + 1])
        };
        let d: DVec3 = to_dvec3(b) - to_dvec3(a);
        let planar = DVec2::new(d.x, d.y);
        if planar.length() < EPSILON {
            return Err(GeometryError::ZeroTangent { index: i });
        }
        let normal = planar.normalize().perp();
        tangents.push(from_dvec3(d.normalize()));
        normals.push(Point3D::planar(normal.x, normal.y));
    }

    Ok(SerieFrames { normals, tangents })
}

/// Overwrite the end normals with the reference line's end normals, negated
/// when `flip` is set (curve traversed against the reference direction).
pub fn pin_end_normals(normals: &mut [Point3D], first: Point3D, last: Point3D, flip: bool) {
    let sign = if flip { -1.0 } else { 1.0 };
    let scaled = |p: Point3D| Point3D::new(p.x * sign, p.y * sign, p.z * sign);
    if let Some(n) = normals.first_mut() {
        *n = scaled(first);
    }
    if let Some(n) = normals.last_mut() {
        *n = scaled(last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_frames() {
        let serie: Vec<Point3D> = (0..5).map(|i| Point3D::planar(i as f64, 0.0)).collect();
        let frames = compute_normals_and_tangents(&serie).unwrap();
        for (n, t) in frames.normals.iter().zip(&frames.tangents) {
            assert!((n.y - 1.0).abs() < 1e-12 && n.x.abs() < 1e-12);
            assert!((t.x - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_sloped_tangent_is_unit_and_normal_is_horizontal() {
        let serie = vec![
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(0.0, 3.0, 4.0),
            Point3D::new(0.0, 6.0, 8.0),
        ];
        let frames = compute_normals_and_tangents(&serie).unwrap();
        let t = frames.tangents[1];
        assert!(((t.x * t.x + t.y * t.y + t.z * t.z).sqrt() - 1.0).abs() < 1e-12);
        assert!((t.z - 0.8).abs() < 1e-12);
        let n = frames.normals[1];
        assert_eq!(n.z, 0.0);
        assert!((n.x + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_vertical_step_rejected() {
        let serie = vec![Point3D::planar(0.0, 0.0), Point3D::new(0.0, 0.0, 2.0)];
        assert_eq!(
            compute_normals_and_tangents(&serie),
            Err(GeometryError::ZeroTangent { index: 0 })
        );
    }

    #[test]
    fn test_pin_end_normals_with_flip() {
        let mut normals = vec![Point3D::planar(0.0, 1.0); 4];
        pin_end_normals(
            &mut normals,
            Point3D::planar(1.0, 0.0),
            Point3D::planar(0.0, -1.0),
            true,
        );
        assert_eq!(normals[0], Point3D::planar(-1.0, 0.0));
        assert_eq!(normals[3], Point3D::planar(0.0, 1.0));
        assert_eq!(normals[1], Point3D::planar(0.0, 1.0));
    }
}

//! Catmull-Rom tangent fitting for planar and altitude curves.

use kurbo::{Point, Vec2};
use shared::{Point2D, Point3D};

use super::vector::{planar_distance, station_point, to_point};
use super::{GeometryError, EPSILON};

/// Central chord `(P[i+1] - P[i-1]) / 2` inside, one-sided chords at the ends.
fn catmull_rom(points: &[Point]) -> Vec<Vec2> {
    let n = points.len();
    (0..n)
        .map(|i| {
            if i == 0 {
                points[1] - points[0]
            } else if i == n - 1 {
                points[n - 1] - points[n - 2]
            } else {
                (points[i + 1] - points[i - 1]) * 0.5
            }
        })
        .collect()
}

/// Fit one planar tangent per control point (z of the result is always 0).
pub fn fit_tangents(points: &[Point3D]) -> Result<Vec<Point3D>, GeometryError> {
    if points.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            needed: 2,
            got: points.len(),
        });
    }
    for (index, pair) in points.windows(2).enumerate() {
        if planar_distance(pair[0], pair[1]) < EPSILON {
            return Err(GeometryError::DegenerateSegment { index });
        }
    }

    let planar: Vec<Point> = points.iter().map(|p| to_point(*p)).collect();
    catmull_rom(&planar)
        .into_iter()
        .enumerate()
        .map(|(index, t)| {
            if t.hypot() < EPSILON {
                Err(GeometryError::ZeroTangent { index })
            } else {
                Ok(Point3D::planar(t.x, t.y))
            }
        })
        .collect()
}

/// Fit tangents over (arc length, altitude) stations. Stations must strictly increase.
pub fn fit_altitude_tangents(points: &[Point2D]) -> Result<Vec<Point2D>, GeometryError> {
    if points.len() < 2 {
        return Err(GeometryError::TooFewPoints {
            needed: 2,
            got: points.len(),
        });
    }
    for (i, pair) in points.windows(2).enumerate() {
        if pair[1].x - pair[0].x <= EPSILON {
            return Err(GeometryError::NonIncreasingStation { index: i + 1 });
        }
    }

    let stations: Vec<Point> = points.iter().map(|p| station_point(*p)).collect();
    Ok(catmull_rom(&stations)
        .into_iter()
        .map(|t| Point2D::new(t.x, t.y))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_point_tangents_equal_chord() {
        let pts = vec![Point3D::planar(0.0, 0.0), Point3D::new(10.0, 0.0, 5.0)];
        let t = fit_tangents(&pts).unwrap();
        assert_eq!(t, vec![Point3D::planar(10.0, 0.0), Point3D::planar(10.0, 0.0)]);
    }

    #[test]
    fn test_interior_tangent_is_central_chord() {
        let pts = vec![
            Point3D::planar(0.0, 0.0),
            Point3D::planar(10.0, 0.0),
            Point3D::planar(10.0, 10.0),
        ];
        let t = fit_tangents(&pts).unwrap();
        assert_eq!(t[1], Point3D::planar(5.0, 5.0));
        assert_eq!(t[2], Point3D::planar(0.0, 10.0));
    }

    #[test]
    fn test_coincident_points_rejected() {
        let pts = vec![
            Point3D::planar(0.0, 0.0),
            Point3D::new(0.0, 0.0, 3.0),
            Point3D::planar(5.0, 0.0),
        ];
        assert_eq!(
            fit_tangents(&pts),
            Err(GeometryError::DegenerateSegment { index: 0 })
        );
    }

    #[test]
    fn test_backtracking_gives_zero_tangent() {
        let pts = vec![
            Point3D::planar(0.0, 0.0),
            Point3D::planar(5.0, 0.0),
            Point3D::planar(0.0, 0.0),
        ];
        assert_eq!(fit_tangents(&pts), Err(GeometryError::ZeroTangent { index: 1 }));
    }

    #[test]
    fn test_single_point_rejected() {
        assert!(matches!(
            fit_tangents(&[Point3D::planar(1.0, 1.0)]),
            Err(GeometryError::TooFewPoints { needed: 2, got: 1 })
        ));
    }

    #[test]
    fn test_altitude_tangents() {
        let pts = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(10.0, 2.0),
            Point2D::new(20.0, 2.0),
        ];
        let t = fit_altitude_tangents(&pts).unwrap();
        assert_eq!(t[0], Point2D::new(10.0, 2.0));
        assert_eq!(t[1], Point2D::new(10.0, 1.0));
        assert!(t.iter().all(|v| v.x > 0.0));
    }

    #[test]
    fn test_altitude_stations_must_increase() {
        let pts = vec![Point2D::new(0.0, 0.0), Point2D::new(5.0, 1.0), Point2D::new(5.0, 2.0)];
        assert_eq!(
            fit_altitude_tangents(&pts),
            Err(GeometryError::NonIncreasingStation { index: 2 })
        );
    }
}

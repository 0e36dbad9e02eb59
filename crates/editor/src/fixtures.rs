//! Ready-made roads and maps for tests and demos.
//!
//! Every helper builds its entities with the default settings and panics on
//! degenerate input.

use shared::{ContactPoint, MapDescription, Point3D, Road, RoadCategory, RoadEnd};

use crate::config::EditorSettings;
use crate::derive::initial_road;

/// Control points of a gentle S-curve with varying height.
pub fn s_curve_points() -> Vec<Point3D> {
    vec![
        Point3D::new(0.0, 0.0, 0.0),
        Point3D::new(30.0, 10.0, 1.0),
        Point3D::new(60.0, -10.0, 2.0),
        Point3D::new(90.0, 0.0, 1.5),
        Point3D::new(120.0, 5.0, 1.0),
    ]
}

/// Straight road from `start` to `end`, one lane per side.
pub fn straight_road_between(id: &str, start: Point3D, end: Point3D) -> Road {
    initial_road(
        id,
        RoadCategory::Straight,
        &[start, end],
        None,
        &EditorSettings::default(),
    )
    .expect("fixture road endpoints must differ")
}

/// Straight road along +x starting at the origin.
pub fn straight_road(id: &str, length: f64) -> Road {
    straight_road_between(id, Point3D::planar(0.0, 0.0), Point3D::planar(length, 0.0))
}

/// Spline road through [`s_curve_points`].
pub fn spline_road(id: &str) -> Road {
    initial_road(
        id,
        RoadCategory::Spline,
        &s_curve_points(),
        None,
        &EditorSettings::default(),
    )
    .expect("fixture spline must be well formed")
}

pub fn map_with_roads(roads: Vec<Road>) -> MapDescription {
    MapDescription {
        roads,
        ..Default::default()
    }
}

/// Four arms around (60, 0): A from the west, B to the north, C to the east,
/// D from the south. Arms stop 20 m short of the centre.
pub fn crossing_map() -> MapDescription {
    map_with_roads(vec![
        straight_road_between("A", Point3D::planar(0.0, 0.0), Point3D::planar(40.0, 0.0)),
        straight_road_between("B", Point3D::planar(60.0, 20.0), Point3D::planar(60.0, 60.0)),
        straight_road_between("C", Point3D::planar(80.0, 0.0), Point3D::planar(120.0, 0.0)),
        straight_road_between("D", Point3D::planar(60.0, -60.0), Point3D::planar(60.0, -20.0)),
    ])
}

/// The road ends of [`crossing_map`] facing the centre.
pub fn crossing_ends() -> Vec<RoadEnd> {
    vec![
        RoadEnd::new("A", ContactPoint::End),
        RoadEnd::new("B", ContactPoint::Start),
        RoadEnd::new("C", ContactPoint::Start),
        RoadEnd::new("D", ContactPoint::End),
    ]
}

//! Integration tests for the curve kernel.
//!
//! Control points -> build_curve / initial_road -> check the sampled geometry.

use hdmap_editor_lib::config::EditorSettings;
use hdmap_editor_lib::derive::{build_curve, initial_road, lane_width};
use hdmap_editor_lib::fixtures::*;
use hdmap_editor_lib::geometry::{planar_distance, GeometryError, SamplePolicy};
use hdmap_editor_lib::validation::RoadValidator;
use shared::{Point3D, RoadCategory};

#[test]
fn test_spline_road_end_to_end() {
    let road = spline_road("S1");
    let v = RoadValidator::new(&road, 1e-6);
    let errors = v.validate_all();
    assert!(errors.is_empty(), "Validation errors: {:?}", errors);
    assert_eq!(v.resolution(), 120);

    let controls = s_curve_points();
    let serie = &road.reference_line.serie_points;
    assert_eq!(serie[0], controls[0]);
    assert_eq!(serie[119], controls[4]);
}

#[test]
fn test_altitude_profile_passes_through_control_heights() {
    let road = spline_road("S1");
    let heights: Vec<f64> = road
        .reference_line
        .altitude_catmull_points
        .iter()
        .map(|p| p.y)
        .collect();
    assert_eq!(heights, vec![0.0, 1.0, 2.0, 1.5, 1.0]);

    let stations = &road.reference_line.altitude_catmull_points;
    assert_eq!(stations[0].x, 0.0);
    assert!(stations.windows(2).all(|w| w[1].x > w[0].x));
}

#[test]
fn test_straight_road_is_evenly_spaced() {
    let road = straight_road("R1", 39.0);
    let serie = &road.reference_line.serie_points;
    assert_eq!(serie.len(), 40);
    for pair in serie.windows(2) {
        assert!((planar_distance(pair[0], pair[1]) - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_default_lanes_sit_one_width_away() {
    let road = straight_road("R1", 30.0);
    for p in &road.left_lanes[0].outer_line.geometry.serie_points {
        assert!((p.y - 3.5).abs() < 1e-9);
    }
    for p in &road.right_lanes[0].outer_line.geometry.serie_points {
        assert!((p.y + 3.5).abs() < 1e-9);
    }
    assert!((lane_width(&road.left_lanes[0]) - 3.5).abs() < 1e-9);
    assert_eq!(road.left_lanes[0].id, "R1_0_1");
    assert_eq!(road.right_lanes[0].id, "R1_0_-1");
}

#[test]
fn test_control_refine_keeps_endpoints() {
    let points = vec![Point3D::new(0.0, 0.0, 1.0), Point3D::new(10.0, 10.0, 2.0)];
    let tangents = vec![Point3D::planar(40.0, 0.0), Point3D::planar(0.0, 40.0)];
    let curve = build_curve(
        &points,
        Some(&tangents),
        SamplePolicy::ControlRefine {
            count: 60,
            subdivisions: 4,
        },
    )
    .unwrap();
    assert_eq!(curve.resolution(), 60);
    assert_eq!(curve.first_serie_point(), Some(points[0]));
    assert_eq!(curve.last_serie_point(), Some(points[1]));
}

#[test]
fn test_degenerate_control_points_fail_fast() {
    let result = initial_road(
        "bad",
        RoadCategory::Spline,
        &[
            Point3D::planar(0.0, 0.0),
            Point3D::planar(0.0, 0.0),
            Point3D::planar(10.0, 0.0),
        ],
        None,
        &EditorSettings::default(),
    );
    assert_eq!(result.unwrap_err(), GeometryError::DegenerateSegment { index: 0 });
}

#[test]
fn test_close_control_points_create_a_road() {
    let road = initial_road(
        "R2",
        RoadCategory::Spline,
        &[
            Point3D::planar(0.0, 0.0),
            Point3D::planar(2.0, 0.0),
            Point3D::planar(1000.0, 0.0),
        ],
        None,
        &EditorSettings::default(),
    )
    .unwrap();
    let stations: Vec<f64> = road
        .reference_line
        .altitude_catmull_points
        .iter()
        .map(|p| p.x)
        .collect();
    assert!(stations.windows(2).all(|w| w[0] < w[1]), "{:?}", stations);
    assert_eq!(road.reference_line.resolution(), 120);
}

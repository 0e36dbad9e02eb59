//! Integration tests for transactions driven through the headless harness.
//!
//! Edit -> commit -> store / bus / plugins -> undo / redo.

use hdmap_editor_lib::derive::lane_width;
use hdmap_editor_lib::fixtures::*;
use hdmap_editor_lib::harness::EditorHarness;
use hdmap_editor_lib::plugin::WarningKind;
use hdmap_editor_lib::transaction::{
    AddLane, CreateConnectionRoad, CreateJunction, CreateRoad, CreateSignal, EditLaneLineCatmull,
    EditLaneWidth, EditRoadAltitude, EditRoadCatmull, ExtendRoad, RemoveJunction, RemoveLane,
    RemoveRoad,
};
use hdmap_editor_lib::validation::RoadValidator;
use shared::{ContactPoint, LaneSide, LineSide, Point2D, Point3D, RoadEnd, SignalType};

fn harness_with(roads: Vec<shared::Road>) -> EditorHarness {
    let mut h = EditorHarness::default();
    h.load_map(map_with_roads(roads));
    h
}

#[test]
fn test_spline_road_create_remove_undo() {
    let mut h = EditorHarness::default();
    h.submit(CreateRoad::spline("S1", s_curve_points())).unwrap();
    assert_eq!(h.renders.calls_on("InvokeCreateSplineRoadEvent"), vec!["S1".to_string()]);
    let created = h.road("S1").unwrap();
    assert!(RoadValidator::new(&created, 1e-6).is_valid());

    h.submit(RemoveRoad::new("S1")).unwrap();
    assert!(h.road("S1").is_none());
    assert_eq!(h.renders.calls_on("InvokeRemoveSplineRoadEvent"), vec!["S1".to_string()]);

    assert!(h.undo().unwrap());
    assert_eq!(*h.road("S1").unwrap(), *created);
    assert_eq!(h.renders.calls_on("InvokeCreateSplineRoadEvent").len(), 2);
}

#[test]
fn test_add_lane_takes_next_counter_value() {
    let mut h = harness_with(vec![straight_road("R", 30.0)]);
    h.submit(AddLane::new("R", LaneSide::Left, 0)).unwrap();

    let road = h.road("R").unwrap();
    assert_eq!(road.general_left_lane_index, 2);
    assert_eq!(road.left_lanes[1].id, "R_0_2");
    assert!((lane_width(&road.left_lanes[1]) - 3.5).abs() < 1e-9);
    assert_eq!(
        road.left_lanes[1].inner_line.geometry,
        road.left_lanes[0].outer_line.geometry
    );
    assert_eq!(h.renders.calls_on("InvokeReformatStraightRoadEvent"), vec!["R".to_string()]);
}

#[test]
fn test_add_then_remove_lane_round_trip() {
    let original = straight_road("R", 30.0);
    let mut h = harness_with(vec![original.clone()]);
    h.submit(AddLane::new("R", LaneSide::Right, -1)).unwrap();
    assert_eq!(h.road("R").unwrap().right_lanes[0].id, "R_0_-2");
    assert_eq!(h.road("R").unwrap().right_lanes[1].id, "R_0_-1");

    h.submit(RemoveLane::new("R", "R_0_-2")).unwrap();
    let road = h.road("R").unwrap();
    assert_eq!(road.right_lanes.len(), 1);
    assert_eq!(road.right_lanes[0].id, "R_0_-1");
    assert_eq!(road.general_right_lane_index, 2);
    for (a, b) in road.right_lanes[0]
        .outer_line
        .geometry
        .serie_points
        .iter()
        .zip(&original.right_lanes[0].outer_line.geometry.serie_points)
    {
        assert!((a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
    }
}

#[test]
fn test_collapsing_a_lane_warns_once() {
    let road = straight_road("R", 40.0);
    let reference = road.reference_line.clone();
    let mut h = harness_with(vec![road]);

    h.submit(EditLaneLineCatmull {
        road_id: "R".to_string(),
        lane_id: "R_0_1".to_string(),
        line_side: LineSide::Outer,
        catmull_points: reference.catmull_points.clone(),
        catmull_tangents: Some(reference.catmull_tangents.clone()),
    })
    .unwrap();
    assert_eq!(h.validity.count(WarningKind::OnlyPostInvalid), 1);
    assert_eq!(h.validity.count(WarningKind::PreAndPostInvalid), 0);

    // the left lane is still collapsed
    h.submit(EditLaneWidth {
        road_id: "R".to_string(),
        lane_id: "R_0_-1".to_string(),
        width: 3.0,
    })
    .unwrap();
    assert_eq!(h.validity.count(WarningKind::OnlyPostInvalid), 1);
    assert_eq!(h.validity.count(WarningKind::PreAndPostInvalid), 1);
}

#[test]
fn test_undo_restores_snapshot() {
    let mut h = EditorHarness::default();
    h.load_map(crossing_map());
    let before = h.export_map();

    h.submit(CreateJunction {
        junction_id: "J".to_string(),
        ends: crossing_ends(),
    })
    .unwrap();
    h.submit(CreateConnectionRoad {
        road_id: "AC".to_string(),
        from: RoadEnd::new("A", ContactPoint::End),
        to: RoadEnd::new("C", ContactPoint::Start),
        junction_id: Some("J".to_string()),
    })
    .unwrap();
    h.submit(EditLaneWidth {
        road_id: "A".to_string(),
        lane_id: "A_0_1".to_string(),
        width: 4.0,
    })
    .unwrap();
    assert_ne!(h.export_map(), before);

    while h.undo().unwrap() {}
    assert_eq!(h.export_map(), before);
    assert!(h.history.can_redo());
}

#[test]
fn test_remove_junction_keeps_connectors() {
    let mut h = EditorHarness::default();
    h.load_map(crossing_map());
    h.submit(CreateJunction {
        junction_id: "J".to_string(),
        ends: crossing_ends(),
    })
    .unwrap();
    h.submit(CreateConnectionRoad {
        road_id: "AC".to_string(),
        from: RoadEnd::new("A", ContactPoint::End),
        to: RoadEnd::new("C", ContactPoint::Start),
        junction_id: Some("J".to_string()),
    })
    .unwrap();

    h.submit(RemoveJunction {
        junction_id: "J".to_string(),
    })
    .unwrap();
    assert!(h.junction("J").is_none());
    let connector = h.road("AC").unwrap();
    assert_eq!(connector.connection.as_ref().unwrap().junction_id, None);

    h.undo().unwrap();
    let junction = h.junction("J").unwrap();
    assert!(junction
        .connections
        .iter()
        .any(|c| c.connector_road_id.as_deref() == Some("AC")));
}

#[test]
fn test_redo_replays_signal() {
    let mut h = EditorHarness::default();
    h.submit(CreateSignal {
        signal_id: "S".to_string(),
        signal_type: SignalType::ArrowPanel,
        center: Point3D::new(5.0, 5.0, 6.0),
        heading: 0.0,
        width: 2.0,
        height: 0.5,
    })
    .unwrap();
    let created = h.signal("S").unwrap();
    assert_eq!(created.sub_signals.len(), 4);

    h.undo().unwrap();
    assert_eq!(h.signal_count(), 0);
    h.redo().unwrap();
    assert_eq!(*h.signal("S").unwrap(), *created);
}

#[test]
fn test_altitude_curve_survives_planar_edits() {
    let mut h = harness_with(vec![straight_road("R", 100.0)]);
    let hump = vec![
        Point2D::new(0.0, 0.0),
        Point2D::new(50.0, 10.0),
        Point2D::new(100.0, 0.0),
    ];
    h.submit(EditRoadAltitude {
        road_id: "R".to_string(),
        altitude_points: hump.clone(),
        altitude_tangents: None,
    })
    .unwrap();
    let humped = h.road("R").unwrap();

    h.submit(EditRoadCatmull {
        road_id: "R".to_string(),
        index: 1,
        point: Point3D::planar(100.0, 2.0),
        tangent: None,
    })
    .unwrap();
    h.submit(ExtendRoad::new("R")).unwrap();

    let road = h.road("R").unwrap();
    let heights: Vec<f64> = road
        .reference_line
        .altitude_catmull_points
        .iter()
        .map(|p| p.y)
        .collect();
    assert_eq!(heights, vec![0.0, 10.0, 0.0, 0.0]);
    for line in [&road.reference_line, &road.left_lanes[0].outer_line.geometry] {
        let peak = line.serie_points.iter().map(|p| p.z).fold(f64::MIN, f64::max);
        assert!((peak - 10.0).abs() < 0.2, "peak {}", peak);
    }
    assert!(RoadValidator::new(&road, 1e-6).is_valid());

    assert!(h.undo().unwrap());
    assert!(h.undo().unwrap());
    assert_eq!(*h.road("R").unwrap(), *humped);
}

//! Altitude edits. Only the decoupled height profile changes; the planar
//! shape of the edited line stays as it is.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use shared::{LaneId, LineSide, ObjectId, Point2D, RoadId};

use crate::config::EditorSettings;
use crate::derive::{rebuild_with_altitude, rederive_lanes};
use crate::store::EntityStore;
use crate::transaction::{locate_boundary, lookup_road, Edit, EditError, KeyInfo};

/// New altitude profile of a reference line. Lane lines follow at their
/// previous vertical offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRoadAltitude {
    pub road_id: RoadId,
    pub altitude_points: Vec<Point2D>,
    #[serde(default)]
    pub altitude_tangents: Option<Vec<Point2D>>,
}

impl Edit for EditRoadAltitude {
    fn label(&self) -> &'static str {
        "EditRoadAltitude"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(lookup_road(store, &self.road_id)?)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let road = old.require_road(&self.road_id)?;
        let reference = rebuild_with_altitude(
            &road.reference_line,
            &self.altitude_points,
            self.altitude_tangents.as_deref(),
        )?;
        let updated = rederive_lanes(road, reference, &settings.sampling)?;
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(Rc::new(updated))))
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

/// New altitude profile of one lane boundary. Neighbouring boundaries are not
/// recomputed; the adjacent lane sharing this boundary gets the same line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLaneLineAltitude {
    pub road_id: RoadId,
    pub lane_id: LaneId,
    pub line_side: LineSide,
    pub altitude_points: Vec<Point2D>,
    #[serde(default)]
    pub altitude_tangents: Option<Vec<Point2D>>,
}

impl Edit for EditLaneLineAltitude {
    fn label(&self) -> &'static str {
        "EditLaneLineAltitude"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(lookup_road(store, &self.road_id)?)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let road = old.require_road(&self.road_id)?;
        let (side, index) = locate_boundary(road, &self.lane_id, self.line_side)?;
        let geometry = rebuild_with_altitude(
            &road.lanes(side)[index].outer_line.geometry,
            &self.altitude_points,
            self.altitude_tangents.as_deref(),
        )?;

        let mut updated = (**road).clone();
        let lanes = updated.lanes_mut(side);
        if let Some(next) = lanes.get_mut(index + 1) {
            next.inner_line.geometry = geometry.clone();
            next.refresh_connectors();
        }
        lanes[index].outer_line.geometry = geometry;
        lanes[index].refresh_connectors();
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(Rc::new(updated))))
    }

    fn target_id(&self) -> ObjectId {
        self.lane_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EditorContext;
    use crate::fixtures;
    use crate::transaction::{AddLane, StandardTransaction, Transaction};
    use shared::LaneSide;

    fn ctx() -> EditorContext {
        let ctx = EditorContext::default();
        ctx.load_map(fixtures::map_with_roads(vec![fixtures::straight_road("R1", 100.0)]));
        ctx
    }

    fn ramp() -> Vec<Point2D> {
        vec![Point2D::new(0.0, 0.0), Point2D::new(100.0, 5.0)]
    }

    #[test]
    fn test_road_altitude_lifts_lanes() {
        let ctx = ctx();
        StandardTransaction::new(EditRoadAltitude {
            road_id: "R1".to_string(),
            altitude_points: ramp(),
            altitude_tangents: None,
        })
        .commit(&ctx)
        .unwrap();

        let road = ctx.store.borrow().road("R1").unwrap();
        let last = road.reference_line.last_serie_point().unwrap();
        assert!((last.z - 5.0).abs() < 1e-6);
        assert_eq!(road.reference_line.altitude_catmull_points, ramp());
        let outer = road.left_lanes[0].outer_line.geometry.last_serie_point().unwrap();
        assert!((outer.z - 5.0).abs() < 1e-6);
        // planar shape untouched
        assert!((last.x - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_lanes_follow_interior_altitude_points() {
        let ctx = ctx();
        StandardTransaction::new(AddLane::new("R1", LaneSide::Left, 0))
            .commit(&ctx)
            .unwrap();
        StandardTransaction::new(EditRoadAltitude {
            road_id: "R1".to_string(),
            altitude_points: vec![
                Point2D::new(0.0, 0.0),
                Point2D::new(50.0, 10.0),
                Point2D::new(100.0, 0.0),
            ],
            altitude_tangents: None,
        })
        .commit(&ctx)
        .unwrap();

        let road = ctx.store.borrow().road("R1").unwrap();
        let mid = road.reference_line.resolution() / 2;
        let reference_z = road.reference_line.serie_points[mid].z;
        assert!(reference_z > 9.0);
        for lane in road.left_lanes.iter().chain(&road.right_lanes) {
            let outer = &lane.outer_line.geometry;
            assert!(
                (outer.serie_points[mid].z - reference_z).abs() < 1e-6,
                "{} at {}",
                lane.id,
                outer.serie_points[mid].z
            );
            assert_eq!(outer.altitude_catmull_points.len(), 3);
        }
    }

    #[test]
    fn test_lane_line_altitude_touches_one_boundary() {
        let ctx = ctx();
        StandardTransaction::new(AddLane::new("R1", LaneSide::Right, 0))
            .commit(&ctx)
            .unwrap();
        let before = ctx.store.borrow().road("R1").unwrap();
        StandardTransaction::new(EditLaneLineAltitude {
            road_id: "R1".to_string(),
            lane_id: "R1_0_-1".to_string(),
            line_side: LineSide::Outer,
            altitude_points: ramp(),
            altitude_tangents: None,
        })
        .commit(&ctx)
        .unwrap();

        let road = ctx.store.borrow().road("R1").unwrap();
        let edited = &road.right_lanes[0].outer_line.geometry;
        assert!((edited.last_serie_point().unwrap().z - 5.0).abs() < 1e-6);
        assert_eq!(road.right_lanes[1].inner_line.geometry, *edited);
        assert_eq!(
            road.right_lanes[1].outer_line.geometry,
            before.right_lanes[1].outer_line.geometry
        );
        assert_eq!(road.reference_line, before.reference_line);
    }

    #[test]
    fn test_non_increasing_stations_rejected() {
        let ctx = ctx();
        let result = StandardTransaction::new(EditRoadAltitude {
            road_id: "R1".to_string(),
            altitude_points: vec![Point2D::new(0.0, 0.0), Point2D::new(0.0, 1.0)],
            altitude_tangents: None,
        })
        .commit(&ctx);
        assert!(matches!(result, Err(EditError::Geometry(_))));
    }
}

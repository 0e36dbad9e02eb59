//! Create and remove roads.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use shared::{
    ContactPoint, Lane, LaneRef, LaneSide, ObjectId, Point3D, Road, RoadCategory, RoadConnection,
    RoadEnd, RoadId, RoadRef,
};

use crate::config::EditorSettings;
use crate::derive::{initial_road, road_end_frame};
use crate::geometry::planar_distance;
use crate::store::EntityStore;
use crate::transaction::{
    lookup_junction, lookup_road, new_object_id, Edit, EditError, KeyInfo,
};

// ============================================================================
// CreateRoad
// ============================================================================

/// New straight or spline road with one lane on each side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRoad {
    #[serde(default = "new_object_id")]
    pub road_id: RoadId,
    pub category: RoadCategory,
    pub catmull_points: Vec<Point3D>,
    #[serde(default)]
    pub catmull_tangents: Option<Vec<Point3D>>,
}

impl CreateRoad {
    pub fn spline(road_id: impl Into<RoadId>, catmull_points: Vec<Point3D>) -> Self {
        Self {
            road_id: road_id.into(),
            category: RoadCategory::Spline,
            catmull_points,
            catmull_tangents: None,
        }
    }

    pub fn straight(road_id: impl Into<RoadId>, start: Point3D, end: Point3D) -> Self {
        Self {
            road_id: road_id.into(),
            category: RoadCategory::Straight,
            catmull_points: vec![start, end],
            catmull_tangents: None,
        }
    }
}

impl Edit for CreateRoad {
    fn label(&self) -> &'static str {
        "CreateRoad"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        if store.road(&self.road_id).is_some() {
            return Err(EditError::RoadExists(self.road_id.clone()));
        }
        Ok(KeyInfo::new().with_road(self.road_id.clone(), None))
    }

    fn generate_new_key_info(
        &self,
        _old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        match self.category {
            RoadCategory::Straight if self.catmull_points.len() != 2 => {
                return Err(EditError::InvalidInput(format!(
                    "a straight road takes 2 control points, got {}",
                    self.catmull_points.len()
                )));
            }
            RoadCategory::Connector => {
                return Err(EditError::InvalidInput(
                    "connector roads are created from two road ends".to_string(),
                ));
            }
            _ => {}
        }
        let road = initial_road(
            &self.road_id,
            self.category,
            &self.catmull_points,
            self.catmull_tangents.as_deref(),
            settings,
        )?;
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(Rc::new(road))))
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

// ============================================================================
// CreateConnectionRoad
// ============================================================================

/// Connector road bridging two road ends.
///
/// The reference line leaves `from` along its outward direction and enters `to`
/// against `to`'s outward direction. Both connected roads get an adjacency entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateConnectionRoad {
    #[serde(default = "new_object_id")]
    pub road_id: RoadId,
    pub from: RoadEnd,
    pub to: RoadEnd,
    #[serde(default)]
    pub junction_id: Option<String>,
}

fn lane_ref(road: &Road, lane: &Lane) -> LaneRef {
    LaneRef {
        lane_id: lane.id.clone(),
        road_id: road.id.clone(),
        road_category: road.category,
    }
}

/// Side of the connector a road's lanes continue into. Leaving a road at its
/// start, or entering one at its end, runs against its reference direction.
fn connector_side(side: LaneSide, reversed: bool) -> LaneSide {
    if reversed {
        side.opposite()
    } else {
        side
    }
}

/// Link every lane of `road` at `contact` to the connector lane with the same
/// index on the matching side.
fn link_end_lanes(road: &mut Road, contact: ContactPoint, reversed: bool, connector: &Road) {
    for side in LaneSide::all() {
        let others = connector.lanes(connector_side(*side, reversed));
        for (lane, other) in road.lanes_mut(*side).iter_mut().zip(others) {
            let link = lane_ref(connector, other);
            let list = match contact {
                ContactPoint::End => &mut lane.successors,
                ContactPoint::Start => &mut lane.predecessors,
            };
            if !list.contains(&link) {
                list.push(link);
            }
        }
    }
}

fn adjacency(road: &mut Road, contact: ContactPoint, link: RoadRef) {
    let list = match contact {
        ContactPoint::End => &mut road.successors,
        ContactPoint::Start => &mut road.predecessors,
    };
    if !list.iter().any(|r| r.road_id == link.road_id) {
        list.push(link);
    }
}

impl Edit for CreateConnectionRoad {
    fn label(&self) -> &'static str {
        "CreateConnectionRoad"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        if store.road(&self.road_id).is_some() {
            return Err(EditError::RoadExists(self.road_id.clone()));
        }
        let mut info = KeyInfo::new()
            .with_road(self.road_id.clone(), None)
            .with_road(self.from.road_id.clone(), Some(lookup_road(store, &self.from.road_id)?))
            .with_road(self.to.road_id.clone(), Some(lookup_road(store, &self.to.road_id)?));
        if let Some(jid) = &self.junction_id {
            info = info.with_junction(jid.clone(), Some(lookup_junction(store, jid)?));
        }
        Ok(info)
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let from_road = old.require_road(&self.from.road_id)?;
        let to_road = old.require_road(&self.to.road_id)?;
        let start = road_end_frame(from_road, self.from.contact)?;
        let end = road_end_frame(to_road, self.to.contact)?;

        let chord = planar_distance(start.position, end.position);
        let tangents = [
            Point3D::planar(start.outward.x * chord, start.outward.y * chord),
            Point3D::planar(-end.outward.x * chord, -end.outward.y * chord),
        ];
        let mut road = initial_road(
            &self.road_id,
            RoadCategory::Connector,
            &[start.position, end.position],
            Some(&tangents),
            settings,
        )?;
        road.connection = Some(RoadConnection {
            from: self.from.clone(),
            to: self.to.clone(),
            junction_id: self.junction_id.clone(),
        });
        road.predecessors.push(RoadRef {
            road_id: from_road.id.clone(),
            road_category: from_road.category,
            contact: self.from.contact,
        });
        road.successors.push(RoadRef {
            road_id: to_road.id.clone(),
            road_category: to_road.category,
            contact: self.to.contact,
        });
        let from_reversed = self.from.contact == ContactPoint::Start;
        let to_reversed = self.to.contact == ContactPoint::End;
        for side in LaneSide::all() {
            let from_lanes = from_road.lanes(connector_side(*side, from_reversed));
            let to_lanes = to_road.lanes(connector_side(*side, to_reversed));
            for (k, lane) in road.lanes_mut(*side).iter_mut().enumerate() {
                if let Some(prev) = from_lanes.get(k) {
                    lane.predecessors.push(lane_ref(from_road, prev));
                }
                if let Some(next) = to_lanes.get(k) {
                    lane.successors.push(lane_ref(to_road, next));
                }
            }
        }

        let road = Rc::new(road);
        let mut new = KeyInfo::new().with_road(self.road_id.clone(), Some(road.clone()));

        // linking a road end to itself touches the same record twice
        let mut from_updated = (**from_road).clone();
        link_end_lanes(&mut from_updated, self.from.contact, from_reversed, &road);
        adjacency(
            &mut from_updated,
            self.from.contact,
            RoadRef {
                road_id: self.road_id.clone(),
                road_category: RoadCategory::Connector,
                contact: ContactPoint::Start,
            },
        );
        let mut to_updated = if self.to.road_id == self.from.road_id {
            from_updated
        } else {
            new = new.with_road(from_road.id.clone(), Some(Rc::new(from_updated)));
            (**to_road).clone()
        };
        link_end_lanes(&mut to_updated, self.to.contact, to_reversed, &road);
        adjacency(
            &mut to_updated,
            self.to.contact,
            RoadRef {
                road_id: self.road_id.clone(),
                road_category: RoadCategory::Connector,
                contact: ContactPoint::End,
            },
        );
        new = new.with_road(to_road.id.clone(), Some(Rc::new(to_updated)));

        if let Some(jid) = &self.junction_id {
            let mut junction = (**old.require_junction(jid)?).clone();
            let connection = junction
                .connection_mut(&self.from, &self.to)
                .ok_or_else(|| {
                    EditError::InvalidInput(format!(
                        "junction {} has no candidate connection {}:{:?} -> {}:{:?}",
                        jid, self.from.road_id, self.from.contact, self.to.road_id, self.to.contact
                    ))
                })?;
            connection.connector_road_id = Some(self.road_id.clone());
            new = new.with_junction(jid.clone(), Some(Rc::new(junction)));
        }
        Ok(new)
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

// ============================================================================
// RemoveRoad
// ============================================================================

/// Remove a road, dropping adjacency entries that point at it and clearing
/// junction connections it served as connector for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveRoad {
    pub road_id: RoadId,
}

impl RemoveRoad {
    pub fn new(road_id: impl Into<RoadId>) -> Self {
        Self {
            road_id: road_id.into(),
        }
    }
}

impl Edit for RemoveRoad {
    fn label(&self) -> &'static str {
        "RemoveRoad"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let mut info = KeyInfo::new().with_road(self.road_id.clone(), Some(lookup_road(store, &self.road_id)?));
        for road in store.roads() {
            let linked = road
                .predecessors
                .iter()
                .chain(&road.successors)
                .any(|r| r.road_id == self.road_id);
            if linked && road.id != self.road_id {
                info = info.with_road(road.id.clone(), Some(road.clone()));
            }
        }
        for junction in store.junctions() {
            if junction.references_road(&self.road_id) {
                info = info.with_junction(junction.id.clone(), Some(junction.clone()));
            }
        }
        Ok(info)
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let mut new = KeyInfo::new();
        for (id, road) in &old.roads {
            if *id == self.road_id {
                new = new.with_road(id.clone(), None);
                continue;
            }
            let Some(road) = road else { continue };
            let mut road = (**road).clone();
            road.predecessors.retain(|r| r.road_id != self.road_id);
            road.successors.retain(|r| r.road_id != self.road_id);
            for side in LaneSide::all() {
                for lane in road.lanes_mut(*side) {
                    lane.predecessors.retain(|r| r.road_id != self.road_id);
                    lane.successors.retain(|r| r.road_id != self.road_id);
                }
            }
            new = new.with_road(id.clone(), Some(Rc::new(road)));
        }
        for (id, junction) in &old.junctions {
            let Some(junction) = junction else { continue };
            let mut junction = (**junction).clone();
            junction.detach_road(&self.road_id);
            new = new.with_junction(id.clone(), Some(Rc::new(junction)));
        }
        Ok(new)
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EditorContext;
    use crate::fixtures;
    use crate::transaction::{StandardTransaction, Transaction};

    #[test]
    fn test_create_spline_road() {
        let ctx = EditorContext::default();
        let mut tx = StandardTransaction::new(CreateRoad::spline("R1", fixtures::s_curve_points()));
        let receipt = tx.commit(&ctx).unwrap();
        assert_eq!(receipt.entity_id, "R1");
        let road = ctx.store.borrow().road("R1").unwrap();
        assert_eq!(road.left_lanes.len(), 1);
        assert_eq!(road.right_lanes.len(), 1);
        assert_eq!(road.reference_line.serie_points.len(), 120);
        assert!(ctx.store.borrow().dirty_roads().contains_key("R1"));
    }

    #[test]
    fn test_create_road_with_close_control_points() {
        let ctx = EditorContext::default();
        StandardTransaction::new(CreateRoad::spline(
            "R2",
            vec![
                Point3D::planar(0.0, 0.0),
                Point3D::planar(2.0, 0.0),
                Point3D::planar(1000.0, 0.0),
            ],
        ))
        .commit(&ctx)
        .unwrap();
        let road = ctx.store.borrow().road("R2").unwrap();
        let stations = &road.reference_line.altitude_catmull_points;
        assert_eq!(stations.len(), 3);
        assert!(stations.windows(2).all(|w| w[0].x < w[1].x));
    }

    #[test]
    fn test_create_existing_road_fails() {
        let ctx = EditorContext::default();
        ctx.load_map(fixtures::map_with_roads(vec![fixtures::straight_road("R1", 10.0)]));
        let mut tx = StandardTransaction::new(CreateRoad::straight(
            "R1",
            Point3D::planar(0.0, 0.0),
            Point3D::planar(5.0, 0.0),
        ));
        assert_eq!(tx.commit(&ctx), Err(EditError::RoadExists("R1".to_string())));
    }

    #[test]
    fn test_straight_road_needs_two_points() {
        let ctx = EditorContext::default();
        let mut edit = CreateRoad::spline("R1", fixtures::s_curve_points());
        edit.category = RoadCategory::Straight;
        assert!(matches!(
            StandardTransaction::new(edit).commit(&ctx),
            Err(EditError::InvalidInput(_))
        ));
        assert_eq!(ctx.store.borrow().road_count(), 0);
    }

    #[test]
    fn test_connection_road_links_both_ends() {
        let ctx = EditorContext::default();
        ctx.load_map(fixtures::crossing_map());
        let from = RoadEnd::new("A", ContactPoint::End);
        let to = RoadEnd::new("B", ContactPoint::Start);
        let mut tx = StandardTransaction::new(CreateConnectionRoad {
            road_id: "C1".to_string(),
            from: from.clone(),
            to: to.clone(),
            junction_id: None,
        });
        tx.commit(&ctx).unwrap();

        let store = ctx.store.borrow();
        let connector = store.road("C1").unwrap();
        let a = store.road("A").unwrap();
        let b = store.road("B").unwrap();
        assert_eq!(connector.category, RoadCategory::Connector);
        assert_eq!(connector.reference_line.resolution(), 60);
        assert_eq!(
            connector.reference_line.first_serie_point(),
            a.reference_line.last_serie_point()
        );
        assert_eq!(
            connector.reference_line.last_serie_point(),
            b.reference_line.first_serie_point()
        );
        assert_eq!(connector.connection.as_ref().unwrap().from, from);
        assert_eq!(a.successors[0].road_id, "C1");
        assert_eq!(b.predecessors[0].road_id, "C1");
    }

    #[test]
    fn test_remove_road_unlinks_neighbours() {
        let ctx = EditorContext::default();
        ctx.load_map(fixtures::crossing_map());
        StandardTransaction::new(CreateConnectionRoad {
            road_id: "C1".to_string(),
            from: RoadEnd::new("A", ContactPoint::End),
            to: RoadEnd::new("B", ContactPoint::Start),
            junction_id: None,
        })
        .commit(&ctx)
        .unwrap();

        let mut remove = StandardTransaction::new(RemoveRoad::new("C1"));
        remove.commit(&ctx).unwrap();
        assert!(ctx.store.borrow().road("C1").is_none());
        assert!(ctx.store.borrow().road("A").unwrap().successors.is_empty());

        remove.on_undo(&ctx).unwrap();
        let store = ctx.store.borrow();
        assert!(store.road("C1").is_some());
        assert_eq!(store.road("A").unwrap().successors.len(), 1);
    }

    #[test]
    fn test_remove_arm_road_detaches_it_from_junction() {
        let ctx = EditorContext::default();
        ctx.load_map(fixtures::crossing_map());
        StandardTransaction::new(crate::transaction::CreateJunction {
            junction_id: "J1".to_string(),
            ends: fixtures::crossing_ends(),
        })
        .commit(&ctx)
        .unwrap();

        let mut remove = StandardTransaction::new(RemoveRoad::new("A"));
        remove.commit(&ctx).unwrap();
        let junction = ctx.store.borrow().junction("J1").unwrap();
        assert_eq!(junction.ends.len(), 3);
        assert!(!junction.references_road("A"));
        assert_eq!(junction.edges.len(), 2);
        assert_eq!(junction.connections.len(), 6);

        // the remaining edges still resolve their anchor roads
        let edge_id = junction.edges[0].id.clone();
        let points = vec![
            junction.edges[0].geometry.catmull_points[0],
            *junction.edges[0].geometry.catmull_points.last().unwrap(),
        ];
        StandardTransaction::new(crate::transaction::EditJunctionEdge {
            junction_id: "J1".to_string(),
            edge_id,
            catmull_points: points,
            catmull_tangents: None,
            clamp_altitude: true,
        })
        .commit(&ctx)
        .unwrap();

        remove.on_undo(&ctx).unwrap();
        let junction = ctx.store.borrow().junction("J1").unwrap();
        assert!(junction.involves_road("A"));
        assert_eq!(junction.ends.len(), 4);
        assert_eq!(junction.connections.len(), 12);
    }

    #[test]
    fn test_connection_road_links_lanes() {
        let ctx = EditorContext::default();
        ctx.load_map(fixtures::crossing_map());
        StandardTransaction::new(CreateConnectionRoad {
            road_id: "C1".to_string(),
            from: RoadEnd::new("A", ContactPoint::End),
            to: RoadEnd::new("D", ContactPoint::End),
            junction_id: None,
        })
        .commit(&ctx)
        .unwrap();

        {
            let store = ctx.store.borrow();
            let connector = store.road("C1").unwrap();
            let a = store.road("A").unwrap();
            let d = store.road("D").unwrap();
            let left = &connector.left_lanes[0];
            assert_eq!(left.predecessors.len(), 1);
            assert_eq!(left.predecessors[0].lane_id, a.left_lanes[0].id);
            // arriving at D's end runs against D, so left meets right
            assert_eq!(left.successors[0].lane_id, d.right_lanes[0].id);
            assert_eq!(left.successors[0].road_category, RoadCategory::Straight);

            assert_eq!(a.left_lanes[0].successors[0].lane_id, left.id);
            assert_eq!(a.right_lanes[0].successors[0].lane_id, connector.right_lanes[0].id);
            assert_eq!(d.right_lanes[0].successors[0].lane_id, left.id);
            assert!(d.left_lanes[0].predecessors.is_empty());
        }

        StandardTransaction::new(RemoveRoad::new("C1")).commit(&ctx).unwrap();
        let store = ctx.store.borrow();
        for road in [store.road("A").unwrap(), store.road("D").unwrap()] {
            for lane in road.left_lanes.iter().chain(&road.right_lanes) {
                assert!(lane.successors.is_empty() && lane.predecessors.is_empty());
            }
        }
    }
}

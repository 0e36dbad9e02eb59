//! Control-point edits: reference line (move, extend, reformat) and lane lines.

use std::rc::Rc;

use glam::DVec2;
use serde::{Deserialize, Serialize};
use shared::{LaneId, LineSide, ObjectId, Point3D, Road, RoadCategory, RoadId};

use crate::config::EditorSettings;
use crate::derive::{
    derive_line, extend_curve, lane_policy, reattach_inner_lines, rederive_lanes, replan_curve,
};
use crate::geometry::{fit_tangents, GeometryError};
use crate::store::EntityStore;
use crate::transaction::{locate_boundary, lookup_road, Edit, EditError, KeyInfo};

/// Rebuild the reference line from new control points at the road's
/// resolution and carry every lane line along. The altitude profile is kept.
fn with_reference(
    road: &Road,
    catmull: &[Point3D],
    tangents: Option<&[Point3D]>,
    settings: &EditorSettings,
) -> Result<Road, EditError> {
    let policy = lane_policy(road, &settings.sampling);
    let reference = replan_curve(&road.reference_line, catmull, tangents, policy)?;
    Ok(rederive_lanes(road, reference, &settings.sampling)?)
}

fn single_road(road: Road) -> KeyInfo {
    KeyInfo::new().with_road(road.id.clone(), Some(Rc::new(road)))
}

// ============================================================================
// EditRoadCatmull
// ============================================================================

/// Move one control point of a reference line.
///
/// Tangents are refitted unless one is given. Connector roads keep their
/// stored tangents so the bridge stays aligned with the roads it joins.
/// Heights of the new point come from the road's altitude curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRoadCatmull {
    pub road_id: RoadId,
    pub index: usize,
    pub point: Point3D,
    #[serde(default)]
    pub tangent: Option<Point3D>,
}

impl Edit for EditRoadCatmull {
    fn label(&self) -> &'static str {
        "EditRoadCatmull"
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
        let reference = &road.reference_line;
        let len = reference.catmull_points.len();
        if self.index >= len {
            return Err(EditError::InvalidInput(format!(
                "control point {} out of range for {} points",
                self.index, len
            )));
        }

        let mut catmull = reference.catmull_points.clone();
        catmull[self.index] = self.point;
        let mut tangents = match (road.category, self.tangent) {
            (RoadCategory::Connector, _) | (_, Some(_)) => reference.catmull_tangents.clone(),
            _ => fit_tangents(&catmull)?,
        };
        if let Some(t) = self.tangent {
            tangents[self.index] = t;
        }

        let updated = with_reference(road, &catmull, Some(&tangents), settings)?;
        Ok(single_road(updated))
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

// ============================================================================
// ExtendRoad
// ============================================================================

/// Append one control point at the end of a reference line.
///
/// Without an explicit point, the new one continues the last chord by the
/// configured extend length at the last height. Lane lines keep their last offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendRoad {
    pub road_id: RoadId,
    #[serde(default)]
    pub point: Option<Point3D>,
}

impl ExtendRoad {
    pub fn new(road_id: impl Into<RoadId>) -> Self {
        Self {
            road_id: road_id.into(),
            point: None,
        }
    }
}

impl Edit for ExtendRoad {
    fn label(&self) -> &'static str {
        "ExtendRoad"
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
        if road.category == RoadCategory::Connector {
            return Err(EditError::InvalidInput(format!(
                "connector road {} cannot be extended",
                road.id
            )));
        }
        let mut catmull = road.reference_line.catmull_points.clone();
        let next = match self.point {
            Some(p) => p,
            None => {
                let [.., prev, last] = catmull.as_slice() else {
                    return Err(GeometryError::TooFewPoints {
                        needed: 2,
                        got: catmull.len(),
                    }
                    .into());
                };
                let dir = DVec2::new(last.x - prev.x, last.y - prev.y)
                    .try_normalize()
                    .ok_or(GeometryError::DegenerateSegment {
                        index: catmull.len() - 2,
                    })?;
                let step = dir * settings.lanes.extend_length;
                Point3D::new(last.x + step.x, last.y + step.y, last.z)
            }
        };
        catmull.push(next);

        let reference = extend_curve(
            &road.reference_line,
            &catmull,
            lane_policy(road, &settings.sampling),
        )?;
        let updated = rederive_lanes(road, reference, &settings.sampling)?;
        Ok(single_road(updated))
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

// ============================================================================
// ReformatRoad
// ============================================================================

/// Replace the whole reference line shape, keeping lane offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReformatRoad {
    pub road_id: RoadId,
    pub catmull_points: Vec<Point3D>,
    #[serde(default)]
    pub catmull_tangents: Option<Vec<Point3D>>,
}

impl Edit for ReformatRoad {
    fn label(&self) -> &'static str {
        "ReformatRoad"
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
        let updated = with_reference(
            road,
            &self.catmull_points,
            self.catmull_tangents.as_deref(),
            settings,
        )?;
        Ok(single_road(updated))
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

// ============================================================================
// EditLaneLineCatmull
// ============================================================================

/// Replace the control points of one lane boundary.
///
/// The boundary shared by two adjacent lanes is updated in both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLaneLineCatmull {
    pub road_id: RoadId,
    pub lane_id: LaneId,
    pub line_side: LineSide,
    pub catmull_points: Vec<Point3D>,
    #[serde(default)]
    pub catmull_tangents: Option<Vec<Point3D>>,
}

impl Edit for EditLaneLineCatmull {
    fn label(&self) -> &'static str {
        "EditLaneLineCatmull"
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
        let (side, index) = locate_boundary(road, &self.lane_id, self.line_side)?;
        let geometry = derive_line(
            &road.reference_line,
            &self.catmull_points,
            self.catmull_tangents.as_deref(),
            lane_policy(road, &settings.sampling),
        )?;

        let mut updated = (**road).clone();
        let lanes = updated.lanes_mut(side);
        lanes[index].outer_line.geometry = geometry;
        lanes[index].refresh_connectors();
        reattach_inner_lines(&road.reference_line, lanes);
        Ok(single_road(updated))
    }

    fn target_id(&self) -> ObjectId {
        self.lane_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

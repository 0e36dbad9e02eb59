//! Add and remove lanes.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use shared::{LaneId, LaneSide, ObjectId, RoadId};

use crate::config::EditorSettings;
use crate::derive::{build_lane, lane_policy, lane_width, reattach_inner_lines, shift_lane, shift_line};
use crate::store::EntityStore;
use crate::transaction::{locate_lane, lookup_road, Edit, EditError, KeyInfo};

/// Insert a lane on one side of a road.
///
/// The new lane goes right after the lane at `lane_index`; `-1` makes it the
/// innermost lane. Lanes further out keep their ids and move outward by the
/// new lane's width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddLane {
    pub road_id: RoadId,
    pub side: LaneSide,
    pub lane_index: i32,
    /// Defaults to the configured lane width
    #[serde(default)]
    pub width: Option<f64>,
}

impl AddLane {
    pub fn new(road_id: impl Into<RoadId>, side: LaneSide, lane_index: i32) -> Self {
        Self {
            road_id: road_id.into(),
            side,
            lane_index,
            width: None,
        }
    }
}

impl Edit for AddLane {
    fn label(&self) -> &'static str {
        "AddLane"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let road = lookup_road(store, &self.road_id)?;
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(road)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let road = old.require_road(&self.road_id)?;
        let lanes = road.lanes(self.side);
        if self.lane_index < -1 || self.lane_index >= lanes.len() as i32 {
            return Err(EditError::LaneIndexOutOfRange {
                index: self.lane_index,
                len: lanes.len(),
            });
        }
        let width = self.width.unwrap_or(settings.lanes.default_width);
        if !width.is_finite() || width < settings.lanes.min_width {
            return Err(EditError::InvalidWidth(width));
        }

        let position = (self.lane_index + 1) as usize;
        let reference = &road.reference_line;
        let policy = lane_policy(road, &settings.sampling);
        let offset = width * self.side.sign();

        let inner = if position == 0 {
            reference.clone()
        } else {
            lanes[position - 1].outer_line.geometry.clone()
        };
        let outer = shift_line(reference, &inner, offset, policy)?;

        let mut updated = (**road).clone();
        let index = updated.bump_general_lane_index(self.side);
        let lane = build_lane(&road.id, self.side, index, inner, outer);
        tracing::debug!("AddLane {} at {:?}[{}]", lane.id, self.side, position);

        let mut new_lanes = Vec::with_capacity(lanes.len() + 1);
        new_lanes.extend_from_slice(&lanes[..position]);
        new_lanes.push(lane);
        for outward in &lanes[position..] {
            new_lanes.push(shift_lane(reference, outward, offset, policy)?);
        }
        reattach_inner_lines(reference, &mut new_lanes);
        updated.set_lanes(self.side, new_lanes);

        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(Rc::new(updated))))
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

/// Delete a lane. Lanes further out move inward by its width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveLane {
    pub road_id: RoadId,
    pub lane_id: LaneId,
}

impl RemoveLane {
    pub fn new(road_id: impl Into<RoadId>, lane_id: impl Into<LaneId>) -> Self {
        Self {
            road_id: road_id.into(),
            lane_id: lane_id.into(),
        }
    }
}

impl Edit for RemoveLane {
    fn label(&self) -> &'static str {
        "RemoveLane"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let road = lookup_road(store, &self.road_id)?;
        locate_lane(&road, &self.lane_id)?;
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(road)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let road = old.require_road(&self.road_id)?;
        let (side, position) = locate_lane(road, &self.lane_id)?;
        let lanes = road.lanes(side);
        let reference = &road.reference_line;
        let policy = lane_policy(road, &settings.sampling);
        let offset = -lane_width(&lanes[position]) * side.sign();

        let mut new_lanes = Vec::with_capacity(lanes.len() - 1);
        new_lanes.extend_from_slice(&lanes[..position]);
        for outward in &lanes[position + 1..] {
            new_lanes.push(shift_lane(reference, outward, offset, policy)?);
        }
        reattach_inner_lines(reference, &mut new_lanes);

        let mut updated = (**road).clone();
        updated.set_lanes(side, new_lanes);
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(Rc::new(updated))))
    }

    fn target_id(&self) -> ObjectId {
        self.lane_id.clone()
    }

    fn validated_road(&self) -> Option<RoadId> {
        Some(self.road_id.clone())
    }
}

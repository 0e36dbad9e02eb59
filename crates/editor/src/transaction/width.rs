//! Lane width edits.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use shared::{LaneId, ObjectId, RoadId};

use crate::config::EditorSettings;
use crate::derive::{lane_policy, lane_width, reattach_inner_lines, shift_lane, shift_line};
use crate::store::EntityStore;
use crate::transaction::{locate_lane, lookup_road, Edit, EditError, KeyInfo};

/// Set a lane's width by moving its outer boundary along the reference
/// normals. Every lane further out on that side moves by the same delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLaneWidth {
    pub road_id: RoadId,
    pub lane_id: LaneId,
    pub width: f64,
}

impl Edit for EditLaneWidth {
    fn label(&self) -> &'static str {
        "EditLaneWidth"
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
        let (side, index) = locate_lane(road, &self.lane_id)?;
        let lanes = road.lanes(side);
        let lane = &lanes[index];
        if !lane.width_editable {
            return Err(EditError::LaneNotWidthEditable(self.lane_id.clone()));
        }
        if !self.width.is_finite() || self.width < settings.lanes.min_width {
            return Err(EditError::InvalidWidth(self.width));
        }

        let delta = (self.width - lane_width(lane)) * side.sign();
        let reference = &road.reference_line;
        let policy = lane_policy(road, &settings.sampling);

        let mut new_lanes = lanes.to_vec();
        new_lanes[index].outer_line.geometry =
            shift_line(reference, &lane.outer_line.geometry, delta, policy)?;
        for k in index + 1..new_lanes.len() {
            new_lanes[k] = shift_lane(reference, &lanes[k], delta, policy)?;
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

//! Attribute edits that leave geometry alone.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use shared::{LaneId, LaneSide, LineBoundary, LineOptions, LineSide, ObjectId, RoadId};

use crate::config::EditorSettings;
use crate::store::EntityStore;
use crate::transaction::{locate_lane, lookup_road, Edit, EditError, KeyInfo};

/// Road display transparency in `0..=1`. Both lane lists are re-emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRoadTransparency {
    pub road_id: RoadId,
    pub transparency: f64,
}

impl Edit for EditRoadTransparency {
    fn label(&self) -> &'static str {
        "EditRoadTransparency"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(lookup_road(store, &self.road_id)?)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        if !self.transparency.is_finite() {
            return Err(EditError::InvalidInput(format!(
                "transparency must be finite, got {}",
                self.transparency
            )));
        }
        let mut road = (**old.require_road(&self.road_id)?).clone();
        road.transparency = self.transparency.clamp(0.0, 1.0);
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(Rc::new(road))))
    }

    fn target_id(&self) -> ObjectId {
        self.road_id.clone()
    }

    fn refreshed_sides(&self) -> Vec<LaneSide> {
        LaneSide::all().to_vec()
    }
}

/// Boundary type and line options of one lane line.
///
/// A boundary shared by two lanes carries the same attributes on both copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditLaneLineBoundary {
    pub road_id: RoadId,
    pub lane_id: LaneId,
    pub line_side: LineSide,
    pub boundary: LineBoundary,
    #[serde(default)]
    pub options: Option<LineOptions>,
}

impl EditLaneLineBoundary {
    pub fn new(
        road_id: impl Into<RoadId>,
        lane_id: impl Into<LaneId>,
        line_side: LineSide,
        boundary: LineBoundary,
    ) -> Self {
        Self {
            road_id: road_id.into(),
            lane_id: lane_id.into(),
            line_side,
            boundary,
            options: None,
        }
    }
}

impl Edit for EditLaneLineBoundary {
    fn label(&self) -> &'static str {
        "EditLaneLineBoundary"
    }

    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError> {
        let road = lookup_road(store, &self.road_id)?;
        locate_lane(&road, &self.lane_id)?;
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(road)))
    }

    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        _settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError> {
        let road = old.require_road(&self.road_id)?;
        let (side, index) = locate_lane(road, &self.lane_id)?;

        let mut updated = (**road).clone();
        let lanes = updated.lanes_mut(side);
        let mut targets = vec![(index, self.line_side)];
        match self.line_side {
            LineSide::Outer if index + 1 < lanes.len() => targets.push((index + 1, LineSide::Inner)),
            LineSide::Inner if index > 0 => targets.push((index - 1, LineSide::Outer)),
            _ => {}
        }
        for (k, line_side) in targets {
            let line = lanes[k].line_mut(line_side);
            line.boundary = self.boundary;
            if let Some(options) = self.options {
                line.options = options;
            }
        }
        Ok(KeyInfo::new().with_road(self.road_id.clone(), Some(Rc::new(updated))))
    }

    fn target_id(&self) -> ObjectId {
        self.lane_id.clone()
    }
}

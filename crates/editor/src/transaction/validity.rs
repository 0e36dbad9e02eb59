//! Advisory road-validity gate.
//!
//! Never blocks a commit. It only tells listeners whether an edit broke a
//! road or was applied on top of a road that was already broken.

use crate::config::EditorSettings;
use crate::events::{self, EventBus};
use crate::transaction::KeyInfo;
use crate::validation::RoadValidator;

fn validate(info: &KeyInfo, road_id: &str, settings: &EditorSettings) -> bool {
    match info.road(road_id) {
        Some(road) => {
            let validator = RoadValidator::new(road, settings.validity.epsilon);
            let errors = validator.validate_all();
            for e in &errors {
                tracing::debug!("{}", e);
            }
            errors.is_empty()
        }
        // nothing to break
        None => true,
    }
}

/// Validity of the road as it was before the edit.
pub fn pre_validate_road(old: &KeyInfo, road_id: &str, settings: &EditorSettings) -> bool {
    validate(old, road_id, settings)
}

/// Validity of the road as the edit leaves it.
pub fn post_validate_road(new: &KeyInfo, road_id: &str, settings: &EditorSettings) -> bool {
    validate(new, road_id, settings)
}

/// Emit the matching warning, if any. Returns the channel used.
pub fn dispatch_invalid_road_event(
    bus: &EventBus,
    road_id: &str,
    pre_valid: bool,
    post_valid: bool,
) -> Option<&'static str> {
    if post_valid {
        return None;
    }
    let channel = if pre_valid {
        events::ROAD_LANE_ONLY_POST_INVALID
    } else {
        events::ROAD_LANE_PRE_AND_POST_INVALID
    };
    tracing::warn!("Road {} lane geometry is invalid ({})", road_id, channel);
    bus.emit_event(channel, Some(road_id.to_string()));
    Some(channel)
}

//! Editor plugins composed from small capabilities.
//!
//! A plugin implements only the traits it needs: [`EventAware`] to listen on
//! the bus, [`Activatable`] to be switched on and off, [`UiHosting`] to show
//! a panel.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use shared::RoadId;

use crate::events::{self, render_channels, EventBus};

pub trait Activatable {
    fn activate(&self);
    fn deactivate(&self);
    fn is_active(&self) -> bool;
}

pub trait EventAware {
    /// Subscribe to the channels this plugin cares about.
    fn attach(&self, bus: &EventBus);
}

pub trait UiHosting {
    fn panel_title(&self) -> &str;
    /// Panel contents, one line per row
    fn panel_lines(&self) -> Vec<String>;
}

// ============================================================================
// RenderRecorder
// ============================================================================

/// One rendering invocation: channel name and entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    pub channel: String,
    pub entity_id: String,
}

/// Stand-in for the scene layer: records every `Invoke*` event while active.
#[derive(Debug, Default, Clone)]
pub struct RenderRecorder {
    active: Rc<Cell<bool>>,
    calls: Rc<RefCell<Vec<RenderCall>>>,
}

impl RenderRecorder {
    pub fn new() -> Self {
        let recorder = Self::default();
        recorder.activate();
        recorder
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.borrow().clone()
    }

    /// Calls on one channel, in order
    pub fn calls_on(&self, channel: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.channel == channel)
            .map(|c| c.entity_id.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl Activatable for RenderRecorder {
    fn activate(&self) {
        self.active.set(true);
    }

    fn deactivate(&self) {
        self.active.set(false);
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }
}

impl EventAware for RenderRecorder {
    fn attach(&self, bus: &EventBus) {
        for channel in render_channels() {
            let active = self.active.clone();
            let calls = self.calls.clone();
            let name = channel.clone();
            bus.on_event::<String>(&channel, move |env| {
                if !active.get() {
                    return;
                }
                calls.borrow_mut().push(RenderCall {
                    channel: name.clone(),
                    entity_id: env.payload.clone().unwrap_or_default(),
                });
            });
        }
    }
}

// ============================================================================
// ValidityPanel
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// The edit broke a road that was fine before
    OnlyPostInvalid,
    /// The road was already broken and still is
    PreAndPostInvalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityWarning {
    pub road_id: RoadId,
    pub kind: WarningKind,
}

/// Collects road validity warnings for display.
#[derive(Debug, Default, Clone)]
pub struct ValidityPanel {
    warnings: Rc<RefCell<Vec<ValidityWarning>>>,
}

impl ValidityPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<ValidityWarning> {
        self.warnings.borrow().clone()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.borrow().iter().filter(|w| w.kind == kind).count()
    }

    pub fn clear(&self) {
        self.warnings.borrow_mut().clear();
    }
}

impl EventAware for ValidityPanel {
    fn attach(&self, bus: &EventBus) {
        for (channel, kind) in [
            (events::ROAD_LANE_ONLY_POST_INVALID, WarningKind::OnlyPostInvalid),
            (events::ROAD_LANE_PRE_AND_POST_INVALID, WarningKind::PreAndPostInvalid),
        ] {
            let warnings = self.warnings.clone();
            bus.on_event::<RoadId>(channel, move |env| {
                if let Some(road_id) = env.payload.clone() {
                    warnings.borrow_mut().push(ValidityWarning { road_id, kind });
                }
            });
        }
    }
}

impl UiHosting for ValidityPanel {
    fn panel_title(&self) -> &str {
        "Road validity"
    }

    fn panel_lines(&self) -> Vec<String> {
        self.warnings
            .borrow()
            .iter()
            .map(|w| match w.kind {
                WarningKind::OnlyPostInvalid => format!("{}: broken by last edit", w.road_id),
                WarningKind::PreAndPostInvalid => format!("{}: still broken", w.road_id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::register_core_channels;

    #[test]
    fn test_recorder_respects_activation() {
        let bus = EventBus::new();
        register_core_channels(&bus);
        let recorder = RenderRecorder::new();
        recorder.attach(&bus);

        bus.emit_event("InvokeCreateSplineRoadEvent", Some("R1".to_string()));
        recorder.deactivate();
        bus.emit_event("InvokeRemoveSplineRoadEvent", Some("R1".to_string()));
        recorder.activate();
        bus.emit_event("InvokeCreateSignalEvent", Some("S1".to_string()));

        assert_eq!(
            recorder.calls(),
            vec![
                RenderCall {
                    channel: "InvokeCreateSplineRoadEvent".to_string(),
                    entity_id: "R1".to_string()
                },
                RenderCall {
                    channel: "InvokeCreateSignalEvent".to_string(),
                    entity_id: "S1".to_string()
                },
            ]
        );
        assert_eq!(recorder.calls_on("InvokeCreateSignalEvent"), vec!["S1".to_string()]);
    }

    #[test]
    fn test_validity_panel_lines() {
        let bus = EventBus::new();
        register_core_channels(&bus);
        let panel = ValidityPanel::new();
        panel.attach(&bus);
        bus.emit_event(events::ROAD_LANE_ONLY_POST_INVALID, Some("R1".to_string()));
        bus.emit_event(events::ROAD_LANE_PRE_AND_POST_INVALID, Some("R2".to_string()));
        assert_eq!(panel.count(WarningKind::OnlyPostInvalid), 1);
        assert_eq!(panel.panel_title(), "Road validity");
        assert_eq!(
            panel.panel_lines(),
            vec!["R1: broken by last edit", "R2: still broken"]
        );
    }
}

//! Named-channel event bus.
//!
//! A channel must be registered (with its payload type) before anyone subscribes
//! to it or emits on it. Misuse never fails: duplicate registration, unknown
//! channels and payload type mismatches are logged and ignored.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use shared::{Junction, JunctionId, Lane, LaneSide, Road, RoadCategory, RoadId, Signal, SignalId};

/// What listeners receive.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope<T> {
    pub payload: Option<T>,
}

type Listener<T> = Rc<dyn Fn(&EventEnvelope<T>)>;

struct Channel {
    type_name: &'static str,
    /// `Vec<Listener<T>>` for the registered `T`
    listeners: Box<dyn Any>,
    count: usize,
}

/// Typed channel registry. Emission is synchronous, in subscription order, and
/// re-entrant (a listener may emit on any channel).
#[derive(Default)]
pub struct EventBus {
    channels: RefCell<HashMap<String, Channel>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a channel carrying payloads of type `T`. Returns false if it already exists.
    pub fn register_event<T: 'static>(&self, name: &str) -> bool {
        let mut channels = self.channels.borrow_mut();
        if channels.contains_key(name) {
            tracing::warn!("Event '{}' is already registered", name);
            return false;
        }
        channels.insert(
            name.to_string(),
            Channel {
                type_name: type_name::<T>(),
                listeners: Box::new(Vec::<Listener<T>>::new()),
                count: 0,
            },
        );
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.channels.borrow().contains_key(name)
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.channels.borrow().get(name).map_or(0, |c| c.count)
    }

    /// Subscribe to a registered channel. Returns false (and logs) on misuse.
    pub fn on_event<T: 'static>(&self, name: &str, listener: impl Fn(&EventEnvelope<T>) + 'static) -> bool {
        let mut channels = self.channels.borrow_mut();
        let Some(channel) = channels.get_mut(name) else {
            tracing::warn!("Cannot subscribe to unregistered event '{}'", name);
            return false;
        };
        let Some(listeners) = channel.listeners.downcast_mut::<Vec<Listener<T>>>() else {
            tracing::warn!(
                "Event '{}' carries {}, not {}",
                name,
                channel.type_name,
                type_name::<T>()
            );
            return false;
        };
        listeners.push(Rc::new(listener));
        channel.count += 1;
        true
    }

    /// Emit on a registered channel. Returns the number of listeners invoked.
    pub fn emit_event<T: 'static>(&self, name: &str, payload: Option<T>) -> usize {
        let listeners: Vec<Listener<T>> = {
            let channels = self.channels.borrow();
            let Some(channel) = channels.get(name) else {
                tracing::warn!("Cannot emit unregistered event '{}'", name);
                return 0;
            };
            let Some(listeners) = channel.listeners.downcast_ref::<Vec<Listener<T>>>() else {
                tracing::warn!(
                    "Event '{}' carries {}, not {}",
                    name,
                    channel.type_name,
                    type_name::<T>()
                );
                return 0;
            };
            listeners.clone()
        };

        tracing::debug!("emit {} -> {} listener(s)", name, listeners.len());
        let envelope = EventEnvelope { payload };
        for listener in &listeners {
            listener(&envelope);
        }
        listeners.len()
    }
}

// ============================================================================
// Channels
// ============================================================================

pub const STORE_ROAD: &str = "StoreRoadEvent";
pub const REMOVE_ROAD: &str = "RemoveRoadEvent";
pub const REFORMAT_ROAD: &str = "ReformatRoadEvent";
pub const UPDATE_ONE_SIDE_LANES_ROAD: &str = "UpdateOneSideLanesRoadEvent";
pub const STORE_DIRTY_ROAD: &str = "StoreDirtyRoadEvent";
pub const REMOVE_DIRTY_ROAD: &str = "RemoveDirtyRoadEvent";
pub const CLEAN_DIRTY_ROAD: &str = "CleanDirtyRoadEvent";
pub const FETCH_ALL_ROADS: &str = "FetchAllRoadsEvent";

pub const STORE_JUNCTION: &str = "StoreJunctionEvent";
pub const REMOVE_JUNCTION: &str = "RemoveJunctionEvent";
pub const REFORMAT_JUNCTION: &str = "ReformatJunctionEvent";
pub const STORE_DIRTY_JUNCTION: &str = "StoreDirtyJunctionEvent";
pub const REMOVE_DIRTY_JUNCTION: &str = "RemoveDirtyJunctionEvent";
pub const CLEAN_DIRTY_JUNCTION: &str = "CleanDirtyJunctionEvent";
pub const FETCH_ALL_JUNCTIONS: &str = "FetchAllJunctionsEvent";

pub const STORE_SIGNAL: &str = "StoreSignalEvent";
pub const REMOVE_SIGNAL: &str = "RemoveSignalEvent";
pub const REFORMAT_SIGNAL: &str = "ReformatSignalEvent";
pub const STORE_DIRTY_SIGNAL: &str = "StoreDirtySignalEvent";
pub const REMOVE_DIRTY_SIGNAL: &str = "RemoveDirtySignalEvent";
pub const CLEAN_DIRTY_SIGNAL: &str = "CleanDirtySignalEvent";
pub const FETCH_ALL_SIGNALS: &str = "FetchAllSignalsEvent";

pub const INVALIDATE_UI: &str = "InvalidateUiEvent";
pub const ROAD_LANE_ONLY_POST_INVALID: &str = "RoadLaneOnlyPostInvalidEvent";
pub const ROAD_LANE_PRE_AND_POST_INVALID: &str = "RoadLanePreAndPostInvalidEvent";

/// Payload of [`UPDATE_ONE_SIDE_LANES_ROAD`]: the full new lane list of one side.
#[derive(Debug, Clone, PartialEq)]
pub struct OneSideLanes {
    pub road_id: RoadId,
    pub side: LaneSide,
    pub lanes: Vec<Lane>,
}

/// Operation names used by the rendering channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderOp {
    Create,
    Remove,
    Reformat,
    UpdateLanes,
}

impl RenderOp {
    pub fn name(&self) -> &'static str {
        match self {
            RenderOp::Create => "Create",
            RenderOp::Remove => "Remove",
            RenderOp::Reformat => "Reformat",
            RenderOp::UpdateLanes => "UpdateLanes",
        }
    }

    pub fn all() -> &'static [RenderOp] {
        &[
            RenderOp::Create,
            RenderOp::Remove,
            RenderOp::Reformat,
            RenderOp::UpdateLanes,
        ]
    }
}

/// `Invoke<Op><Category>RoadEvent`
pub fn invoke_road_channel(op: RenderOp, category: RoadCategory) -> String {
    format!("Invoke{}{}RoadEvent", op.name(), category.event_name())
}

/// `Invoke<Op>JunctionEvent`
pub fn invoke_junction_channel(op: RenderOp) -> String {
    format!("Invoke{}JunctionEvent", op.name())
}

/// `Invoke<Op>SignalEvent`
pub fn invoke_signal_channel(op: RenderOp) -> String {
    format!("Invoke{}SignalEvent", op.name())
}

/// Every rendering channel name. Their payload is the affected entity id.
pub fn render_channels() -> Vec<String> {
    let mut names = Vec::new();
    for op in RenderOp::all() {
        for category in RoadCategory::all() {
            names.push(invoke_road_channel(*op, *category));
        }
    }
    for op in [RenderOp::Create, RenderOp::Remove, RenderOp::Reformat] {
        names.push(invoke_junction_channel(op));
        names.push(invoke_signal_channel(op));
    }
    names
}

/// Register every channel the editor core emits on.
pub fn register_core_channels(bus: &EventBus) {
    bus.register_event::<Rc<Road>>(STORE_ROAD);
    bus.register_event::<RoadId>(REMOVE_ROAD);
    bus.register_event::<Rc<Road>>(REFORMAT_ROAD);
    bus.register_event::<OneSideLanes>(UPDATE_ONE_SIDE_LANES_ROAD);
    bus.register_event::<RoadId>(STORE_DIRTY_ROAD);
    bus.register_event::<RoadId>(REMOVE_DIRTY_ROAD);
    bus.register_event::<RoadId>(CLEAN_DIRTY_ROAD);
    bus.register_event::<Vec<Road>>(FETCH_ALL_ROADS);

    bus.register_event::<Rc<Junction>>(STORE_JUNCTION);
    bus.register_event::<JunctionId>(REMOVE_JUNCTION);
    bus.register_event::<Rc<Junction>>(REFORMAT_JUNCTION);
    bus.register_event::<JunctionId>(STORE_DIRTY_JUNCTION);
    bus.register_event::<JunctionId>(REMOVE_DIRTY_JUNCTION);
    bus.register_event::<JunctionId>(CLEAN_DIRTY_JUNCTION);
    bus.register_event::<Vec<Junction>>(FETCH_ALL_JUNCTIONS);

    bus.register_event::<Rc<Signal>>(STORE_SIGNAL);
    bus.register_event::<SignalId>(REMOVE_SIGNAL);
    bus.register_event::<Rc<Signal>>(REFORMAT_SIGNAL);
    bus.register_event::<SignalId>(STORE_DIRTY_SIGNAL);
    bus.register_event::<SignalId>(REMOVE_DIRTY_SIGNAL);
    bus.register_event::<SignalId>(CLEAN_DIRTY_SIGNAL);
    bus.register_event::<Vec<Signal>>(FETCH_ALL_SIGNALS);

    bus.register_event::<()>(INVALIDATE_UI);
    bus.register_event::<RoadId>(ROAD_LANE_ONLY_POST_INVALID);
    bus.register_event::<RoadId>(ROAD_LANE_PRE_AND_POST_INVALID);

    for name in render_channels() {
        bus.register_event::<String>(&name);
    }
}

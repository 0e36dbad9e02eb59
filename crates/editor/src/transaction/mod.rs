//! Transactional edit engine.
//!
//! Every user-visible edit is an [`Edit`]: it snapshots the entities it touches
//! into an "old" [`KeyInfo`], derives a complete "new" `KeyInfo` with the
//! geometry kernel, and [`StandardTransaction`] applies the difference as store,
//! dirty and rendering events. Undo re-applies the old snapshot; redo replays
//! the new snapshot captured at commit.

use std::collections::BTreeMap;
use std::rc::Rc;

use shared::{
    Junction, JunctionId, LaneSide, LineSide, ObjectId, Road, RoadId, Signal, SignalId,
};

use crate::config::EditorSettings;
use crate::context::EditorContext;
use crate::events::{
    self, invoke_junction_channel, invoke_road_channel, invoke_signal_channel, OneSideLanes,
    RenderOp,
};
use crate::geometry::GeometryError;
use crate::store::EntityStore;

pub mod altitude;
pub mod catmull;
pub mod history;
pub mod junction;
pub mod lane;
pub mod property;
pub mod road;
pub mod signal;
pub mod validity;
pub mod width;

pub use altitude::{EditLaneLineAltitude, EditRoadAltitude};
pub use catmull::{EditLaneLineCatmull, EditRoadCatmull, ExtendRoad, ReformatRoad};
pub use history::{CompositeTransaction, TransactionHistory};
pub use junction::{CreateJunction, EditJunctionEdge, EditJunctionEdgeAltitude, RemoveJunction};
pub use lane::{AddLane, RemoveLane};
pub use property::{EditLaneLineBoundary, EditRoadTransparency};
pub use road::{CreateConnectionRoad, CreateRoad, RemoveRoad};
pub use signal::{CreateSignal, ReformatSignal, RemoveSignal};
pub use width::EditLaneWidth;

// ============================================================================
// Errors
// ============================================================================

/// Why an edit could not be derived. Nothing has been emitted when this is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    RoadNotFound(RoadId),
    LaneNotFound(String),
    JunctionNotFound(JunctionId),
    EdgeNotFound(String),
    SignalNotFound(SignalId),
    RoadExists(RoadId),
    JunctionExists(JunctionId),
    SignalExists(SignalId),
    LaneIndexOutOfRange { index: i32, len: usize },
    LaneNotWidthEditable(String),
    InvalidWidth(f64),
    InvalidInput(String),
    Geometry(GeometryError),
    InvalidTransition {
        from: TransactionState,
        action: &'static str,
    },
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditError::RoadNotFound(id) => write!(f, "Road '{}' not found", id),
            EditError::LaneNotFound(id) => write!(f, "Lane '{}' not found", id),
            EditError::JunctionNotFound(id) => write!(f, "Junction '{}' not found", id),
            EditError::EdgeNotFound(id) => write!(f, "Junction edge '{}' not found", id),
            EditError::SignalNotFound(id) => write!(f, "Signal '{}' not found", id),
            EditError::RoadExists(id) => write!(f, "Road '{}' already exists", id),
            EditError::JunctionExists(id) => write!(f, "Junction '{}' already exists", id),
            EditError::SignalExists(id) => write!(f, "Signal '{}' already exists", id),
            EditError::LaneIndexOutOfRange { index, len } => {
                write!(f, "Lane index {} out of range for {} lanes", index, len)
            }
            EditError::LaneNotWidthEditable(id) => write!(f, "Lane '{}' width is not editable", id),
            EditError::InvalidWidth(w) => write!(f, "Invalid lane width: {}", w),
            EditError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            EditError::Geometry(e) => write!(f, "Geometry error: {}", e),
            EditError::InvalidTransition { from, action } => {
                write!(f, "Cannot {} a transaction in state {:?}", action, from)
            }
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EditError::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeometryError> for EditError {
    fn from(e: GeometryError) -> Self {
        EditError::Geometry(e)
    }
}

// ============================================================================
// KeyInfo
// ============================================================================

/// Self-contained snapshot of the entities an edit touches.
/// `None` means "does not exist" (before a create, after a remove).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyInfo {
    pub roads: BTreeMap<RoadId, Option<Rc<Road>>>,
    pub junctions: BTreeMap<JunctionId, Option<Rc<Junction>>>,
    pub signals: BTreeMap<SignalId, Option<Rc<Signal>>>,
}

impl KeyInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_road(mut self, id: impl Into<RoadId>, road: Option<Rc<Road>>) -> Self {
        self.roads.insert(id.into(), road);
        self
    }

    pub fn with_junction(mut self, id: impl Into<JunctionId>, junction: Option<Rc<Junction>>) -> Self {
        self.junctions.insert(id.into(), junction);
        self
    }

    pub fn with_signal(mut self, id: impl Into<SignalId>, signal: Option<Rc<Signal>>) -> Self {
        self.signals.insert(id.into(), signal);
        self
    }

    pub fn road(&self, id: &str) -> Option<&Rc<Road>> {
        self.roads.get(id).and_then(|r| r.as_ref())
    }

    pub fn junction(&self, id: &str) -> Option<&Rc<Junction>> {
        self.junctions.get(id).and_then(|j| j.as_ref())
    }

    pub fn signal(&self, id: &str) -> Option<&Rc<Signal>> {
        self.signals.get(id).and_then(|s| s.as_ref())
    }

    pub fn require_road(&self, id: &str) -> Result<&Rc<Road>, EditError> {
        self.road(id).ok_or_else(|| EditError::RoadNotFound(id.to_string()))
    }

    pub fn require_junction(&self, id: &str) -> Result<&Rc<Junction>, EditError> {
        self.junction(id)
            .ok_or_else(|| EditError::JunctionNotFound(id.to_string()))
    }

    pub fn require_signal(&self, id: &str) -> Result<&Rc<Signal>, EditError> {
        self.signal(id).ok_or_else(|| EditError::SignalNotFound(id.to_string()))
    }
}

/// Fresh id for entities created without one.
pub fn new_object_id() -> ObjectId {
    uuid::Uuid::new_v4().to_string()
}

/// Look up an existing road in the store.
pub fn lookup_road(store: &EntityStore, id: &str) -> Result<Rc<Road>, EditError> {
    store
        .road(id)
        .ok_or_else(|| EditError::RoadNotFound(id.to_string()))
}

pub fn lookup_junction(store: &EntityStore, id: &str) -> Result<Rc<Junction>, EditError> {
    store
        .junction(id)
        .ok_or_else(|| EditError::JunctionNotFound(id.to_string()))
}

pub fn lookup_signal(store: &EntityStore, id: &str) -> Result<Rc<Signal>, EditError> {
    store
        .signal(id)
        .ok_or_else(|| EditError::SignalNotFound(id.to_string()))
}

/// Side and index of a lane within its road.
pub fn locate_lane(road: &Road, lane_id: &str) -> Result<(LaneSide, usize), EditError> {
    road.find_lane(lane_id)
        .map(|(side, index, _)| (side, index))
        .ok_or_else(|| EditError::LaneNotFound(lane_id.to_string()))
}

/// Lane whose outer line is the boundary named by (lane, line side).
///
/// Lane k's inner boundary is lane k-1's outer boundary. The innermost inner
/// boundary is the reference line and cannot be addressed as a lane line.
pub fn locate_boundary(
    road: &Road,
    lane_id: &str,
    line_side: LineSide,
) -> Result<(LaneSide, usize), EditError> {
    let (side, index) = locate_lane(road, lane_id)?;
    match (line_side, index) {
        (LineSide::Outer, _) => Ok((side, index)),
        (LineSide::Inner, 0) => Err(EditError::InvalidInput(format!(
            "inner line of {} is the reference line of road {}",
            lane_id, road.id
        ))),
        (LineSide::Inner, k) => Ok((side, k - 1)),
    }
}

fn same<T: PartialEq>(a: &Option<Rc<T>>, b: &Option<Rc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b) || a == b,
        (None, None) => true,
        _ => false,
    }
}

/// Emit the events that move the store from `from` to `to`.
///
/// Per entity: create (store + dirty + render), remove (remove + dirty + render),
/// lane-only road change (one `UpdateOneSideLanes` per changed side), or reformat.
/// Sides in `refreshed` are re-emitted even when unchanged. One UI invalidation closes it.
pub fn apply_key_info(ctx: &EditorContext, from: &KeyInfo, to: &KeyInfo, refreshed: &[LaneSide]) {
    let bus = &ctx.bus;

    // ids absent from `from` were only read, never changed
    for (id, new) in &to.roads {
        let Some(old) = from.roads.get(id).cloned() else {
            continue;
        };
        match (&old, new) {
            (None, None) => {}
            (None, Some(road)) => {
                bus.emit_event(events::STORE_ROAD, Some(road.clone()));
                bus.emit_event(events::STORE_DIRTY_ROAD, Some(id.clone()));
                bus.emit_event(
                    &invoke_road_channel(RenderOp::Create, road.category),
                    Some(id.clone()),
                );
            }
            (Some(road), None) => {
                bus.emit_event(events::REMOVE_ROAD, Some(id.clone()));
                bus.emit_event(events::REMOVE_DIRTY_ROAD, Some(id.clone()));
                bus.emit_event(
                    &invoke_road_channel(RenderOp::Remove, road.category),
                    Some(id.clone()),
                );
            }
            (Some(before), Some(after)) => {
                let unchanged = same(&old, new);
                if unchanged && refreshed.is_empty() {
                    continue;
                }
                let lanes_only = before.same_except_lanes(after);
                if !lanes_only {
                    bus.emit_event(events::REFORMAT_ROAD, Some(after.clone()));
                    bus.emit_event(
                        &invoke_road_channel(RenderOp::Reformat, after.category),
                        Some(id.clone()),
                    );
                }
                for side in LaneSide::all() {
                    let changed = before.lanes(*side) != after.lanes(*side);
                    if (lanes_only && changed) || refreshed.contains(side) {
                        bus.emit_event(
                            events::UPDATE_ONE_SIDE_LANES_ROAD,
                            Some(OneSideLanes {
                                road_id: id.clone(),
                                side: *side,
                                lanes: after.lanes(*side).to_vec(),
                            }),
                        );
                        bus.emit_event(
                            &invoke_road_channel(RenderOp::UpdateLanes, after.category),
                            Some(id.clone()),
                        );
                    }
                }
                if !unchanged {
                    bus.emit_event(events::STORE_DIRTY_ROAD, Some(id.clone()));
                }
            }
        }
    }

    for (id, new) in &to.junctions {
        let Some(old) = from.junctions.get(id).cloned() else {
            continue;
        };
        if same(&old, new) {
            continue;
        }
        match new {
            Some(junction) => {
                let (channel, op) = if old.is_some() {
                    (events::REFORMAT_JUNCTION, RenderOp::Reformat)
                } else {
                    (events::STORE_JUNCTION, RenderOp::Create)
                };
                bus.emit_event(channel, Some(junction.clone()));
                bus.emit_event(events::STORE_DIRTY_JUNCTION, Some(id.clone()));
                bus.emit_event(&invoke_junction_channel(op), Some(id.clone()));
            }
            None => {
                bus.emit_event(events::REMOVE_JUNCTION, Some(id.clone()));
                bus.emit_event(events::REMOVE_DIRTY_JUNCTION, Some(id.clone()));
                bus.emit_event(&invoke_junction_channel(RenderOp::Remove), Some(id.clone()));
            }
        }
    }

    for (id, new) in &to.signals {
        let Some(old) = from.signals.get(id).cloned() else {
            continue;
        };
        if same(&old, new) {
            continue;
        }
        match new {
            Some(signal) => {
                let (channel, op) = if old.is_some() {
                    (events::REFORMAT_SIGNAL, RenderOp::Reformat)
                } else {
                    (events::STORE_SIGNAL, RenderOp::Create)
                };
                bus.emit_event(channel, Some(signal.clone()));
                bus.emit_event(events::STORE_DIRTY_SIGNAL, Some(id.clone()));
                bus.emit_event(&invoke_signal_channel(op), Some(id.clone()));
            }
            None => {
                bus.emit_event(events::REMOVE_SIGNAL, Some(id.clone()));
                bus.emit_event(events::REMOVE_DIRTY_SIGNAL, Some(id.clone()));
                bus.emit_event(&invoke_signal_channel(RenderOp::Remove), Some(id.clone()));
            }
        }
    }

    bus.emit_event::<()>(events::INVALIDATE_UI, None);
}

// ============================================================================
// Transactions
// ============================================================================

/// Lifecycle: `Created -> Committed`, then `Undone <-> Redone`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Created,
    Committed,
    Undone,
    Redone,
}

/// Small result of a commit.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReceipt {
    pub label: String,
    pub entity_id: ObjectId,
}

pub trait Transaction {
    fn label(&self) -> &str;
    fn state(&self) -> TransactionState;
    fn commit(&mut self, ctx: &EditorContext) -> Result<TransactionReceipt, EditError>;
    fn on_undo(&mut self, ctx: &EditorContext) -> Result<(), EditError>;
    fn on_redo(&mut self, ctx: &EditorContext) -> Result<(), EditError>;
    /// Part of a composite edit whose undo/redo is grouped by the caller
    fn is_composite(&self) -> bool;
    fn set_composite(&mut self, composite: bool);
}

/// One edit family: how to snapshot and how to derive.
pub trait Edit {
    fn label(&self) -> &'static str;

    /// Snapshot every entity the edit touches (the "old" KeyInfo).
    fn resolve_necessary_info(&self, store: &EntityStore) -> Result<KeyInfo, EditError>;

    /// Derive the complete replacement state. Must not look at anything but `old`.
    fn generate_new_key_info(
        &self,
        old: &KeyInfo,
        settings: &EditorSettings,
    ) -> Result<KeyInfo, EditError>;

    /// Id reported in the receipt
    fn target_id(&self) -> ObjectId;

    /// Road whose lane geometry goes through the validity gate
    fn validated_road(&self) -> Option<RoadId> {
        None
    }

    /// Lane sides to re-emit even if unchanged
    fn refreshed_sides(&self) -> Vec<LaneSide> {
        Vec::new()
    }
}

/// Drives an [`Edit`] through the transaction lifecycle.
pub struct StandardTransaction<E: Edit> {
    edit: E,
    state: TransactionState,
    composite: bool,
    old_info: KeyInfo,
    new_info: KeyInfo,
}

impl<E: Edit> StandardTransaction<E> {
    pub fn new(edit: E) -> Self {
        Self {
            edit,
            state: TransactionState::Created,
            composite: false,
            old_info: KeyInfo::default(),
            new_info: KeyInfo::default(),
        }
    }

    pub fn edit(&self) -> &E {
        &self.edit
    }

    pub fn old_info(&self) -> &KeyInfo {
        &self.old_info
    }

    pub fn new_info(&self) -> &KeyInfo {
        &self.new_info
    }

    fn transition(&self, allowed: &[TransactionState], action: &'static str) -> Result<(), EditError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(EditError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }
}

impl<E: Edit> Transaction for StandardTransaction<E> {
    fn label(&self) -> &str {
        self.edit.label()
    }

    fn state(&self) -> TransactionState {
        self.state
    }

    fn commit(&mut self, ctx: &EditorContext) -> Result<TransactionReceipt, EditError> {
        self.transition(&[TransactionState::Created], "commit")?;

        let old = {
            let store = ctx.store.borrow();
            self.edit.resolve_necessary_info(&store)?
        };
        let new = self.edit.generate_new_key_info(&old, &ctx.settings)?;

        let road_id = self.edit.validated_road();
        let pre_valid = road_id
            .as_deref()
            .map_or(true, |id| validity::pre_validate_road(&old, id, &ctx.settings));

        apply_key_info(ctx, &old, &new, &self.edit.refreshed_sides());

        if let Some(id) = road_id.as_deref() {
            let post_valid = validity::post_validate_road(&new, id, &ctx.settings);
            validity::dispatch_invalid_road_event(&ctx.bus, id, pre_valid, post_valid);
        }

        self.old_info = old;
        self.new_info = new;
        self.state = TransactionState::Committed;
        tracing::info!("Committed {} ({})", self.edit.label(), self.edit.target_id());

        Ok(TransactionReceipt {
            label: self.edit.label().to_string(),
            entity_id: self.edit.target_id(),
        })
    }

    fn on_undo(&mut self, ctx: &EditorContext) -> Result<(), EditError> {
        self.transition(&[TransactionState::Committed, TransactionState::Redone], "undo")?;
        apply_key_info(ctx, &self.new_info, &self.old_info, &self.edit.refreshed_sides());
        self.state = TransactionState::Undone;
        tracing::info!("Undone {} ({})", self.edit.label(), self.edit.target_id());
        Ok(())
    }

    fn on_redo(&mut self, ctx: &EditorContext) -> Result<(), EditError> {
        self.transition(&[TransactionState::Undone], "redo")?;
        apply_key_info(ctx, &self.old_info, &self.new_info, &self.edit.refreshed_sides());
        self.state = TransactionState::Redone;
        tracing::info!("Redone {} ({})", self.edit.label(), self.edit.target_id());
        Ok(())
    }

    fn is_composite(&self) -> bool {
        self.composite
    }

    fn set_composite(&mut self, composite: bool) {
        self.composite = composite;
    }
}

/// Shorthand for boxing an edit as a transaction.
pub fn transaction<E: Edit + 'static>(edit: E) -> Box<dyn Transaction> {
    Box::new(StandardTransaction::new(edit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::cell::RefCell;

    fn recorded(ctx: &EditorContext) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in events::render_channels() {
            let log = log.clone();
            let channel = name.clone();
            ctx.bus.on_event::<String>(&name, move |env| {
                log.borrow_mut()
                    .push(format!("{}:{}", channel, env.payload.clone().unwrap_or_default()));
            });
        }
        log
    }

    #[test]
    fn test_apply_create_then_remove() {
        let ctx = EditorContext::default();
        let log = recorded(&ctx);
        let road = Rc::new(fixtures::straight_road("R1", 20.0));
        let empty = KeyInfo::new().with_road("R1", None);
        let full = KeyInfo::new().with_road("R1", Some(road));

        apply_key_info(&ctx, &empty, &full, &[]);
        assert!(ctx.store.borrow().road("R1").is_some());
        apply_key_info(&ctx, &full, &empty, &[]);
        assert!(ctx.store.borrow().road("R1").is_none());
        assert_eq!(
            *log.borrow(),
            vec![
                "InvokeCreateStraightRoadEvent:R1".to_string(),
                "InvokeRemoveStraightRoadEvent:R1".to_string()
            ]
        );
    }

    #[test]
    fn test_apply_lane_only_change_updates_one_side() {
        let ctx = EditorContext::default();
        let before = Rc::new(fixtures::straight_road("R1", 20.0));
        ctx.load_map(fixtures::map_with_roads(vec![(*before).clone()]));
        let log = recorded(&ctx);

        let mut changed = (*before).clone();
        changed.right_lanes.clear();
        let from = KeyInfo::new().with_road("R1", Some(before));
        let to = KeyInfo::new().with_road("R1", Some(Rc::new(changed)));
        apply_key_info(&ctx, &from, &to, &[]);

        assert_eq!(*log.borrow(), vec!["InvokeUpdateLanesStraightRoadEvent:R1".to_string()]);
        assert!(ctx.store.borrow().road("R1").unwrap().right_lanes.is_empty());
    }

    #[test]
    fn test_unchanged_entities_emit_nothing_but_invalidate() {
        let ctx = EditorContext::default();
        let log = recorded(&ctx);
        let invalidations = Rc::new(RefCell::new(0));
        {
            let invalidations = invalidations.clone();
            ctx.bus
                .on_event::<()>(events::INVALIDATE_UI, move |_| *invalidations.borrow_mut() += 1);
        }
        let road = Rc::new(fixtures::straight_road("R1", 20.0));
        let info = KeyInfo::new().with_road("R1", Some(road));
        apply_key_info(&ctx, &info, &info.clone(), &[]);
        assert!(log.borrow().is_empty());
        assert_eq!(*invalidations.borrow(), 1);
    }

    #[test]
    fn test_error_display() {
        let e: EditError = GeometryError::ZeroTangent { index: 2 }.into();
        assert_eq!(e.to_string(), "Geometry error: Zero-length tangent at point 2");
        assert_eq!(
            EditError::RoadNotFound("R9".into()).to_string(),
            "Road 'R9' not found"
        );
    }
}

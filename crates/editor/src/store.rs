//! Entity store: canonical keyed storage for roads, junctions and signals.
//!
//! The store is mutated only through the bus. Entities are persistent records
//! behind `Rc`: an edit replaces the `Rc`, it never mutates through it, so a
//! reference handed out earlier keeps seeing the old value.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use shared::{Junction, JunctionId, MapDescription, Road, RoadId, Signal, SignalId};

use crate::events::{self, EventBus, EventEnvelope, OneSideLanes};

/// Pending persistence work for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// Created or changed since the last sync
    Upserted,
    /// Removed since the last sync
    Removed,
}

#[derive(Debug, Default)]
pub struct EntityStore {
    roads: BTreeMap<RoadId, Rc<Road>>,
    junctions: BTreeMap<JunctionId, Rc<Junction>>,
    signals: BTreeMap<SignalId, Rc<Signal>>,
    dirty_roads: BTreeMap<RoadId, DirtyState>,
    dirty_junctions: BTreeMap<JunctionId, DirtyState>,
    dirty_signals: BTreeMap<SignalId, DirtyState>,
    version: u64,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookups ───────────────────────────────────────────────

    pub fn road(&self, id: &str) -> Option<Rc<Road>> {
        self.roads.get(id).cloned()
    }

    pub fn junction(&self, id: &str) -> Option<Rc<Junction>> {
        self.junctions.get(id).cloned()
    }

    pub fn signal(&self, id: &str) -> Option<Rc<Signal>> {
        self.signals.get(id).cloned()
    }

    pub fn roads(&self) -> impl Iterator<Item = &Rc<Road>> {
        self.roads.values()
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Rc<Junction>> {
        self.junctions.values()
    }

    pub fn signals(&self) -> impl Iterator<Item = &Rc<Signal>> {
        self.signals.values()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn junction_count(&self) -> usize {
        self.junctions.len()
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub fn dirty_roads(&self) -> &BTreeMap<RoadId, DirtyState> {
        &self.dirty_roads
    }

    pub fn dirty_junctions(&self) -> &BTreeMap<JunctionId, DirtyState> {
        &self.dirty_junctions
    }

    pub fn dirty_signals(&self) -> &BTreeMap<SignalId, DirtyState> {
        &self.dirty_signals
    }

    /// Incremented on every mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Snapshot of the whole map
    pub fn to_map_description(&self) -> MapDescription {
        MapDescription {
            roads: self.roads.values().map(|r| (**r).clone()).collect(),
            junctions: self.junctions.values().map(|j| (**j).clone()).collect(),
            signals: self.signals.values().map(|s| (**s).clone()).collect(),
            ..Default::default()
        }
    }

    // ── Mutators (reached through the bus) ────────────────────

    fn store_road(&mut self, road: Rc<Road>) {
        self.roads.insert(road.id.clone(), road);
        self.version += 1;
    }

    fn remove_road(&mut self, id: &str) {
        if self.roads.remove(id).is_some() {
            self.version += 1;
        }
    }

    fn update_one_side_lanes(&mut self, update: OneSideLanes) {
        let Some(current) = self.roads.get(&update.road_id) else {
            tracing::warn!("UpdateOneSideLanes for unknown road {}", update.road_id);
            return;
        };
        let mut road = (**current).clone();
        road.set_lanes(update.side, update.lanes);
        self.roads.insert(update.road_id, Rc::new(road));
        self.version += 1;
    }

    fn store_junction(&mut self, junction: Rc<Junction>) {
        self.junctions.insert(junction.id.clone(), junction);
        self.version += 1;
    }

    fn remove_junction(&mut self, id: &str) {
        if self.junctions.remove(id).is_some() {
            self.version += 1;
        }
    }

    fn store_signal(&mut self, signal: Rc<Signal>) {
        self.signals.insert(signal.id.clone(), signal);
        self.version += 1;
    }

    fn remove_signal(&mut self, id: &str) {
        if self.signals.remove(id).is_some() {
            self.version += 1;
        }
    }

    fn replace_roads(&mut self, roads: Vec<Road>) {
        self.roads = roads.into_iter().map(|r| (r.id.clone(), Rc::new(r))).collect();
        self.dirty_roads.clear();
        self.version += 1;
    }

    fn replace_junctions(&mut self, junctions: Vec<Junction>) {
        self.junctions = junctions
            .into_iter()
            .map(|j| (j.id.clone(), Rc::new(j)))
            .collect();
        self.dirty_junctions.clear();
        self.version += 1;
    }

    fn replace_signals(&mut self, signals: Vec<Signal>) {
        self.signals = signals
            .into_iter()
            .map(|s| (s.id.clone(), Rc::new(s)))
            .collect();
        self.dirty_signals.clear();
        self.version += 1;
    }

    /// Subscribe the store to every store channel on `bus`.
    pub fn connect(store: &Rc<RefCell<Self>>, bus: &EventBus) {
        fn with<T: 'static>(
            bus: &EventBus,
            store: &Rc<RefCell<EntityStore>>,
            name: &str,
            apply: impl Fn(&mut EntityStore, T) + 'static,
        ) where
            T: Clone,
        {
            let weak: Weak<RefCell<EntityStore>> = Rc::downgrade(store);
            bus.on_event::<T>(name, move |env: &EventEnvelope<T>| {
                let (Some(store), Some(payload)) = (weak.upgrade(), env.payload.clone()) else {
                    return;
                };
                apply(&mut store.borrow_mut(), payload);
            });
        }

        with::<Rc<Road>>(bus, store, events::STORE_ROAD, |s, r| s.store_road(r));
        with::<Rc<Road>>(bus, store, events::REFORMAT_ROAD, |s, r| s.store_road(r));
        with::<RoadId>(bus, store, events::REMOVE_ROAD, |s, id| s.remove_road(&id));
        with::<OneSideLanes>(bus, store, events::UPDATE_ONE_SIDE_LANES_ROAD, |s, u| {
            s.update_one_side_lanes(u)
        });
        with::<RoadId>(bus, store, events::STORE_DIRTY_ROAD, |s, id| {
            s.dirty_roads.insert(id, DirtyState::Upserted);
        });
        with::<RoadId>(bus, store, events::REMOVE_DIRTY_ROAD, |s, id| {
            s.dirty_roads.insert(id, DirtyState::Removed);
        });
        with::<RoadId>(bus, store, events::CLEAN_DIRTY_ROAD, |s, id| {
            s.dirty_roads.remove(&id);
        });
        with::<Vec<Road>>(bus, store, events::FETCH_ALL_ROADS, |s, roads| {
            s.replace_roads(roads)
        });

        with::<Rc<Junction>>(bus, store, events::STORE_JUNCTION, |s, j| s.store_junction(j));
        with::<Rc<Junction>>(bus, store, events::REFORMAT_JUNCTION, |s, j| {
            s.store_junction(j)
        });
        with::<JunctionId>(bus, store, events::REMOVE_JUNCTION, |s, id| {
            s.remove_junction(&id)
        });
        with::<JunctionId>(bus, store, events::STORE_DIRTY_JUNCTION, |s, id| {
            s.dirty_junctions.insert(id, DirtyState::Upserted);
        });
        with::<JunctionId>(bus, store, events::REMOVE_DIRTY_JUNCTION, |s, id| {
            s.dirty_junctions.insert(id, DirtyState::Removed);
        });
        with::<JunctionId>(bus, store, events::CLEAN_DIRTY_JUNCTION, |s, id| {
            s.dirty_junctions.remove(&id);
        });
        with::<Vec<Junction>>(bus, store, events::FETCH_ALL_JUNCTIONS, |s, js| {
            s.replace_junctions(js)
        });

        with::<Rc<Signal>>(bus, store, events::STORE_SIGNAL, |s, sig| s.store_signal(sig));
        with::<Rc<Signal>>(bus, store, events::REFORMAT_SIGNAL, |s, sig| {
            s.store_signal(sig)
        });
        with::<SignalId>(bus, store, events::REMOVE_SIGNAL, |s, id| s.remove_signal(&id));
        with::<SignalId>(bus, store, events::STORE_DIRTY_SIGNAL, |s, id| {
            s.dirty_signals.insert(id, DirtyState::Upserted);
        });
        with::<SignalId>(bus, store, events::REMOVE_DIRTY_SIGNAL, |s, id| {
            s.dirty_signals.insert(id, DirtyState::Removed);
        });
        with::<SignalId>(bus, store, events::CLEAN_DIRTY_SIGNAL, |s, id| {
            s.dirty_signals.remove(&id);
        });
        with::<Vec<Signal>>(bus, store, events::FETCH_ALL_SIGNALS, |s, sigs| {
            s.replace_signals(sigs)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::register_core_channels;
    use crate::fixtures;
    use shared::LaneSide;

    fn connected() -> (EventBus, Rc<RefCell<EntityStore>>) {
        let bus = EventBus::new();
        register_core_channels(&bus);
        let store = Rc::new(RefCell::new(EntityStore::new()));
        EntityStore::connect(&store, &bus);
        (bus, store)
    }

    #[test]
    fn test_store_and_remove_road_via_bus() {
        let (bus, store) = connected();
        let road = Rc::new(fixtures::straight_road("R1", 30.0));
        bus.emit_event(events::STORE_ROAD, Some(road.clone()));
        assert!(Rc::ptr_eq(&store.borrow().road("R1").unwrap(), &road));
        bus.emit_event(events::REMOVE_ROAD, Some("R1".to_string()));
        assert!(store.borrow().road("R1").is_none());
        assert_eq!(store.borrow().version(), 2);
    }

    #[test]
    fn test_update_one_side_lanes_replaces_record() {
        let (bus, store) = connected();
        let road = Rc::new(fixtures::straight_road("R1", 30.0));
        bus.emit_event(events::STORE_ROAD, Some(road.clone()));
        bus.emit_event(
            events::UPDATE_ONE_SIDE_LANES_ROAD,
            Some(OneSideLanes {
                road_id: "R1".to_string(),
                side: LaneSide::Left,
                lanes: vec![],
            }),
        );
        let updated = store.borrow().road("R1").unwrap();
        assert!(updated.left_lanes.is_empty());
        assert_eq!(updated.right_lanes.len(), 1);
        // the earlier record is untouched
        assert_eq!(road.left_lanes.len(), 1);
    }

    #[test]
    fn test_dirty_marks() {
        let (bus, store) = connected();
        bus.emit_event(events::STORE_DIRTY_ROAD, Some("R1".to_string()));
        bus.emit_event(events::REMOVE_DIRTY_SIGNAL, Some("S1".to_string()));
        assert_eq!(store.borrow().dirty_roads().get("R1"), Some(&DirtyState::Upserted));
        assert_eq!(store.borrow().dirty_signals().get("S1"), Some(&DirtyState::Removed));
        bus.emit_event(events::CLEAN_DIRTY_ROAD, Some("R1".to_string()));
        assert!(store.borrow().dirty_roads().is_empty());
    }

    #[test]
    fn test_fetch_all_replaces_contents() {
        let (bus, store) = connected();
        bus.emit_event(events::STORE_DIRTY_ROAD, Some("old".to_string()));
        bus.emit_event(
            events::FETCH_ALL_ROADS,
            Some(vec![
                fixtures::straight_road("A", 10.0),
                fixtures::straight_road("B", 20.0),
            ]),
        );
        let s = store.borrow();
        assert_eq!(s.road_count(), 2);
        assert!(s.dirty_roads().is_empty());
        assert_eq!(s.to_map_description().roads.len(), 2);
    }

    #[test]
    fn test_dropped_store_ignores_events() {
        let bus = EventBus::new();
        register_core_channels(&bus);
        {
            let store = Rc::new(RefCell::new(EntityStore::new()));
            EntityStore::connect(&store, &bus);
        }
        assert_eq!(bus.emit_event(events::REMOVE_ROAD, Some("R1".to_string())), 1);
    }
}

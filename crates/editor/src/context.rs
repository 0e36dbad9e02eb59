//! Explicit editor context handed to every component.

use std::cell::RefCell;
use std::rc::Rc;

use shared::MapDescription;

use crate::config::EditorSettings;
use crate::events::{self, register_core_channels, EventBus};
use crate::store::EntityStore;

/// Bus, store and settings. Created once by the entry point and passed down.
#[derive(Clone)]
pub struct EditorContext {
    pub bus: Rc<EventBus>,
    pub store: Rc<RefCell<EntityStore>>,
    pub settings: Rc<EditorSettings>,
}

impl EditorContext {
    /// New context with core channels registered and the store connected.
    pub fn new(settings: EditorSettings) -> Self {
        let bus = Rc::new(EventBus::new());
        register_core_channels(&bus);
        let store = Rc::new(RefCell::new(EntityStore::new()));
        EntityStore::connect(&store, &bus);
        Self {
            bus,
            store,
            settings: Rc::new(settings),
        }
    }

    /// Replace the store contents through the `FetchAll*` channels.
    pub fn load_map(&self, map: MapDescription) {
        tracing::info!(
            "Loading map: {} roads, {} junctions, {} signals",
            map.roads.len(),
            map.junctions.len(),
            map.signals.len()
        );
        self.bus.emit_event(events::FETCH_ALL_ROADS, Some(map.roads));
        self.bus.emit_event(events::FETCH_ALL_JUNCTIONS, Some(map.junctions));
        self.bus.emit_event(events::FETCH_ALL_SIGNALS, Some(map.signals));
        self.bus.emit_event::<()>(events::INVALIDATE_UI, None);
    }

    pub fn snapshot(&self) -> MapDescription {
        self.store.borrow().to_map_description()
    }
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_load_map_fills_store() {
        let ctx = EditorContext::default();
        let map = fixtures::map_with_roads(vec![fixtures::straight_road("R1", 20.0)]);
        ctx.load_map(map.clone());
        assert_eq!(ctx.store.borrow().road_count(), 1);
        assert_eq!(ctx.snapshot().roads, map.roads);
    }
}

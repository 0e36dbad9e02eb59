//! Headless harness: context, history and the stock plugins wired together.

use std::rc::Rc;

use shared::{Junction, MapDescription, Road, Signal};

use crate::config::EditorSettings;
use crate::context::EditorContext;
use crate::plugin::{EventAware, RenderRecorder, ValidityPanel};
use crate::transaction::{
    transaction, CompositeTransaction, Edit, Transaction, TransactionHistory, TransactionReceipt,
};

/// Headless editor: everything a UI would own, minus the UI.
pub struct EditorHarness {
    pub ctx: EditorContext,
    pub history: TransactionHistory,
    pub renders: RenderRecorder,
    pub validity: ValidityPanel,
}

impl EditorHarness {
    pub fn new(settings: EditorSettings) -> Self {
        let history = TransactionHistory::new(settings.history.max_depth);
        let ctx = EditorContext::new(settings);
        let renders = RenderRecorder::new();
        renders.attach(&ctx.bus);
        let validity = ValidityPanel::new();
        validity.attach(&ctx.bus);
        Self {
            ctx,
            history,
            renders,
            validity,
        }
    }

    // ── Edits ─────────────────────────────────────────────────

    /// Commit an edit and push it onto the undo stack
    pub fn submit<E: Edit + 'static>(&mut self, edit: E) -> Result<TransactionReceipt, String> {
        self.submit_boxed(transaction(edit))
    }

    pub fn submit_boxed(&mut self, tx: Box<dyn Transaction>) -> Result<TransactionReceipt, String> {
        self.history.submit(tx, &self.ctx).map_err(|e| e.to_string())
    }

    /// Commit several edits as one undo step
    pub fn submit_composite(
        &mut self,
        label: &str,
        parts: Vec<Box<dyn Transaction>>,
    ) -> Result<TransactionReceipt, String> {
        self.submit_boxed(Box::new(CompositeTransaction::new(label, parts)))
    }

    /// Returns false if there was nothing to undo
    pub fn undo(&mut self) -> Result<bool, String> {
        self.history
            .undo(&self.ctx)
            .map(|label| label.is_some())
            .map_err(|e| e.to_string())
    }

    pub fn redo(&mut self) -> Result<bool, String> {
        self.history
            .redo(&self.ctx)
            .map(|label| label.is_some())
            .map_err(|e| e.to_string())
    }

    // ── Map I/O ───────────────────────────────────────────────

    /// Replace the map. History from the previous map is dropped.
    pub fn load_map(&mut self, map: MapDescription) {
        self.history.clear();
        self.ctx.load_map(map);
    }

    pub fn load_map_json(&mut self, json: &str) -> Result<(), String> {
        let map: MapDescription =
            serde_json::from_str(json).map_err(|e| format!("Invalid map JSON: {e}"))?;
        self.load_map(map);
        Ok(())
    }

    pub fn export_map(&self) -> MapDescription {
        self.ctx.snapshot()
    }

    pub fn export_map_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(&self.export_map()).map_err(|e| format!("Failed to serialize map: {e}"))
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn road(&self, id: &str) -> Option<Rc<Road>> {
        self.ctx.store.borrow().road(id)
    }

    pub fn junction(&self, id: &str) -> Option<Rc<Junction>> {
        self.ctx.store.borrow().junction(id)
    }

    pub fn signal(&self, id: &str) -> Option<Rc<Signal>> {
        self.ctx.store.borrow().signal(id)
    }

    pub fn road_count(&self) -> usize {
        self.ctx.store.borrow().road_count()
    }

    pub fn junction_count(&self) -> usize {
        self.ctx.store.borrow().junction_count()
    }

    pub fn signal_count(&self) -> usize {
        self.ctx.store.borrow().signal_count()
    }
}

impl Default for EditorHarness {
    fn default() -> Self {
        Self::new(EditorSettings::default())
    }
}

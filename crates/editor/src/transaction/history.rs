//! Undo/redo functionality

use crate::context::EditorContext;
use crate::transaction::{EditError, Transaction, TransactionReceipt, TransactionState};

/// Committed transactions in commit order plus the undone ones waiting for redo.
pub struct TransactionHistory {
    undo_stack: Vec<Box<dyn Transaction>>,
    redo_stack: Vec<Box<dyn Transaction>>,
    max_depth: usize,
}

impl TransactionHistory {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Commit a transaction and push it. A failed commit leaves the history untouched.
    pub fn submit(
        &mut self,
        mut transaction: Box<dyn Transaction>,
        ctx: &EditorContext,
    ) -> Result<TransactionReceipt, EditError> {
        let receipt = transaction.commit(ctx)?;
        self.undo_stack.push(transaction);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(receipt)
    }

    /// Undo last transaction. Returns its label, or None if there is nothing to undo.
    pub fn undo(&mut self, ctx: &EditorContext) -> Result<Option<String>, EditError> {
        let Some(mut transaction) = self.undo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = transaction.on_undo(ctx) {
            self.undo_stack.push(transaction);
            return Err(e);
        }
        let label = transaction.label().to_string();
        self.redo_stack.push(transaction);
        Ok(Some(label))
    }

    /// Redo last undone transaction
    pub fn redo(&mut self, ctx: &EditorContext) -> Result<Option<String>, EditError> {
        let Some(mut transaction) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = transaction.on_redo(ctx) {
            self.redo_stack.push(transaction);
            return Err(e);
        }
        let label = transaction.label().to_string();
        self.undo_stack.push(transaction);
        Ok(Some(label))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Labels of the undo stack, oldest first
    pub fn undo_labels(&self) -> Vec<String> {
        self.undo_stack.iter().map(|t| t.label().to_string()).collect()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for TransactionHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

// ============================================================================
// Composite
// ============================================================================

/// Several transactions undone and redone as one step.
///
/// Commit is all-or-nothing: if a part fails, the parts already committed
/// are undone in reverse order before the error is returned.
pub struct CompositeTransaction {
    label: String,
    parts: Vec<Box<dyn Transaction>>,
    state: TransactionState,
    composite: bool,
}

impl CompositeTransaction {
    pub fn new(label: impl Into<String>, parts: Vec<Box<dyn Transaction>>) -> Self {
        let mut parts = parts;
        for part in &mut parts {
            part.set_composite(true);
        }
        Self {
            label: label.into(),
            parts,
            state: TransactionState::Created,
            composite: false,
        }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Transaction for CompositeTransaction {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> TransactionState {
        self.state
    }

    fn commit(&mut self, ctx: &EditorContext) -> Result<TransactionReceipt, EditError> {
        if self.state != TransactionState::Created {
            return Err(EditError::InvalidTransition {
                from: self.state,
                action: "commit",
            });
        }
        if self.parts.is_empty() {
            return Err(EditError::InvalidInput(format!("{} has no parts", self.label)));
        }

        let mut first = None;
        for i in 0..self.parts.len() {
            match self.parts[i].commit(ctx) {
                Ok(receipt) => {
                    first.get_or_insert(receipt);
                }
                Err(e) => {
                    tracing::warn!("{}: part {} failed, rolling back: {}", self.label, i, e);
                    for part in self.parts[..i].iter_mut().rev() {
                        part.on_undo(ctx)?;
                    }
                    return Err(e);
                }
            }
        }

        self.state = TransactionState::Committed;
        let entity_id = first.map(|r| r.entity_id).unwrap_or_default();
        Ok(TransactionReceipt {
            label: self.label.clone(),
            entity_id,
        })
    }

    fn on_undo(&mut self, ctx: &EditorContext) -> Result<(), EditError> {
        if !matches!(self.state, TransactionState::Committed | TransactionState::Redone) {
            return Err(EditError::InvalidTransition {
                from: self.state,
                action: "undo",
            });
        }
        for part in self.parts.iter_mut().rev() {
            part.on_undo(ctx)?;
        }
        self.state = TransactionState::Undone;
        Ok(())
    }

    fn on_redo(&mut self, ctx: &EditorContext) -> Result<(), EditError> {
        if self.state != TransactionState::Undone {
            return Err(EditError::InvalidTransition {
                from: self.state,
                action: "redo",
            });
        }
        for part in self.parts.iter_mut() {
            part.on_redo(ctx)?;
        }
        self.state = TransactionState::Redone;
        Ok(())
    }

    fn is_composite(&self) -> bool {
        self.composite
    }

    fn set_composite(&mut self, composite: bool) {
        self.composite = composite;
    }
}

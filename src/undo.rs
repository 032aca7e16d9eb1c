//! Undo/redo history for label edits.
//!
//! Every label change is recorded as a reversible [`HistoryEntry`]. The label
//! store and both stacks live together in [`EditState`], and the only way to
//! change them is [`EditState::reduce`], which takes an [`EditAction`] and
//! produces the next state plus the [`LabelWrite`] that must be persisted.

use std::collections::HashSet;

use crate::model::{HealthLabel, Label, RegionId, Stamp};
use crate::store::LabelStore;

// ============================================================================
// History Entries
// ============================================================================

/// A reversible label change for one region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub region_id: RegionId,
    pub previous: Label,
    pub new: Label,
}

impl HistoryEntry {
    /// Get a human-readable description of this entry
    pub fn description(&self) -> String {
        match (self.previous, self.new) {
            (_, Label::Unlabeled) => format!("Erase region {}", self.region_id),
            (Label::Unlabeled, new) => format!("Label region {} as {}", self.region_id, new),
            (old, new) => format!("Relabel region {} {} → {}", self.region_id, old, new),
        }
    }
}

// ============================================================================
// Undo Stack
// ============================================================================

/// The undo/redo history stack.
///
/// Maintains two stacks:
/// - `undo_stack`: entries that can be undone (most recent at the end)
/// - `redo_stack`: entries that can be redone (most recent at the end)
///
/// Pushing a new entry clears `redo_stack`. Undo moves the top entry from
/// `undo_stack` to `redo_stack`, redo moves it back. Entries are never
/// dropped except by [`UndoStack::clear`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndoStack {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an entry to the undo stack.
    /// This clears the redo stack (can't redo after a new action).
    pub fn push(&mut self, entry: HistoryEntry) {
        log::debug!("📝 Undo: pushed '{}'", entry.description());
        self.undo_stack.push(entry);
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Move the most recent entry from the undo stack to the redo stack.
    /// Returns the moved entry, or None if there is nothing to undo.
    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        let entry = self.undo_stack.pop()?;
        log::debug!("⏪ Undo: '{}'", entry.description());
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Move the most recent entry from the redo stack back to the undo stack.
    /// Returns the moved entry, or None if there is nothing to redo.
    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        log::debug!("⏩ Redo: '{}'", entry.description());
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("🗑️ Undo history cleared");
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Committed entries, oldest first.
    pub fn undo_entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }

    /// Point the oldest entry of each region at a new baseline label, so
    /// undoing all the way back restores `baseline` instead of the label the
    /// region had when the entry was recorded.
    pub(crate) fn rebase_previous(&mut self, baseline: impl Fn(&RegionId) -> Label) {
        let mut seen = HashSet::new();
        // Chronological order: undo stack bottom to top, then redo stack top
        // to bottom (the next redo is its last element).
        let chronological = self
            .undo_stack
            .iter_mut()
            .chain(self.redo_stack.iter_mut().rev());
        for entry in chronological {
            if seen.insert(entry.region_id.clone()) {
                entry.previous = baseline(&entry.region_id);
            }
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// An edit the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    /// Assign a category to a region
    Apply { region_id: RegionId, label: HealthLabel },
    /// Remove a region's label
    Erase { region_id: RegionId },
    /// Revert the most recent committed edit
    Undo,
    /// Re-apply the most recently undone edit
    Redo,
}

/// The label a region ended up with after a transition; handed to persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelWrite {
    pub region_id: RegionId,
    pub label: Label,
}

/// Result of reducing one action.
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: EditState,
    /// `None` when the action was a no-op (undo/redo on an empty stack).
    pub write: Option<LabelWrite>,
}

/// Label store and history, changed only together.
#[derive(Debug, Clone, Default)]
pub struct EditState {
    store: LabelStore,
    history: UndoStack,
}

impl EditState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing set of labels with empty history.
    pub fn with_store(store: LabelStore) -> Self {
        Self {
            store,
            history: UndoStack::new(),
        }
    }

    pub fn store(&self) -> &LabelStore {
        &self.store
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// `(state, action) → state'`: the single transition function.
    pub fn reduce(mut self, action: EditAction, stamp: &Stamp) -> Transition {
        let write = self.apply(action, stamp);
        Transition { state: self, write }
    }

    /// In-place form of [`EditState::reduce`].
    pub fn apply(&mut self, action: EditAction, stamp: &Stamp) -> Option<LabelWrite> {
        match action {
            EditAction::Apply { region_id, label } => {
                Some(self.commit(region_id, Label::Health(label), stamp))
            }
            EditAction::Erase { region_id } => Some(self.commit(region_id, Label::Unlabeled, stamp)),
            EditAction::Undo => {
                let entry = self.history.pop_undo()?;
                self.store.write(&entry.region_id, entry.previous, stamp);
                Some(LabelWrite {
                    region_id: entry.region_id,
                    label: entry.previous,
                })
            }
            EditAction::Redo => {
                let entry = self.history.pop_redo()?;
                self.store.write(&entry.region_id, entry.new, stamp);
                Some(LabelWrite {
                    region_id: entry.region_id,
                    label: entry.new,
                })
            }
        }
    }

    fn commit(&mut self, region_id: RegionId, new: Label, stamp: &Stamp) -> LabelWrite {
        let previous = self.store.label_of(&region_id);
        self.history.push(HistoryEntry {
            region_id: region_id.clone(),
            previous,
            new,
        });
        self.store.write(&region_id, new, stamp);
        LabelWrite {
            region_id,
            label: new,
        }
    }

    /// Adopt the first label set fetched for a session as the baseline and
    /// re-apply committed history on top of it, so local edits made before
    /// the fetch completed still win. Undoing back past those edits restores
    /// the fetched label. Entries for regions rejected by `known` are dropped
    /// from the baseline.
    pub fn rebase(&mut self, baseline: LabelStore, known: impl Fn(&RegionId) -> bool, stamp: &Stamp) {
        let baseline = known_only(baseline, known);
        self.history.rebase_previous(|id| baseline.label_of(id));
        self.store = self.replayed_onto(baseline, stamp);
    }

    /// Re-apply committed history onto a re-fetched label set. History is
    /// left untouched: the remote already holds this session's own saves, so
    /// undo must keep reverting to the labels the entries recorded.
    pub fn refresh(&mut self, baseline: LabelStore, known: impl Fn(&RegionId) -> bool, stamp: &Stamp) {
        let baseline = known_only(baseline, known);
        self.store = self.replayed_onto(baseline, stamp);
    }

    /// Replay committed history onto `baseline`, without touching `self`.
    pub fn replayed_onto(&self, mut baseline: LabelStore, stamp: &Stamp) -> LabelStore {
        for entry in self.history.undo_entries() {
            baseline.write(&entry.region_id, entry.new, stamp);
        }
        baseline
    }
}

fn known_only(mut baseline: LabelStore, known: impl Fn(&RegionId) -> bool) -> LabelStore {
    let before = baseline.len();
    baseline.retain(|id| known(id));
    if baseline.len() != before {
        log::warn!(
            "Dropped {} labels for unknown regions",
            before - baseline.len()
        );
    }
    baseline
}

// ============================================================================
// Tests
// ============================================================================

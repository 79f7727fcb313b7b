//! Document store with bounded snapshot history.
//!
//! The store owns the current [`Snapshot`] plus two stacks of earlier and
//! later ones. Snapshots are shared through [`Arc`], so handing one to a
//! reader is cheap and the reader can hold on to it after the store moves on.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::action::Action;
use crate::config::{EngineConfig, DEFAULT_HISTORY_LIMIT};
use crate::{
    validate, BuiltinSchema, DocumentModel, EditorStateModel, IdAllocator, LayoutError, LayoutResult, Reducer,
    WidgetId,
};

/// One history entry: a document with the selection that went with it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// The immutable document.
    pub document: Arc<DocumentModel>,
    /// Session state recorded alongside it.
    pub editor: EditorStateModel,
}

impl Snapshot {
    /// Wrap a document and editor state.
    #[must_use]
    pub fn new(document: DocumentModel, editor: EditorStateModel) -> Self {
        Self {
            document: Arc::new(document),
            editor,
        }
    }
}

#[derive(Debug, Clone)]
struct CoalesceWindow {
    key: String,
    base: Snapshot,
}

/// Owns the current snapshot and its undo/redo history.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    current: Snapshot,
    undo: VecDeque<Snapshot>,
    redo: VecDeque<Snapshot>,
    history_limit: usize,
    ids: IdAllocator,
    reducer: Reducer,
    coalescing: Option<CoalesceWindow>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new(Reducer::default())
    }
}

impl DocumentStore {
    /// Create a store holding an empty document.
    #[must_use]
    pub fn new(reducer: Reducer) -> Self {
        let document = DocumentModel {
            schema_version: reducer.version(),
            ..DocumentModel::default()
        };
        Self {
            current: Snapshot::new(document, EditorStateModel::default()),
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            ids: IdAllocator::new(),
            reducer,
            coalescing: None,
        }
    }

    /// Create a store configured from an [`EngineConfig`].
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let reducer = Reducer::new(Arc::new(BuiltinSchema), config.schema_version);
        let mut store = Self::new(reducer);
        store.history_limit = config.history_limit;
        store
    }

    /// The current document.
    #[must_use]
    pub fn document(&self) -> &Arc<DocumentModel> {
        &self.current.document
    }

    /// The current editor state.
    #[must_use]
    pub fn editor(&self) -> &EditorStateModel {
        &self.current.editor
    }

    /// A cheap copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.current.clone()
    }

    /// The reducer edits go through.
    #[must_use]
    pub fn reducer(&self) -> &Reducer {
        &self.reducer
    }

    /// The id the next allocation will try first.
    #[must_use]
    pub fn next_id(&self) -> WidgetId {
        self.ids.peek()
    }

    /// Apply an action, pruning stale ids from the selection.
    ///
    /// With `record_history` off the undo stack is left as is, but the redo
    /// stack is still dropped.
    ///
    /// # Errors
    ///
    /// Any reducer failure; the store is unchanged.
    pub fn apply(&mut self, action: &Action, record_history: bool) -> LayoutResult<Vec<WidgetId>> {
        self.apply_with(action, record_history, |_, _, _| {})
    }

    /// Apply an action and adjust the editor state in the same history entry.
    ///
    /// `update` runs after the selection has been pruned of deleted widgets
    /// and receives the new document plus the ids the action created.
    ///
    /// # Errors
    ///
    /// Any reducer failure, or an editor state that no longer validates.
    pub fn apply_with<F>(
        &mut self,
        action: &Action,
        record_history: bool,
        update: F,
    ) -> LayoutResult<Vec<WidgetId>>
    where
        F: FnOnce(&DocumentModel, &[WidgetId], &mut EditorStateModel),
    {
        let mut ids = self.ids.clone();
        let reduction = match self.reducer.reduce(&self.current.document, action, &mut ids) {
            Ok(reduction) => reduction,
            Err(e) => {
                tracing::debug!(action = action.name(), error = %e, "action rejected");
                return Err(e);
            }
        };

        let mut editor = self.current.editor.clone();
        editor
            .selection
            .retain(|id| reduction.document.widget(*id).is_some());
        update(&reduction.document, &reduction.created_ids, &mut editor);
        validate::validate_editor_state(&reduction.document, &editor)?;

        // Allocations only stick once the whole edit has been accepted.
        self.ids = ids;
        let next = Snapshot::new(reduction.document, editor);
        self.commit(next, record_history);
        tracing::debug!(
            action = action.name(),
            created = ?reduction.created_ids,
            undo_depth = self.undo.len(),
            "action applied"
        );
        Ok(reduction.created_ids)
    }

    /// Replace the editor state, e.g. a selection change.
    ///
    /// # Errors
    ///
    /// Fails validation for unknown or repeated ids, and is a no-op rejection
    /// when the state is unchanged.
    pub fn set_editor(&mut self, editor: EditorStateModel, record_history: bool) -> LayoutResult<()> {
        validate::validate_editor_state(&self.current.document, &editor)?;
        if editor == self.current.editor {
            return Err(LayoutError::no_op("selection unchanged"));
        }
        let next = Snapshot {
            document: Arc::clone(&self.current.document),
            editor,
        };
        self.commit(next, record_history);
        tracing::debug!(selection = ?self.current.editor.selection, "editor state updated");
        Ok(())
    }

    fn commit(&mut self, next: Snapshot, record_history: bool) {
        let previous = std::mem::replace(&mut self.current, next);
        if self.coalescing.is_some() {
            return;
        }
        if record_history {
            self.push_undo(previous);
        }
        // Redo entries were taken from a state that no longer exists.
        self.redo.clear();
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        if self.history_limit == 0 {
            return;
        }
        self.undo.push_back(snapshot);
        while self.undo.len() > self.history_limit {
            self.undo.pop_front();
        }
    }

    /// Step back one entry. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        if self.coalescing.is_some() {
            tracing::debug!("undo ignored inside coalesced edit");
            return false;
        }
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, previous);
        self.redo.push_back(current);
        tracing::debug!(undo_depth = self.undo.len(), redo_depth = self.redo.len(), "undo");
        true
    }

    /// Step forward one entry. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        if self.coalescing.is_some() {
            tracing::debug!("redo ignored inside coalesced edit");
            return false;
        }
        let Some(next) = self.redo.pop_back() else {
            return false;
        };
        let current = std::mem::replace(&mut self.current, next);
        self.push_undo(current);
        tracing::debug!(undo_depth = self.undo.len(), redo_depth = self.redo.len(), "redo");
        true
    }

    /// Whether [`Self::undo`] would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.coalescing.is_none() && !self.undo.is_empty()
    }

    /// Whether [`Self::redo`] would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.coalescing.is_none() && !self.redo.is_empty()
    }

    /// Number of undo entries.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo entries.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Replace the document, discarding all history and any open coalesced edit.
    ///
    /// The id allocator is reseeded past every id in the new document.
    ///
    /// # Errors
    ///
    /// Returns the validation failure if the document or editor state is invalid.
    pub fn reset(&mut self, document: DocumentModel, editor: EditorStateModel) -> LayoutResult<()> {
        validate::validate_scene(
            &document,
            Some(&editor),
            self.reducer.schema(),
            self.reducer.version(),
        )?;
        self.ids.reseed(&document);
        self.current = Snapshot::new(document, editor);
        self.undo.clear();
        self.redo.clear();
        self.coalescing = None;
        tracing::debug!(
            widgets = self.current.document.widget_count(),
            next_id = %self.ids.peek(),
            "store reset"
        );
        Ok(())
    }

    /// Configured undo depth.
    #[must_use]
    pub const fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Change the undo depth, dropping the oldest entries if it shrank.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.history_limit = limit;
        while self.undo.len() > limit {
            self.undo.pop_front();
        }
    }

    /// Open a coalesced edit window named `key`.
    ///
    /// Until [`Self::end_coalesced`] every edit updates the current snapshot
    /// without touching history.
    ///
    /// # Errors
    ///
    /// [`LayoutError::Coalesce`] if a window is already open.
    pub fn begin_coalesced(&mut self, key: &str) -> LayoutResult<()> {
        if let Some(window) = &self.coalescing {
            return Err(LayoutError::Coalesce(format!(
                "cannot begin '{key}' while '{}' is open",
                window.key
            )));
        }
        self.coalescing = Some(CoalesceWindow {
            key: key.to_string(),
            base: self.current.clone(),
        });
        tracing::debug!(key, "coalesced edit started");
        Ok(())
    }

    /// Close the window named `key`.
    ///
    /// With `commit` the net change becomes one undo entry (none if nothing
    /// changed); without it the current snapshot rolls back to where the
    /// window began. Returns whether a history entry was recorded.
    ///
    /// # Errors
    ///
    /// [`LayoutError::Coalesce`] if no window is open or `key` does not match.
    pub fn end_coalesced(&mut self, key: &str, commit: bool) -> LayoutResult<bool> {
        match &self.coalescing {
            None => {
                return Err(LayoutError::Coalesce(format!(
                    "no coalesced edit open to end '{key}'"
                )))
            }
            Some(window) if window.key != key => {
                return Err(LayoutError::Coalesce(format!(
                    "'{key}' does not match open edit '{}'",
                    window.key
                )))
            }
            Some(_) => {}
        }
        let Some(window) = self.coalescing.take() else {
            return Ok(false);
        };

        if !commit {
            self.current = window.base;
            tracing::debug!(key, "coalesced edit rolled back");
            return Ok(false);
        }
        if window.base == self.current {
            tracing::debug!(key, "coalesced edit committed without changes");
            return Ok(false);
        }
        self.push_undo(window.base);
        self.redo.clear();
        tracing::debug!(key, undo_depth = self.undo.len(), "coalesced edit committed");
        Ok(true)
    }

    /// Key of the open coalesced edit, if any.
    #[must_use]
    pub fn coalescing_key(&self) -> Option<&str> {
        self.coalescing.as_ref().map(|w| w.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::BoundsUpdate;
    use crate::{PropertyBag, Rect, WidgetType};

    fn create() -> Action {
        Action::CreateWidget {
            widget_type: WidgetType::Slider,
            bounds: Rect::default(),
            properties: PropertyBag::new(),
        }
    }

    fn move_to(id: i64, x: f32) -> Action {
        Action::SetWidgetsBounds {
            items: vec![BoundsUpdate {
                id: WidgetId::new(id),
                bounds: Rect::new(x, 0.0, 10.0, 10.0),
            }],
        }
    }

    #[test]
    fn test_apply_records_history_and_clears_redo() {
        let mut store = DocumentStore::default();
        store.apply(&create(), true).expect("create");
        store.apply(&move_to(1, 5.0), true).expect("move");
        assert_eq!(store.undo_depth(), 2);
        assert!(store.undo());
        assert_eq!(store.redo_depth(), 1);
        store.apply(&move_to(1, 9.0), true).expect("move again");
        assert_eq!(store.redo_depth(), 0);
    }

    #[test]
    fn test_unrecorded_apply_keeps_undo_and_drops_redo() {
        let mut store = DocumentStore::default();
        store.apply(&create(), true).expect("create");
        store.apply(&move_to(1, 5.0), true).expect("move");
        assert!(store.undo());
        assert_eq!((store.undo_depth(), store.redo_depth()), (1, 1));

        store.apply(&move_to(1, 3.0), false).expect("live preview");
        assert_eq!(store.undo_depth(), 1);
        assert_eq!(store.redo_depth(), 0);
        assert!(!store.redo());
        let x = store.document().widget(WidgetId::new(1)).expect("widget").bounds.x;
        assert!((x - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_failed_apply_leaves_store_untouched() {
        let mut store = DocumentStore::default();
        store.apply(&create(), true).expect("create");
        let before = store.snapshot();
        let depth = store.undo_depth();
        assert!(store.apply(&move_to(7, 1.0), true).is_err());
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.undo_depth(), depth);
    }

    #[test]
    fn test_undo_redo_on_empty_stacks() {
        let mut store = DocumentStore::default();
        assert!(!store.undo());
        assert!(!store.redo());
    }

    #[test]
    fn test_history_limit_trims_oldest() {
        let mut store = DocumentStore::default();
        store.set_history_limit(2);
        store.apply(&create(), true).expect("create");
        for x in [1.0, 2.0, 3.0] {
            store.apply(&move_to(1, x), true).expect("move");
        }
        assert_eq!(store.undo_depth(), 2);
        store.set_history_limit(1);
        assert_eq!(store.undo_depth(), 1);
        store.set_history_limit(0);
        store.apply(&move_to(1, 50.0), true).expect("move");
        assert_eq!(store.undo_depth(), 0);
    }

    #[test]
    fn test_undo_restores_selection() {
        let mut store = DocumentStore::default();
        let created = store
            .apply_with(&create(), true, |_, ids, editor| {
                editor.selection = ids.to_vec();
            })
            .expect("create");
        assert_eq!(store.editor().selection, created);
        store
            .apply(&Action::DeleteWidgets { ids: created.clone() }, true)
            .expect("delete");
        assert!(store.editor().selection.is_empty());
        assert!(store.undo());
        assert_eq!(store.editor().selection, created);
    }

    #[test]
    fn test_ids_are_not_reused_after_undo() {
        let mut store = DocumentStore::default();
        let first = store.apply(&create(), true).expect("create");
        assert!(store.undo());
        let second = store.apply(&create(), true).expect("create again");
        assert_ne!(first, second);
    }

    #[test]
    fn test_reset_reseeds_and_clears() {
        let mut store = DocumentStore::default();
        store.apply(&create(), true).expect("create");
        let mut doc = (**store.document()).clone();
        doc.widgets[0].id = WidgetId::new(40);
        store
            .reset(doc, EditorStateModel::default())
            .expect("reset");
        assert!(!store.can_undo());
        assert_eq!(store.next_id(), WidgetId::new(41));
    }

    #[test]
    fn test_coalesced_commit_is_one_entry() {
        let mut store = DocumentStore::default();
        store.apply(&create(), true).expect("create");
        let base = store.snapshot();
        store.begin_coalesced("drag").expect("begin");
        for x in [1.0, 2.0, 3.0] {
            store.apply(&move_to(1, x), true).expect("preview");
        }
        assert_eq!(store.undo_depth(), 1);
        assert!(store.end_coalesced("drag", true).expect("commit"));
        assert_eq!(store.undo_depth(), 2);
        assert!(store.undo());
        assert_eq!(store.snapshot(), base);
    }

    #[test]
    fn test_coalesced_rollback_and_key_mismatch() {
        let mut store = DocumentStore::default();
        store.apply(&create(), true).expect("create");
        let base = store.snapshot();
        store.begin_coalesced("drag").expect("begin");
        assert!(matches!(
            store.begin_coalesced("other"),
            Err(LayoutError::Coalesce(_))
        ));
        store.apply(&move_to(1, 4.0), true).expect("preview");
        assert!(store.end_coalesced("other", true).is_err());
        assert!(!store.end_coalesced("drag", false).expect("rollback"));
        assert_eq!(store.snapshot(), base);
        assert!(store.end_coalesced("drag", true).is_err());
    }
}

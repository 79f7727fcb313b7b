//! Document handle: the public editing surface.
//!
//! A [`DocumentHandle`] owns one [`DocumentStore`] and exposes editor-level
//! operations on top of it. Selection changes are recorded in history so undo
//! restores focus together with structure.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::action::{Action, BoundsUpdate};
use crate::ordering::{self, LayerMove, TreeDrop};
use crate::store::{DocumentStore, Snapshot};
use crate::{
    schema, tree, DocumentModel, EditorStateModel, EngineConfig, LayoutError, LayoutResult,
    NodeKind, NodeRef, PropertyBag, Rect, WidgetId, WidgetType,
};

/// Editing façade over a single document.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    store: DocumentStore,
    config: EngineConfig,
}

impl Default for DocumentHandle {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DocumentHandle {
    /// Create a handle holding an empty document.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: DocumentStore::from_config(&config),
            config,
        }
    }

    /// Configuration the handle was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The current document snapshot.
    #[must_use]
    pub fn document(&self) -> Arc<DocumentModel> {
        Arc::clone(self.store.document())
    }

    /// The current document together with its editor state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// The current editor state.
    #[must_use]
    pub fn editor(&self) -> &EditorStateModel {
        self.store.editor()
    }

    /// Selected widget ids.
    #[must_use]
    pub fn selection(&self) -> &[WidgetId] {
        &self.store.editor().selection
    }

    /// Apply a raw action with history.
    ///
    /// # Errors
    ///
    /// Whatever the reducer rejects.
    pub fn dispatch(&mut self, action: &Action) -> LayoutResult<Vec<WidgetId>> {
        self.store.apply(action, true)
    }

    /// Add a widget front-most and select it.
    ///
    /// # Errors
    ///
    /// Invalid bounds or properties.
    pub fn add_widget(
        &mut self,
        widget_type: WidgetType,
        bounds: Rect,
        properties: PropertyBag,
    ) -> LayoutResult<WidgetId> {
        let action = Action::CreateWidget {
            widget_type,
            bounds,
            properties,
        };
        let created = self.store.apply_with(&action, true, |_, created, editor| {
            *editor = EditorStateModel::with_selection(created.iter().copied());
        })?;
        created
            .first()
            .copied()
            .ok_or_else(|| LayoutError::structure("create returned no id"))
    }

    /// Remove widgets; they also leave the selection.
    ///
    /// # Errors
    ///
    /// Unknown or repeated ids.
    pub fn remove_widgets(&mut self, ids: &[WidgetId]) -> LayoutResult<()> {
        self.store
            .apply(&Action::DeleteWidgets { ids: ids.to_vec() }, true)
            .map(|_| ())
    }

    /// Remove every selected widget.
    ///
    /// # Errors
    ///
    /// Fails when nothing is selected.
    pub fn remove_selected(&mut self) -> LayoutResult<()> {
        let selection = self.selection().to_vec();
        if selection.is_empty() {
            return Err(LayoutError::no_op("nothing selected"));
        }
        self.remove_widgets(&selection)
    }

    /// Replace one widget's bounds.
    ///
    /// # Errors
    ///
    /// Invalid rectangles, unknown ids, and unchanged bounds.
    pub fn set_widget_bounds(&mut self, id: WidgetId, bounds: Rect) -> LayoutResult<()> {
        self.set_widgets_bounds(vec![BoundsUpdate { id, bounds }])
    }

    /// Replace several widgets' bounds as one edit.
    ///
    /// # Errors
    ///
    /// See [`Action::SetWidgetsBounds`].
    pub fn set_widgets_bounds(&mut self, items: Vec<BoundsUpdate>) -> LayoutResult<()> {
        self.store
            .apply(&Action::SetWidgetsBounds { items }, true)
            .map(|_| ())
    }

    /// Translate widgets by `(dx, dy)` as one edit.
    ///
    /// # Errors
    ///
    /// Unknown ids, non-finite results, or a zero offset.
    pub fn move_widgets(&mut self, ids: &[WidgetId], dx: f32, dy: f32) -> LayoutResult<()> {
        let doc = self.document();
        let items = ids
            .iter()
            .map(|id| {
                doc.widget(*id)
                    .map(|w| BoundsUpdate {
                        id: *id,
                        bounds: w.bounds.translated(dx, dy),
                    })
                    .ok_or_else(|| LayoutError::validation(format!("unknown widget {id}")))
            })
            .collect::<LayoutResult<Vec<_>>>()?;
        self.set_widgets_bounds(items)
    }

    /// Merge a property patch onto widgets, groups or layers.
    ///
    /// # Errors
    ///
    /// Schema violations and unchanged values.
    pub fn set_props(
        &mut self,
        kind: NodeKind,
        ids: &[WidgetId],
        patch: PropertyBag,
    ) -> LayoutResult<()> {
        let action = Action::SetProps {
            kind,
            ids: ids.to_vec(),
            patch,
        };
        self.store.apply(&action, true).map(|_| ())
    }

    /// Top-level units covering the selection exactly.
    fn selection_units(&self) -> LayoutResult<(Vec<WidgetId>, Vec<WidgetId>)> {
        let doc = self.store.document();
        let selection = &self.store.editor().selection;
        if selection.is_empty() {
            return Err(LayoutError::validation("selection is empty"));
        }
        let selected: HashSet<WidgetId> = selection.iter().copied().collect();
        let mut widgets = Vec::new();
        let mut groups = Vec::new();
        for &id in selection {
            match tree::widget_owner(doc, id) {
                None => widgets.push(id),
                Some(owner) => {
                    let top = tree::ancestors(doc, owner).last().copied().unwrap_or(owner);
                    if groups.contains(&top) {
                        continue;
                    }
                    if let Some(missing) = tree::effective_members(doc, top)
                        .into_iter()
                        .find(|m| !selected.contains(m))
                    {
                        return Err(LayoutError::structure(format!(
                            "selection covers part of group {top} but not widget {missing}"
                        )));
                    }
                    groups.push(top);
                }
            }
        }
        Ok((widgets, groups))
    }

    /// Wrap the selection in a new group; returns its id.
    ///
    /// Selected widgets that sit inside groups are grouped through their
    /// top-level group, which must be fully selected.
    ///
    /// # Errors
    ///
    /// Empty or partial selections, and anything GroupWidgets rejects.
    pub fn group_selection(&mut self, name: &str) -> LayoutResult<WidgetId> {
        let (widget_ids, group_ids) = self.selection_units()?;
        let created = self.store.apply(
            &Action::GroupWidgets {
                widget_ids,
                group_ids,
                name: name.to_string(),
            },
            true,
        )?;
        created
            .first()
            .copied()
            .ok_or_else(|| LayoutError::structure("group returned no id"))
    }

    /// Dissolve the outermost group whose members are exactly the selection.
    ///
    /// # Errors
    ///
    /// Fails when the selection is not a group.
    pub fn ungroup_selection(&mut self) -> LayoutResult<()> {
        let doc = self.document();
        let group = ordering::group_matching_selection(&doc, self.selection())
            .ok_or_else(|| LayoutError::validation("selection is not a group"))?;
        self.store
            .apply(&Action::UngroupWidgets { group_ids: vec![group] }, true)
            .map(|_| ())
    }

    /// Move nodes under `parent_id`.
    ///
    /// # Errors
    ///
    /// See [`Action::Reparent`].
    pub fn reparent(
        &mut self,
        refs: Vec<NodeRef>,
        parent_id: WidgetId,
        insert_index: i32,
    ) -> LayoutResult<()> {
        let action = Action::Reparent {
            refs,
            parent_id,
            insert_index,
        };
        self.store.apply(&action, true).map(|_| ())
    }

    /// Re-sequence siblings of `parent_id`.
    ///
    /// # Errors
    ///
    /// See [`Action::Reorder`].
    pub fn reorder(
        &mut self,
        refs: Vec<NodeRef>,
        parent_id: WidgetId,
        insert_index: i32,
    ) -> LayoutResult<()> {
        let action = Action::Reorder {
            refs,
            parent_id,
            insert_index,
        };
        self.store.apply(&action, true).map(|_| ())
    }

    /// Replace the selection.
    ///
    /// # Errors
    ///
    /// Unknown ids, or an unchanged selection.
    pub fn select(&mut self, ids: &[WidgetId]) -> LayoutResult<()> {
        self.store
            .set_editor(EditorStateModel::with_selection(ids.iter().copied()), true)
    }

    /// Extend the selection.
    ///
    /// # Errors
    ///
    /// Unknown ids, or ids already selected.
    pub fn add_to_selection(&mut self, ids: &[WidgetId]) -> LayoutResult<()> {
        let combined = self
            .selection()
            .iter()
            .chain(ids)
            .copied()
            .collect::<Vec<_>>();
        self.store
            .set_editor(EditorStateModel::with_selection(combined), true)
    }

    /// Deselect everything.
    ///
    /// # Errors
    ///
    /// No-op rejection when nothing is selected.
    pub fn clear_selection(&mut self) -> LayoutResult<()> {
        self.store.set_editor(EditorStateModel::default(), true)
    }

    /// Move the selection in z-order among its siblings.
    ///
    /// # Errors
    ///
    /// Ordering failures (see [`ordering::plan_layer_move`]) and no-op moves.
    pub fn move_selection(&mut self, layer_move: LayerMove) -> LayoutResult<()> {
        let action = ordering::plan_layer_move(self.store.document(), self.selection(), layer_move)?;
        self.store.apply(&action, true).map(|_| ())
    }

    /// Shorthand for [`LayerMove::BringForward`].
    ///
    /// # Errors
    ///
    /// See [`Self::move_selection`].
    pub fn bring_forward(&mut self) -> LayoutResult<()> {
        self.move_selection(LayerMove::BringForward)
    }

    /// Shorthand for [`LayerMove::SendBackward`].
    ///
    /// # Errors
    ///
    /// See [`Self::move_selection`].
    pub fn send_backward(&mut self) -> LayoutResult<()> {
        self.move_selection(LayerMove::SendBackward)
    }

    /// Shorthand for [`LayerMove::BringToFront`].
    ///
    /// # Errors
    ///
    /// See [`Self::move_selection`].
    pub fn bring_to_front(&mut self) -> LayoutResult<()> {
        self.move_selection(LayerMove::BringToFront)
    }

    /// Shorthand for [`LayerMove::SendToBack`].
    ///
    /// # Errors
    ///
    /// See [`Self::move_selection`].
    pub fn send_to_back(&mut self) -> LayoutResult<()> {
        self.move_selection(LayerMove::SendToBack)
    }

    /// Apply a layer tree drag-and-drop.
    ///
    /// # Errors
    ///
    /// See [`ordering::plan_tree_drop`].
    pub fn tree_drop(&mut self, drop: &TreeDrop) -> LayoutResult<()> {
        let action = ordering::plan_tree_drop(self.store.document(), drop)?;
        self.store.apply(&action, true).map(|_| ())
    }

    /// Step back one history entry.
    pub fn undo(&mut self) -> bool {
        self.store.undo()
    }

    /// Step forward one history entry.
    pub fn redo(&mut self) -> bool {
        self.store.redo()
    }

    /// Whether undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.store.can_undo()
    }

    /// Whether redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.store.can_redo()
    }

    /// Number of undo entries.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.store.undo_depth()
    }

    /// Configured undo depth.
    #[must_use]
    pub const fn history_limit(&self) -> usize {
        self.store.history_limit()
    }

    /// Change the undo depth.
    pub fn set_history_limit(&mut self, limit: usize) {
        self.config.history_limit = limit;
        self.store.set_history_limit(limit);
    }

    /// Open a coalesced edit window.
    ///
    /// # Errors
    ///
    /// A window is already open.
    pub fn begin_coalesced_edit(&mut self, key: &str) -> LayoutResult<()> {
        self.store.begin_coalesced(key)
    }

    /// Close a coalesced edit window, committing or rolling back.
    ///
    /// # Errors
    ///
    /// No window is open, or `key` does not match it.
    pub fn end_coalesced_edit(&mut self, key: &str, commit: bool) -> LayoutResult<bool> {
        self.store.end_coalesced(key, commit)
    }

    /// Replace the document and discard history.
    ///
    /// # Errors
    ///
    /// The document does not validate.
    pub fn reset(&mut self, document: DocumentModel) -> LayoutResult<()> {
        self.store.reset(document, EditorStateModel::default())
    }

    /// Serialize the document and editor state.
    ///
    /// # Errors
    ///
    /// Serialization failures.
    pub fn save_json(&self) -> LayoutResult<String> {
        schema::save_document(self.store.document(), self.store.editor())
    }

    /// Replace the document from JSON, discarding history.
    ///
    /// # Errors
    ///
    /// Parse, version and validation failures; the handle is untouched.
    pub fn load_json(&mut self, json: &str) -> LayoutResult<()> {
        let (doc, editor) = schema::load_document(
            json,
            self.config.schema_version,
            self.store.reducer().schema(),
        )?;
        self.store.reset(doc, editor)
    }

    /// Write the document to a file.
    ///
    /// # Errors
    ///
    /// Serialization and I/O failures.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> LayoutResult<()> {
        schema::save_to_path(path, self.store.document(), self.store.editor())
    }

    /// Replace the document from a file, discarding history.
    ///
    /// # Errors
    ///
    /// I/O failures plus everything [`Self::load_json`] rejects.
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> LayoutResult<()> {
        let (doc, editor) = schema::load_from_path(
            path,
            self.config.schema_version,
            self.store.reducer().schema(),
        )?;
        self.store.reset(doc, editor)
    }
}

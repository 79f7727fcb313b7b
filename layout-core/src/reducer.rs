//! The reducer: `(document, action) -> next document`.
//!
//! Each case builds a candidate snapshot from a clone of the input, validates
//! it, and only then hands it back. The input is never touched, so a failure
//! can never leave a half-applied document behind.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::action::{Action, BoundsUpdate, FRONT_MOST};
use crate::{
    tree, validate, BuiltinSchema, DocumentModel, GroupModel, IdAllocator, LayoutError,
    LayoutResult, NodeKind, NodeRef, PropertyBag, PropertySchema, PropertyValue, Rect,
    SchemaVersion, WidgetId, WidgetModel, WidgetType,
};

/// Outcome of a successful reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// The validated next snapshot.
    pub document: DocumentModel,
    /// Ids allocated by the action (new widget or group), in allocation order.
    pub created_ids: Vec<WidgetId>,
}

/// How paint order is settled once an action has run.
enum Reflow {
    /// Paint order is untouched.
    Keep,
    /// Every parent keeps its previous child order.
    Carry,
    /// One parent takes the given order; the rest carry theirs.
    Place(WidgetId, Vec<NodeRef>),
}

/// Applies [`Action`]s against a property schema and runtime schema version.
#[derive(Clone)]
pub struct Reducer {
    schema: Arc<dyn PropertySchema + Send + Sync>,
    version: SchemaVersion,
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Default for Reducer {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinSchema), SchemaVersion::CURRENT)
    }
}

impl Reducer {
    /// Create a reducer over a property schema.
    #[must_use]
    pub fn new(schema: Arc<dyn PropertySchema + Send + Sync>, version: SchemaVersion) -> Self {
        Self { schema, version }
    }

    /// The runtime schema version candidates are validated against.
    #[must_use]
    pub const fn version(&self) -> SchemaVersion {
        self.version
    }

    /// The property schema in use.
    #[must_use]
    pub fn schema(&self) -> &(dyn PropertySchema + Send + Sync) {
        self.schema.as_ref()
    }

    /// Validate a whole document against this reducer's schema and version.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation.
    pub fn validate(&self, doc: &DocumentModel) -> LayoutResult<()> {
        validate::validate_document(doc, self.schema.as_ref(), self.version)
    }

    /// Apply one action.
    ///
    /// `ids` is only advanced once an action has passed its cheap pre-checks.
    ///
    /// # Errors
    ///
    /// Validation, structural and no-op failures; `doc` is unchanged in every case.
    pub fn reduce(
        &self,
        doc: &DocumentModel,
        action: &Action,
        ids: &mut IdAllocator,
    ) -> LayoutResult<Reduction> {
        let mut next = doc.clone();
        let mut created_ids = Vec::new();

        let reflow = match action {
            Action::CreateWidget {
                widget_type,
                bounds,
                properties,
            } => {
                let id = self.create_widget(&mut next, *widget_type, *bounds, properties, ids)?;
                created_ids.push(id);
                Reflow::Keep
            }
            Action::DeleteWidgets { ids: targets } => {
                delete_widgets(&mut next, targets)?;
                Reflow::Carry
            }
            Action::SetWidgetsBounds { items } => {
                set_widgets_bounds(&mut next, items)?;
                Reflow::Keep
            }
            Action::SetProps { kind, ids: targets, patch } => {
                self.set_props(&mut next, *kind, targets, patch)?;
                Reflow::Keep
            }
            Action::GroupWidgets {
                widget_ids,
                group_ids,
                name,
            } => {
                let (id, order) = group_widgets(&mut next, widget_ids, group_ids, name, ids)?;
                created_ids.push(id);
                Reflow::Place(WidgetId::ROOT, order)
            }
            Action::UngroupWidgets { group_ids } => {
                ungroup(&mut next, group_ids)?;
                Reflow::Carry
            }
            Action::Reparent {
                refs,
                parent_id,
                insert_index,
            } => Reflow::Place(
                *parent_id,
                reparent(&mut next, refs, *parent_id, *insert_index)?,
            ),
            Action::Reorder {
                refs,
                parent_id,
                insert_index,
            } => Reflow::Place(
                *parent_id,
                reorder(&next, refs, *parent_id, *insert_index)?,
            ),
        };

        match reflow {
            Reflow::Keep => {}
            Reflow::Carry => tree::normalize(doc, &mut next, None)?,
            Reflow::Place(parent, order) => {
                tree::normalize(doc, &mut next, Some((parent, &order)))?;
            }
        }

        if created_ids.is_empty() && next == *doc {
            return Err(LayoutError::no_op(format!(
                "{} leaves the document unchanged",
                action.name()
            )));
        }

        self.validate(&next)?;
        Ok(Reduction {
            document: next,
            created_ids,
        })
    }

    fn create_widget(
        &self,
        doc: &mut DocumentModel,
        widget_type: WidgetType,
        bounds: Rect,
        properties: &PropertyBag,
        ids: &mut IdAllocator,
    ) -> LayoutResult<WidgetId> {
        self.schema.validate_property_bag(widget_type, properties)?;
        check_rect(WidgetId::ROOT, &bounds)?;
        let id = ids.allocate(|candidate| doc.id_in_use(candidate));
        doc.widgets.push(WidgetModel {
            id,
            widget_type,
            bounds,
            properties: properties.clone(),
        });
        Ok(id)
    }

    fn set_props(
        &self,
        doc: &mut DocumentModel,
        kind: NodeKind,
        targets: &[WidgetId],
        patch: &PropertyBag,
    ) -> LayoutResult<()> {
        if patch.is_empty() {
            return Err(LayoutError::validation("property patch is empty"));
        }
        let targets = unique_ids(targets, "SetProps")?;
        for id in targets {
            match kind {
                NodeKind::Widget => {
                    let widget = doc
                        .widgets
                        .iter_mut()
                        .find(|w| w.id == id)
                        .ok_or_else(|| LayoutError::validation(format!("unknown widget {id}")))?;
                    let mut merged = widget.properties.clone();
                    merged.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
                    self.schema
                        .validate_property_bag(widget.widget_type, &merged)
                        .map_err(|e| LayoutError::validation(format!("widget {id}: {e}")))?;
                    widget.properties = merged;
                }
                NodeKind::Group => {
                    let group = doc
                        .groups
                        .iter_mut()
                        .find(|g| g.id == id)
                        .ok_or_else(|| LayoutError::validation(format!("unknown group {id}")))?;
                    for (key, value) in patch {
                        match (key.as_str(), value) {
                            ("name", PropertyValue::String(name)) => group.name.clone_from(name),
                            _ => return Err(unsupported_prop(NodeKind::Group, key, value)),
                        }
                    }
                }
                NodeKind::Layer => {
                    let layer = doc
                        .layers
                        .iter_mut()
                        .find(|l| l.id == id)
                        .ok_or_else(|| LayoutError::validation(format!("unknown layer {id}")))?;
                    for (key, value) in patch {
                        match (key.as_str(), value) {
                            ("name", PropertyValue::String(name)) => layer.name.clone_from(name),
                            ("visible", PropertyValue::Bool(visible)) => layer.visible = *visible,
                            ("locked", PropertyValue::Bool(locked)) => layer.locked = *locked,
                            ("order", PropertyValue::Number(order)) => {
                                layer.order = integral_order(*order)?;
                            }
                            _ => return Err(unsupported_prop(NodeKind::Layer, key, value)),
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn unsupported_prop(kind: NodeKind, key: &str, value: &PropertyValue) -> LayoutError {
    LayoutError::validation(format!(
        "{kind} does not accept property '{key}' of kind {}",
        value.kind()
    ))
}

#[allow(clippy::cast_possible_truncation)]
fn integral_order(order: f64) -> LayoutResult<i32> {
    if order.is_finite()
        && order.fract() == 0.0
        && order >= f64::from(i32::MIN)
        && order <= f64::from(i32::MAX)
    {
        Ok(order as i32)
    } else {
        Err(LayoutError::validation(format!(
            "layer order must be an integer, got {order}"
        )))
    }
}

fn check_rect(id: WidgetId, rect: &Rect) -> LayoutResult<()> {
    if !rect.is_finite() {
        return Err(LayoutError::validation(format!(
            "bounds for widget {id} are not finite"
        )));
    }
    if rect.w < 0.0 || rect.h < 0.0 {
        return Err(LayoutError::validation(format!(
            "bounds for widget {id} have negative size"
        )));
    }
    Ok(())
}

/// Reject empty lists, root/negative ids and repeats; keep input order.
fn unique_ids(ids: &[WidgetId], what: &str) -> LayoutResult<Vec<WidgetId>> {
    if ids.is_empty() {
        return Err(LayoutError::validation(format!("{what} requires at least one id")));
    }
    let mut seen = HashSet::new();
    for &id in ids {
        if !id.is_valid() {
            return Err(LayoutError::validation(format!("{what}: invalid id {id}")));
        }
        if !seen.insert(id) {
            return Err(LayoutError::validation(format!("{what}: duplicate id {id}")));
        }
    }
    Ok(ids.to_vec())
}

fn delete_widgets(doc: &mut DocumentModel, targets: &[WidgetId]) -> LayoutResult<()> {
    let targets = unique_ids(targets, "DeleteWidgets")?;
    if let Some(missing) = targets.iter().find(|id| doc.widget(**id).is_none()) {
        return Err(LayoutError::validation(format!("unknown widget {missing}")));
    }
    let doomed: HashSet<WidgetId> = targets.into_iter().collect();

    doc.widgets.retain(|w| !doomed.contains(&w.id));
    for group in &mut doc.groups {
        group.member_widget_ids.retain(|id| !doomed.contains(id));
    }
    for layer in &mut doc.layers {
        layer.member_widget_ids.retain(|id| !doomed.contains(id));
    }
    doc.property_bindings.retain(|b| !doomed.contains(&b.widget_id));
    doc.runtime_bindings.retain(|b| !doomed.contains(&b.widget_id));
    Ok(())
}

fn set_widgets_bounds(doc: &mut DocumentModel, items: &[BoundsUpdate]) -> LayoutResult<()> {
    if items.is_empty() {
        return Err(LayoutError::validation("bounds update batch is empty"));
    }
    let mut seen = HashSet::new();
    for item in items {
        if !item.id.is_valid() {
            return Err(LayoutError::validation(format!("invalid widget id {}", item.id)));
        }
        check_rect(item.id, &item.bounds)?;
        if !seen.insert(item.id) {
            return Err(LayoutError::validation(format!(
                "widget {} appears twice in bounds batch",
                item.id
            )));
        }
        if doc.widget(item.id).is_none() {
            return Err(LayoutError::validation(format!("unknown widget {}", item.id)));
        }
    }

    let unchanged = items
        .iter()
        .all(|item| doc.widget(item.id).is_some_and(|w| w.bounds == item.bounds));
    if unchanged {
        return Err(LayoutError::no_op("bounds are identical to the current ones"));
    }

    for item in items {
        if let Some(widget) = doc.widgets.iter_mut().find(|w| w.id == item.id) {
            widget.bounds = item.bounds;
        }
    }
    Ok(())
}

fn group_widgets(
    doc: &mut DocumentModel,
    widget_ids: &[WidgetId],
    group_ids: &[WidgetId],
    name: &str,
    ids: &mut IdAllocator,
) -> LayoutResult<(WidgetId, Vec<NodeRef>)> {
    let total = widget_ids.len() + group_ids.len();
    let single_group_wrapper = widget_ids.is_empty() && group_ids.len() == 1;
    if total < 2 && !single_group_wrapper {
        return Err(LayoutError::validation(
            "grouping requires at least two widgets or groups",
        ));
    }

    let mut seen = HashSet::new();
    for &id in widget_ids.iter().chain(group_ids) {
        if !id.is_valid() || !seen.insert(id) {
            return Err(LayoutError::validation(format!(
                "invalid or repeated id {id} in group request"
            )));
        }
    }
    for &id in widget_ids {
        if doc.widget(id).is_none() {
            return Err(LayoutError::validation(format!("unknown widget {id}")));
        }
        if !tree::is_top_level(doc, NodeRef::widget(id)) {
            return Err(LayoutError::structure(format!(
                "widget {id} is not top-level and cannot be grouped"
            )));
        }
    }
    for &id in group_ids {
        if doc.group(id).is_none() {
            return Err(LayoutError::validation(format!("unknown group {id}")));
        }
        if !tree::is_top_level(doc, NodeRef::group(id)) {
            return Err(LayoutError::structure(format!(
                "group {id} is not top-level and cannot be grouped"
            )));
        }
    }

    let id = ids.allocate(|candidate| doc.id_in_use(candidate));
    // The new group takes the slot of its front-most unit at the top level.
    let grouped: Vec<NodeRef> = widget_ids
        .iter()
        .map(|w| NodeRef::widget(*w))
        .chain(group_ids.iter().map(|g| NodeRef::group(*g)))
        .collect();
    let top = tree::siblings(doc, WidgetId::ROOT);
    let front = top.iter().rposition(|n| grouped.contains(n));
    let mut order = Vec::with_capacity(top.len());
    for (i, node) in top.into_iter().enumerate() {
        if Some(i) == front {
            order.push(NodeRef::group(id));
        }
        if !grouped.contains(&node) {
            order.push(node);
        }
    }

    let mut members = widget_ids.to_vec();
    members.sort_by_key(|m| doc.widget_index(*m));
    for group in &mut doc.groups {
        if group_ids.contains(&group.id) {
            group.parent_group_id = Some(id);
            group.sibling_index = None;
        }
    }
    let name = if name.trim().is_empty() {
        format!("Group {id}")
    } else {
        name.to_string()
    };
    doc.groups.push(GroupModel {
        id,
        name,
        parent_group_id: None,
        member_widget_ids: members,
        sibling_index: None,
    });
    Ok((id, order))
}

fn ungroup(doc: &mut DocumentModel, group_ids: &[WidgetId]) -> LayoutResult<()> {
    let group_ids = unique_ids(group_ids, "UngroupWidgets")?;
    if let Some(missing) = group_ids.iter().find(|id| doc.group(**id).is_none()) {
        return Err(LayoutError::validation(format!("unknown group {missing}")));
    }
    for id in group_ids {
        let Some(pos) = doc.groups.iter().position(|g| g.id == id) else {
            continue;
        };
        let removed = doc.groups.remove(pos);
        for child in &mut doc.groups {
            if child.parent_group_id == Some(id) {
                child.parent_group_id = removed.parent_group_id;
            }
        }
        for layer in &mut doc.layers {
            layer.member_group_ids.retain(|g| *g != id);
        }
    }
    Ok(())
}

/// Shared checks for Reparent/Reorder; returns the refs sorted back to front.
fn check_move(
    doc: &DocumentModel,
    refs: &[NodeRef],
    parent_id: WidgetId,
    insert_index: i32,
) -> LayoutResult<Vec<NodeRef>> {
    let Some(first) = refs.first() else {
        return Err(LayoutError::validation("move requires at least one node"));
    };
    if refs.iter().any(|r| r.kind != first.kind) {
        return Err(LayoutError::structure("move requires homogeneous node kinds"));
    }
    if first.kind == NodeKind::Layer {
        return Err(LayoutError::structure(
            "layers are not part of the z-order tree",
        ));
    }
    let mut seen = HashSet::new();
    for node in refs {
        if !node.id.is_valid() || !seen.insert(node.id) {
            return Err(LayoutError::validation(format!("invalid or repeated node {node}")));
        }
        if !doc.contains(*node) {
            return Err(LayoutError::validation(format!("unknown {node}")));
        }
    }
    if !parent_id.is_root() && doc.group(parent_id).is_none() {
        return Err(LayoutError::validation(format!(
            "destination {parent_id} is not a group"
        )));
    }
    if insert_index < FRONT_MOST {
        return Err(LayoutError::validation(format!(
            "insert index {insert_index} is negative"
        )));
    }
    let mut sorted = refs.to_vec();
    let shared = tree::direct_parent(doc, *first);
    if sorted.iter().all(|node| tree::direct_parent(doc, *node) == shared) {
        let order = tree::siblings(doc, shared);
        sorted.sort_by_key(|node| order.iter().position(|n| n == node));
    } else {
        sorted.sort_by_key(|node| tree::paint_key(doc, *node));
    }
    Ok(sorted)
}

/// Splice `moved` into `parent`'s remaining children.
fn place(
    doc: &DocumentModel,
    moved: &[NodeRef],
    parent_id: WidgetId,
    insert_index: i32,
) -> LayoutResult<Vec<NodeRef>> {
    let mut order: Vec<NodeRef> = tree::siblings(doc, parent_id)
        .into_iter()
        .filter(|node| !moved.contains(node))
        .collect();
    let at = if insert_index == FRONT_MOST {
        order.len()
    } else {
        let at = usize::try_from(insert_index)
            .map_err(|_| LayoutError::validation(format!("bad insert index {insert_index}")))?;
        if at > order.len() {
            return Err(LayoutError::validation(format!(
                "insert index {at} is past the {} remaining siblings",
                order.len()
            )));
        }
        at
    };
    order.splice(at..at, moved.iter().copied());
    Ok(order)
}

fn reparent(
    doc: &mut DocumentModel,
    refs: &[NodeRef],
    parent_id: WidgetId,
    insert_index: i32,
) -> LayoutResult<Vec<NodeRef>> {
    let moved = check_move(doc, refs, parent_id, insert_index)?;

    if !parent_id.is_root() {
        for node in moved.iter().filter(|n| n.kind == NodeKind::Group) {
            if tree::is_self_or_descendant(doc, parent_id, node.id) {
                return Err(LayoutError::structure(format!(
                    "cannot move group {} under itself or one of its descendants",
                    node.id
                )));
            }
        }
    }

    let new_parent = (!parent_id.is_root()).then_some(parent_id);
    for node in &moved {
        match node.kind {
            NodeKind::Widget => {
                for group in &mut doc.groups {
                    group.member_widget_ids.retain(|id| *id != node.id);
                }
                if let Some(parent) = doc.groups.iter_mut().find(|g| g.id == parent_id) {
                    parent.member_widget_ids.push(node.id);
                }
            }
            NodeKind::Group => {
                if let Some(group) = doc.groups.iter_mut().find(|g| g.id == node.id) {
                    group.parent_group_id = new_parent;
                }
            }
            NodeKind::Layer => {}
        }
    }
    place(doc, &moved, parent_id, insert_index)
}

fn reorder(
    doc: &DocumentModel,
    refs: &[NodeRef],
    parent_id: WidgetId,
    insert_index: i32,
) -> LayoutResult<Vec<NodeRef>> {
    let moved = check_move(doc, refs, parent_id, insert_index)?;
    if let Some(stray) = moved
        .iter()
        .find(|node| tree::direct_parent(doc, **node) != parent_id)
    {
        return Err(LayoutError::structure(format!(
            "reorder requires every node to share parent {parent_id}, but {stray} does not"
        )));
    }
    place(doc, &moved, parent_id, insert_index)
}

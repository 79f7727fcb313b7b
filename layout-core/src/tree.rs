//! Hierarchy queries over the group forest.
//!
//! Groups are stored flat; `parent_group_id` is a back-reference and widget
//! ownership is recorded in the owning group's member list. Every walk here
//! carries a visited set so a malformed document cannot loop forever.

use std::collections::{HashMap, HashSet};

use crate::{DocumentModel, LayoutError, LayoutResult, NodeKind, NodeRef, WidgetId, WidgetModel};

/// The group that directly owns a widget, if any.
#[must_use]
pub fn widget_owner(doc: &DocumentModel, widget: WidgetId) -> Option<WidgetId> {
    doc.groups
        .iter()
        .find(|g| g.member_widget_ids.contains(&widget))
        .map(|g| g.id)
}

/// Direct parent of a node, [`WidgetId::ROOT`] for top-level nodes.
#[must_use]
pub fn direct_parent(doc: &DocumentModel, node: NodeRef) -> WidgetId {
    let parent = match node.kind {
        NodeKind::Widget => widget_owner(doc, node.id),
        NodeKind::Group => doc.group(node.id).and_then(|g| g.parent_group_id),
        NodeKind::Layer => None,
    };
    parent.unwrap_or(WidgetId::ROOT)
}

/// Whether a widget or group has no parent group.
#[must_use]
pub fn is_top_level(doc: &DocumentModel, node: NodeRef) -> bool {
    direct_parent(doc, node).is_root()
}

/// Groups whose parent is `parent` (top-level groups for `ROOT`), in arena order.
#[must_use]
pub fn child_groups(doc: &DocumentModel, parent: WidgetId) -> Vec<WidgetId> {
    doc.groups
        .iter()
        .filter(|g| g.parent_group_id.unwrap_or(WidgetId::ROOT) == parent)
        .map(|g| g.id)
        .collect()
}

/// Group ids from `group`'s parent up to its top-level ancestor.
#[must_use]
pub fn ancestors(doc: &DocumentModel, group: WidgetId) -> Vec<WidgetId> {
    let mut chain = Vec::new();
    let mut visited = HashSet::from([group]);
    let mut cursor = doc.group(group).and_then(|g| g.parent_group_id);
    while let Some(id) = cursor {
        if !visited.insert(id) {
            break;
        }
        chain.push(id);
        cursor = doc.group(id).and_then(|g| g.parent_group_id);
    }
    chain
}

/// Whether `node` is `ancestor` or sits anywhere beneath it.
#[must_use]
pub fn is_self_or_descendant(doc: &DocumentModel, node: WidgetId, ancestor: WidgetId) -> bool {
    node == ancestor || ancestors(doc, node).contains(&ancestor)
}

/// Direct members plus, recursively, the members of every child group,
/// in paint order.
#[must_use]
pub fn effective_members(doc: &DocumentModel, group: WidgetId) -> Vec<WidgetId> {
    let mut members = HashSet::new();
    let mut visited = HashSet::new();
    let mut pending = vec![group];
    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        if let Some(g) = doc.group(id) {
            members.extend(g.member_widget_ids.iter().copied());
        }
        pending.extend(child_groups(doc, id));
    }
    doc.widgets
        .iter()
        .map(|w| w.id)
        .filter(|id| members.contains(id))
        .collect()
}

/// Every widget painted under `parent`: the whole document for `ROOT`.
#[must_use]
pub fn subtree_widgets(doc: &DocumentModel, parent: WidgetId) -> Vec<WidgetId> {
    if parent.is_root() {
        doc.widgets.iter().map(|w| w.id).collect()
    } else {
        effective_members(doc, parent)
    }
}

/// Widgets a node paints, in paint order.
#[must_use]
pub fn node_widgets(doc: &DocumentModel, node: NodeRef) -> Vec<WidgetId> {
    match node.kind {
        NodeKind::Widget => vec![node.id],
        NodeKind::Group => effective_members(doc, node.id),
        NodeKind::Layer => Vec::new(),
    }
}

/// Back-to-front sort key of a node.
///
/// A group sorts at the position of its back-most effective member. Groups
/// with no members have no paint slot; they sort after everything else by
/// their held sibling index.
#[must_use]
pub fn paint_key(doc: &DocumentModel, node: NodeRef) -> (usize, usize) {
    match node.kind {
        NodeKind::Widget => (doc.widget_index(node.id).unwrap_or(usize::MAX), 0),
        NodeKind::Group => {
            let Some((arena_pos, group)) = doc
                .groups
                .iter()
                .enumerate()
                .find(|(_, g)| g.id == node.id)
            else {
                return (usize::MAX, usize::MAX);
            };
            match effective_members(doc, node.id)
                .first()
                .and_then(|id| doc.widget_index(*id))
            {
                Some(first) => (first, arena_pos),
                None => (usize::MAX, group.sibling_index.unwrap_or(usize::MAX - 1)),
            }
        }
        NodeKind::Layer => (usize::MAX, usize::MAX),
    }
}

/// Direct children of `parent`, back to front, ordered by [`paint_key`].
///
/// Groups with no members are inserted at their held sibling index.
#[must_use]
pub fn siblings(doc: &DocumentModel, parent: WidgetId) -> Vec<NodeRef> {
    let paint_index: HashMap<WidgetId, usize> = doc
        .widgets
        .iter()
        .enumerate()
        .map(|(i, w)| (w.id, i))
        .collect();

    let direct_widgets: Vec<WidgetId> = if parent.is_root() {
        let owned: HashSet<WidgetId> = doc
            .groups
            .iter()
            .flat_map(|g| g.member_widget_ids.iter().copied())
            .collect();
        doc.widgets
            .iter()
            .map(|w| w.id)
            .filter(|id| !owned.contains(id))
            .collect()
    } else {
        doc.group(parent)
            .map(|g| g.member_widget_ids.clone())
            .unwrap_or_default()
    };

    let mut keyed: Vec<((usize, usize), NodeRef)> = direct_widgets
        .into_iter()
        .filter_map(|id| paint_index.get(&id).map(|&i| ((i, 0), NodeRef::widget(id))))
        .collect();

    let mut unpainted = Vec::new();
    for (arena_pos, group) in doc
        .groups
        .iter()
        .enumerate()
        .filter(|(_, g)| g.parent_group_id.unwrap_or(WidgetId::ROOT) == parent)
    {
        let node = NodeRef::group(group.id);
        let first = effective_members(doc, group.id)
            .first()
            .and_then(|id| paint_index.get(id).copied());
        match first {
            Some(first) => keyed.push(((first, arena_pos), node)),
            None => unpainted.push((group.sibling_index.unwrap_or(usize::MAX), arena_pos, node)),
        }
    }

    keyed.sort_by_key(|(key, _)| *key);
    let mut order: Vec<NodeRef> = keyed.into_iter().map(|(_, node)| node).collect();

    // Groups without a paint slot go back to the index they were given.
    unpainted.sort_by_key(|(index, arena_pos, _)| (*index, *arena_pos));
    for (index, _, node) in unpainted {
        let at = index.min(order.len());
        order.insert(at, node);
    }
    order
}

/// Rewrite paint order after a structural edit so every group paints as one
/// contiguous block.
///
/// Each parent keeps its children in the order they had in `before`. Children
/// of a group the edit removed take that group's place; children that are new
/// under a parent are slotted in by where they paint. `placed` fixes one
/// parent's order outright.
/// Groups are visited top-down, so inner blocks are laid out inside the slots
/// their parent gave them.
///
/// # Errors
///
/// Returns [`LayoutError::Structure`] if a fixed order does not cover its
/// parent's widgets.
pub fn normalize(
    before: &DocumentModel,
    after: &mut DocumentModel,
    placed: Option<(WidgetId, &[NodeRef])>,
) -> LayoutResult<()> {
    let mut pending = vec![WidgetId::ROOT];
    let mut visited = HashSet::new();
    while let Some(parent) = pending.pop() {
        if !visited.insert(parent) {
            continue;
        }
        let order = match placed {
            Some((fixed, order)) if fixed == parent => order.to_vec(),
            _ => carried_order(before, after, parent),
        };
        resequence(after, parent, &order)?;
        pending.extend(
            order
                .iter()
                .filter(|n| n.kind == NodeKind::Group)
                .map(|n| n.id),
        );
    }
    Ok(())
}

fn carried_order(before: &DocumentModel, after: &DocumentModel, parent: WidgetId) -> Vec<NodeRef> {
    let current = siblings(after, parent);
    let present: HashSet<NodeRef> = current.iter().copied().collect();
    let mut order = Vec::with_capacity(current.len());

    if parent.is_root() || before.group(parent).is_some() {
        let mut stack: Vec<NodeRef> = siblings(before, parent).into_iter().rev().collect();
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            if present.contains(&node) {
                order.push(node);
            } else if node.kind == NodeKind::Group && after.group(node.id).is_none() {
                stack.extend(siblings(before, node.id).into_iter().rev());
            }
        }
    }

    let carried: HashSet<NodeRef> = order.iter().copied().collect();
    for node in current.into_iter().filter(|n| !carried.contains(n)) {
        let key = paint_key(after, node);
        let at = order
            .iter()
            .rposition(|n| paint_key(after, *n) < key)
            .map_or(0, |i| i + 1);
        order.insert(at, node);
    }
    order
}

/// Rewrite the document so `parent`'s direct children paint in `order`.
///
/// Only the widget slots already occupied by `parent`'s subtree are reused, so
/// widgets outside the subtree keep their positions. The parent's member list
/// and the arena order of its child groups follow the new order.
///
/// # Errors
///
/// Returns [`LayoutError::Structure`] if `order` does not cover exactly the
/// widgets currently under `parent`.
pub fn resequence(doc: &mut DocumentModel, parent: WidgetId, order: &[NodeRef]) -> LayoutResult<()> {
    let subtree = subtree_widgets(doc, parent);
    let subtree_set: HashSet<WidgetId> = subtree.iter().copied().collect();
    let slots: Vec<usize> = doc
        .widgets
        .iter()
        .enumerate()
        .filter(|(_, w)| subtree_set.contains(&w.id))
        .map(|(i, _)| i)
        .collect();

    let view: &DocumentModel = doc;
    let sequence: Vec<WidgetId> = order
        .iter()
        .flat_map(|node| node_widgets(view, *node))
        .collect();
    let sequence_set: HashSet<WidgetId> = sequence.iter().copied().collect();
    if sequence.len() != slots.len() || sequence_set != subtree_set {
        return Err(LayoutError::structure(format!(
            "sibling order under {parent} does not cover its {} widgets",
            slots.len()
        )));
    }

    let mut by_id: HashMap<WidgetId, WidgetModel> = slots
        .iter()
        .map(|&i| (doc.widgets[i].id, doc.widgets[i].clone()))
        .collect();
    for (&slot, id) in slots.iter().zip(&sequence) {
        if let Some(widget) = by_id.remove(id) {
            doc.widgets[slot] = widget;
        }
    }

    if let Some(group) = doc.groups.iter_mut().find(|g| g.id == parent) {
        group.member_widget_ids = order
            .iter()
            .filter(|n| n.kind == NodeKind::Widget)
            .map(|n| n.id)
            .collect();
    }

    let group_order: Vec<WidgetId> = order
        .iter()
        .filter(|n| n.kind == NodeKind::Group)
        .map(|n| n.id)
        .collect();
    let group_slots: Vec<usize> = doc
        .groups
        .iter()
        .enumerate()
        .filter(|(_, g)| group_order.contains(&g.id))
        .map(|(i, _)| i)
        .collect();
    let mut groups_by_id: HashMap<WidgetId, _> = group_slots
        .iter()
        .map(|&i| (doc.groups[i].id, doc.groups[i].clone()))
        .collect();
    for (&slot, id) in group_slots.iter().zip(&group_order) {
        if let Some(group) = groups_by_id.remove(id) {
            doc.groups[slot] = group;
        }
    }

    let unpainted: HashMap<WidgetId, usize> = order
        .iter()
        .enumerate()
        .filter(|(_, n)| n.kind == NodeKind::Group && effective_members(doc, n.id).is_empty())
        .map(|(i, n)| (n.id, i))
        .collect();
    for group in &mut doc.groups {
        if group_order.contains(&group.id) {
            group.sibling_index = unpainted.get(&group.id).copied();
        }
    }
    Ok(())
}
